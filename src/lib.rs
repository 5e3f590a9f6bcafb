//! # Envault
//!
//! Envault processes environment-definition files containing embedded
//! secret references and emits fully-resolved output:
//!
//! ```text
//! DATABASE_PASSWORD=${env:DB_PASSWORD}
//! API_KEY=${file:/run/secrets/api_key}
//! ```
//!
//! References take the form `${provider:reference}`. Each provider name is
//! looked up in a [`provider::ProviderRegistry`] and resolved through the
//! [`provider::Provider`] contract; the [`resolver`] orchestrates the run
//! under a strict or lenient failure policy, and everything outside the
//! reference tokens survives byte-for-byte.
//!
//! ## Example
//!
//! ```rust,no_run
//! use envault::loader::{EnvLoader, Output};
//! use envault::provider::ProviderRegistry;
//! use envault::resolver::RunPolicy;
//!
//! #[tokio::main]
//! async fn main() -> envault::Result<()> {
//!     let loader = EnvLoader::new(ProviderRegistry::with_builtins(), RunPolicy::strict());
//!     let result = loader
//!         .load(std::path::Path::new(".env.dev"), Output::Default)
//!         .await?;
//!     println!("resolved {} secrets", result.secrets_resolved);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod envfile;
pub mod errors;
pub mod loader;
pub mod observability;
pub mod provider;
pub mod resolver;

pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
