//! # Error Handling
//!
//! Error taxonomy for envault, defined with `thiserror`.
//!
//! Two families of errors exist. Parse-time and scan-time errors
//! ([`Error::MalformedLine`], [`Error::InvalidReferenceSyntax`]) indicate the
//! input file itself is invalid and abort a run regardless of policy.
//! Resolution errors ([`Error::ProviderNotFound`],
//! [`Error::ReferenceValidation`], [`Error::ProviderResolution`]) are
//! policy-governed: strict mode propagates the first one, lenient mode
//! records all of them and keeps going.

/// Custom result type for envault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for envault
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A line that is neither blank, a comment, nor a `KEY=value` entry.
    /// Always fatal; a file that cannot be parsed cannot be partially
    /// processed.
    #[error("malformed line {line}: expected 'KEY=value', found {content:?}")]
    MalformedLine { line: usize, content: String },

    /// A `${...}` token that cannot be read as `${provider:body}`.
    /// Same fatality as a parse error.
    #[error("invalid reference syntax in {token:?}: {reason}")]
    InvalidReferenceSyntax { token: String, reason: String },

    /// The reference names a provider the registry has never heard of.
    #[error("provider '{name}' is not registered")]
    ProviderNotFound { name: String },

    /// The reference body failed the provider's reference pattern.
    #[error("[{provider}] invalid reference {reference:?}: {reason}")]
    ReferenceValidation {
        provider: String,
        reference: String,
        reason: String,
    },

    /// The backend call itself failed.
    #[error("[{provider}] failed to resolve {reference:?}: {message}")]
    ProviderResolution {
        provider: String,
        reference: String,
        message: String,
    },

    /// Configuration errors (config file, provider settings, patterns)
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// A backend call or the whole run exceeded its time budget
    #[error("operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    /// Create a provider resolution error
    pub fn resolution<P, R, M>(provider: P, reference: R, message: M) -> Self
    where
        P: Into<String>,
        R: Into<String>,
        M: Into<String>,
    {
        Self::ProviderResolution {
            provider: provider.into(),
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a reference validation error
    pub fn validation<P, R, M>(provider: P, reference: R, reason: M) -> Self
    where
        P: Into<String>,
        R: Into<String>,
        M: Into<String>,
    {
        Self::ReferenceValidation {
            provider: provider.into(),
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is governed by the strict/lenient run policy.
    ///
    /// Policy-governed errors abort a strict run and are recorded (with a
    /// visible output marker) by a lenient run. Everything else is fatal
    /// under both policies.
    pub fn is_policy_governed(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotFound { .. }
                | Self::ReferenceValidation { .. }
                | Self::ProviderResolution { .. }
                | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MalformedLine {
            line: 3,
            content: "justtext".into(),
        };
        assert!(err.to_string().contains("line 3"));
        assert!(err.to_string().contains("justtext"));

        let err = Error::ProviderNotFound {
            name: "ghost".into(),
        };
        assert_eq!(err.to_string(), "provider 'ghost' is not registered");

        let err = Error::resolution("vault", "db/password", "connection refused");
        assert!(err.to_string().starts_with("[vault]"));
        assert!(err.to_string().contains("db/password"));
    }

    #[test]
    fn test_policy_classification() {
        assert!(Error::ProviderNotFound { name: "x".into() }.is_policy_governed());
        assert!(Error::validation("env", "9BAD", "pattern mismatch").is_policy_governed());
        assert!(Error::resolution("env", "FOO", "not set").is_policy_governed());

        assert!(!Error::MalformedLine {
            line: 1,
            content: "x".into()
        }
        .is_policy_governed());
        assert!(!Error::InvalidReferenceSyntax {
            token: "${x}".into(),
            reason: "missing ':'".into()
        }
        .is_policy_governed());
        assert!(!Error::config("bad yaml").is_policy_governed());
    }
}
