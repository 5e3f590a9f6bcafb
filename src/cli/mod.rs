//! Command line interface.
//!
//! `envault [INPUT]` resolves secret references in an environment file.
//! Input defaults to `.env.dev`; `-` (or piped stdin when the default file
//! is absent) reads from stdin, `-o -` writes to stdout. Diagnostics go to
//! stderr so piping stays clean.
//!
//! Exit codes: 0 on success, 1 on a fatal error, 2 when a lenient run
//! completed but left unresolved references.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use owo_colors::OwoColorize;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::loader::{EnvLoader, LoadResult, Output};
use crate::provider::ProviderRegistry;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_UNRESOLVED: i32 = 2;

const DEFAULT_INPUT: &str = ".env.dev";

#[derive(Parser, Debug)]
#[command(name = "envault")]
#[command(about = "Resolve ${provider:reference} secrets in environment files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Input file; "-" reads from stdin
    #[arg(default_value = DEFAULT_INPUT)]
    pub input: String,

    /// Output file; "-" writes to stdout (default: .env beside the input)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Abort on the first resolution failure instead of collecting
    #[arg(long)]
    pub strict: bool,

    /// Configuration file (default: discovered from standard locations)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List registered providers and exit
    #[arg(long)]
    pub list_providers: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Parse arguments, run, and map the outcome to an exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    crate::observability::init_logging(cli.verbose);

    match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            EXIT_FATAL
        }
    }
}

async fn execute(cli: Cli) -> Result<i32> {
    let config = AppConfig::discover(cli.config.as_deref())?;

    let mut registry = ProviderRegistry::with_builtins();
    registry.apply_config(&config.providers)?;

    if cli.list_providers {
        print_providers(&registry);
        return Ok(EXIT_SUCCESS);
    }

    let mut policy = config.options.to_policy();
    if cli.strict {
        policy.strict = true;
    }

    let loader = EnvLoader::new(registry, policy);
    let result = match input_source(&cli.input) {
        InputSource::Stdin => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(|e| crate::errors::Error::io(e, "reading stdin"))?;
            // Without an input path there is nothing to derive a default
            // output from, so stdin defaults to stdout.
            loader
                .load_content(&content, output_destination(cli.output.as_deref(), true))
                .await?
        }
        InputSource::File(path) => {
            loader
                .load(&path, output_destination(cli.output.as_deref(), false))
                .await?
        }
    };

    report(&result);
    if result.output_path.is_none() {
        print!("{}", result.resolved_content);
    }

    Ok(if result.failures.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_UNRESOLVED
    })
}

enum InputSource {
    Stdin,
    File(PathBuf),
}

/// `-` always means stdin. The default input name also falls back to
/// stdin when the file is absent and something is piped in, so
/// `cat .env.dev | envault` works without arguments.
fn input_source(input: &str) -> InputSource {
    if input == "-" {
        return InputSource::Stdin;
    }
    if input == DEFAULT_INPUT
        && !Path::new(input).is_file()
        && !std::io::stdin().is_terminal()
    {
        return InputSource::Stdin;
    }
    InputSource::File(PathBuf::from(input))
}

fn output_destination(output: Option<&str>, from_stdin: bool) -> Output {
    match output {
        Some("-") => Output::Content,
        Some(path) => Output::Path(PathBuf::from(path)),
        None if from_stdin => Output::Content,
        None => Output::Default,
    }
}

fn print_providers(registry: &ProviderRegistry) {
    println!("Registered providers:");
    for info in registry.list_providers() {
        println!();
        println!("  {} - {}", info.name.bold(), info.description);
        if !info.version.is_empty() {
            println!("    version: {}", info.version);
        }
        if !info.reference_pattern.is_empty() {
            println!("    references: {}", info.reference_pattern);
        }
    }
}

fn report(result: &LoadResult) {
    for failure in &result.failures {
        eprintln!(
            "{} {}: ${{{}:{}}}: {}",
            "unresolved".yellow().bold(),
            failure.key,
            failure.provider,
            failure.reference,
            failure.message
        );
    }
    if let Some(path) = &result.output_path {
        eprintln!(
            "{} {} variables, {} secrets resolved -> {}",
            "done:".green().bold(),
            result.variables_count,
            result.secrets_resolved,
            path.display()
        );
    }
}
