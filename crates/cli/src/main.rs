//! Rivet CLI - Command-line interface for the Rivet class file transformer.

mod commands;
mod discovery;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rivet_core::BuildConfig;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "RIVET_LOG";

#[derive(Parser)]
#[command(name = "rivet")]
#[command(
    author,
    version,
    about = "Build-time class file transformation with pluggable rewriters"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to rivet.json (auto-detected if not specified)
    #[arg(short = 'f', long, global = true)]
    file: Option<PathBuf>,

    /// Worker threads: a number, 0 to transform on the main thread, or "auto"
    #[arg(short = 'j', long, global = true, value_parser = parse_threads)]
    threads: Option<usize>,

    /// Stop submitting class files after the first failure
    #[arg(long, global = true)]
    fail_fast: bool,

    /// Resolve type hierarchies eagerly
    #[arg(long, global = true)]
    extended_parsing: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform the class files of the build (default)
    Apply,

    /// Resolve plugins, entry point and engine without transforming
    Validate,

    /// List the plugins shipped with rivet
    Plugins,
}

fn parse_threads(value: &str) -> std::result::Result<usize, String> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(num_cpus::get());
    }
    value
        .parse()
        .map_err(|_| format!("expected a number or \"auto\", got '{}'", value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Plugins) => commands::plugins::execute(),
        Some(Commands::Validate) => commands::validate::execute(&load_config(&cli)?),
        Some(Commands::Apply) | None => commands::apply::execute(&load_config(&cli)?),
    }
}

/// Loads the build file and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<BuildConfig> {
    let path = match &cli.file {
        Some(path) => path.clone(),
        None => discovery::find_build_file()?,
    };
    tracing::debug!("Using build file {}", path.display());

    let mut config = BuildConfig::from_file(&path).into_diagnostic()?;
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }
    if cli.fail_fast {
        config = config.with_fail_fast(true);
    }
    if cli.extended_parsing {
        config = config.with_extended_parsing(true);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threads() {
        assert_eq!(parse_threads("4"), Ok(4));
        assert_eq!(parse_threads("0"), Ok(0));
        assert!(parse_threads("AUTO").unwrap() >= 1);
        assert!(parse_threads("many").is_err());
    }

    #[test]
    fn test_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rivet.json");
        std::fs::write(&path, r#"{ "root": "classes", "threads": 2 }"#).unwrap();

        let cli = Cli::parse_from([
            "rivet",
            "-f",
            path.to_str().unwrap(),
            "--fail-fast",
            "validate",
            "-j",
            "auto",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.root, dir.path().join("classes"));
        assert_eq!(config.threads, num_cpus::get());
        assert!(config.fail_fast);
        assert!(!config.extended_parsing);
    }
}
