use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlfy_core::{Config, ConfigError, FailurePolicy, RunReport, CONFIG_FILE_NAME};
use sqlfy_engine::{FileError, Pipeline, PipelineError, PipelineObserver, TracingObserver};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// SQLfy - Render SQL templates into plain .sql files
#[derive(Parser)]
#[command(name = "sqlfy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: sqlfy.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum number of files converted at once (default: number of CPUs)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Stop starting new files after the first failure
    #[arg(long, global = true)]
    fail_fast: bool,

    /// Output file for the JSON run report
    #[arg(short, long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every template under the source directory (default)
    Start,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.as_ref().unwrap_or(&Commands::Start) {
        Commands::Start => start_command(&cli).await,
    }
}

/// Logs go to stderr; RUST_LOG applies unless --verbose is given
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Start command - convert all templates
async fn start_command(cli: &Cli) -> Result<()> {
    println!("{}", "Starting SQLfy...".cyan());

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            print_fatal("CONFIG_ERROR", &e.to_string());
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!(
            "{} {} -> {} (extension {}, {} jobs, {:?})",
            "Using".cyan(),
            config.source_path().display(),
            config.dest_path().display(),
            config.template_extension,
            config.effective_jobs(),
            config.failure_policy
        );
    }

    let pipeline = Pipeline::new(config);
    let result = pipeline.run(Arc::new(ConsoleObserver::default())).await;

    match &result {
        Ok(report) => {
            print_summary(report);

            if let Some(path) = &cli.report {
                save_report(report, path)?;
                tracing::debug!(path = %path.display(), "report written");
                eprintln!("{} {}", "Report saved to:".green(), path.display());
            }
        }
        Err(e) => print_fatal(e.code(), &e.to_string()),
    }

    let code = exit_code(&result);
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

/// Read the config file and apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    if !path.exists() {
        return Err(ConfigError::IoError(format!(
            "config file '{}' not found",
            path.display()
        )));
    }

    tracing::debug!(path = %path.display(), "loading config");
    let mut config = Config::from_file(&path)?;

    if let Some(jobs) = cli.jobs {
        config.jobs = Some(jobs);
    }
    if cli.fail_fast {
        config.failure_policy = FailurePolicy::FailFast;
    }

    Ok(config)
}

fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create '{}'", parent.display()))?;
    }
    report
        .save_to_file(path)
        .with_context(|| format!("cannot write report to '{}'", path.display()))
}

/// 0 only when every discovered file was converted
fn exit_code(result: &Result<RunReport, PipelineError>) -> i32 {
    match result {
        Ok(report) if !report.has_failures() => 0,
        _ => 1,
    }
}

fn print_fatal(code: &str, message: &str) {
    eprintln!("{} {}", format!("SQLfy - ERROR [{}]:", code).red().bold(), message.red());
}

fn print_summary(report: &RunReport) {
    let summary = &report.summary;

    println!();
    println!("{}", "Summary:".bold());
    println!("  Discovered: {}", summary.discovered);
    println!("  Converted:  {}", summary.converted.to_string().green());

    if summary.failed > 0 {
        println!("  Failed:     {}", summary.failed.to_string().red().bold());
    } else {
        println!("  Failed:     {}", summary.failed.to_string().green());
    }

    if summary.skipped > 0 {
        println!("  Skipped:    {}", summary.skipped.to_string().yellow());
    }

    if !report.has_failures() {
        println!("{}", "✓ All files SQLified!".green().bold());
    }
}

/// Prints one line per file event and forwards everything to tracing
#[derive(Default)]
struct ConsoleObserver {
    tracing: TracingObserver,
}

impl PipelineObserver for ConsoleObserver {
    fn on_discovered(&self, files: &[PathBuf]) {
        self.tracing.on_discovered(files);
    }

    fn on_empty(&self, source_dir: &Path, extension: &str) {
        self.tracing.on_empty(source_dir, extension);
    }

    fn on_converting(&self, source: &Path) {
        self.tracing.on_converting(source);
        println!("[{}] Converting...", source.display());
    }

    fn on_converted(&self, source: &Path, destination: &Path) {
        self.tracing.on_converted(source, destination);
        println!(
            "{}",
            format!("[{}] SQLified successfully!", source.display()).green()
        );
    }

    fn on_failed(&self, error: &FileError) {
        self.tracing.on_failed(error);
        eprintln!("{}", error.to_string().red());
    }

    fn on_skipped(&self, source: &Path) {
        self.tracing.on_skipped(source);
        eprintln!(
            "{}",
            format!("[{}] Skipped after earlier failure", source.display()).yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlfy_core::FileOutcome;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn start_is_the_default_command() {
        let cli = Cli::try_parse_from(["sqlfy"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["sqlfy", "start", "--fail-fast", "-j", "2"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Start)));
        assert!(cli.fail_fast);
        assert_eq!(cli.jobs, Some(2));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["sqlfy", "convert"]).is_err());
    }

    #[test]
    fn exit_code_reflects_outcomes() {
        let ok = RunReport::from_outcomes(vec![FileOutcome::converted("a.tpl", "a.sql")]);
        assert_eq!(exit_code(&Ok(ok)), 0);

        let failed = RunReport::from_outcomes(vec![
            FileOutcome::converted("a.tpl", "a.sql"),
            FileOutcome::failed("b.tpl", "RENDER_ERROR", "boom"),
        ]);
        assert_eq!(exit_code(&Ok(failed)), 1);

        let skipped = RunReport::from_outcomes(vec![FileOutcome::skipped("c.tpl")]);
        assert_eq!(exit_code(&Ok(skipped)), 1);

        let empty = PipelineError::EmptyResult {
            source_dir: PathBuf::from("src"),
            extension: ".tpl".to_string(),
        };
        assert_eq!(exit_code(&Err(empty)), 1);
    }

    #[test]
    fn command_line_overrides_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "source_dir = \"src\"\ndest_dir = \"dist\"\ntemplate_extension = \".tpl\"\njobs = 8\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "sqlfy",
            "--config",
            path.to_str().unwrap(),
            "--jobs",
            "3",
            "--fail-fast",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.jobs, Some(3));
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.source_path(), dir.path().join("src"));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let cli = Cli::try_parse_from(["sqlfy", "-c", path.to_str().unwrap()]).unwrap();

        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
