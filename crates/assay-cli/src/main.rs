use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use assay_core::PromptTemplate;

mod config;
mod markdown;
mod setup;
mod shell;

use config::{expand_path, Settings};
use shell::{build_shell, describe_failure, ShellOptions};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Everything, including request bodies
    Trace,
    /// Provider requests, usage, file output
    Debug,
    /// Pipeline stages
    Info,
    /// Only warnings and errors
    Warn,
    /// Only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "assay")]
#[command(author, version, about = "Assay: web-researched feasibility reports for business ideas", long_about = None)]
pub struct Cli {
    /// Business idea to assess (prompts interactively when omitted)
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Config file (default: ~/.config/assay/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory for the exported .docx (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Prompt template file with `system` and `user` keys (overrides config)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Search for the topic as entered, without the dated price-trend qualifiers
    #[arg(long)]
    pub no_time_qualifier: bool,

    /// Do not write the .docx report
    #[arg(long)]
    pub no_export: bool,

    /// Print the report markdown without terminal styling
    #[arg(long)]
    pub raw: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration (credentials redacted)
    Config,
    /// Write a commented config file to ~/.config/assay/config.toml
    Setup {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.completion.model = model.clone();
        }
        if let Some(dir) = &self.output_dir {
            settings.report.output_dir = Some(dir.display().to_string());
        }
        if let Some(template) = &self.template {
            settings.report.template = Some(template.display().to_string());
        }
        if self.no_time_qualifier {
            settings.query.time_qualified = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // A .env next to the user counts as environment configuration
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    if let Some(Commands::Setup { force }) = &cli.command {
        return setup::run(*force);
    }

    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);

    if matches!(&cli.command, Some(Commands::Config)) {
        return show_config(&settings);
    }

    // Fail fast: no topic is accepted without both credentials
    settings.validate()?;

    let template = match &settings.report.template {
        Some(path) => PromptTemplate::load(&expand_path(path))?,
        None => PromptTemplate::feasibility(),
    };
    let options = ShellOptions {
        output_dir: settings.report.output_dir(),
        export: !cli.no_export,
        raw: cli.raw || !atty::is(atty::Stream::Stdout),
    };
    let shell = build_shell(&settings, template, options)?;

    let topic = match &cli.topic {
        Some(topic) => Some(topic.clone()),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read topic from stdin")?;
            Some(input)
        }
        None => None,
    };

    match topic {
        Some(topic) => {
            if let Err(err) = shell.run_once(&topic).await {
                eprintln!("{}", describe_failure(&err));
                std::process::exit(1);
            }
            Ok(())
        }
        None => shell.interactive().await,
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    let filter = EnvFilter::new(level.as_filter());

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        // stderr keeps logs out of the rendered report on stdout
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn show_config(settings: &Settings) -> Result<()> {
    let config_path = Settings::config_path()?;
    println!("# Config file: {}", config_path.display());
    println!("# Output directory: {}\n", settings.report.output_dir().display());
    print!("{}", toml::to_string_pretty(&settings.redacted())?);
    if let Err(err) = settings.validate() {
        println!("\n# ⚠ {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "assay",
            "-t",
            "鲜花店",
            "--model",
            "deepseek-reasoner",
            "--output-dir",
            "/tmp/reports",
            "--no-time-qualifier",
        ]);
        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);

        assert_eq!(cli.topic.as_deref(), Some("鲜花店"));
        assert_eq!(settings.completion.model, "deepseek-reasoner");
        assert_eq!(settings.report.output_dir(), PathBuf::from("/tmp/reports"));
        assert!(!settings.query.time_qualified);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["assay"]);
        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);

        assert!(cli.topic.is_none());
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert!(settings.query.time_qualified);
        assert_eq!(settings.completion.model, "deepseek-chat");
    }

    #[test]
    fn test_cli_subcommands() {
        let cli = Cli::parse_from(["assay", "setup", "--force"]);
        assert!(matches!(cli.command, Some(Commands::Setup { force: true })));
        let cli = Cli::parse_from(["assay", "config"]);
        assert!(matches!(cli.command, Some(Commands::Config)));
    }
}
