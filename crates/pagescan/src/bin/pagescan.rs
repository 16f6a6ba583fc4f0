//! pagescan CLI: inspect configuration and replay recorded scan sessions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use pagescan::replay::{run_replay, ReplaySession};
use pagescan::ScanConfig;
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "pagescan")]
#[command(about = "Scan printed pages and rectify them into flat textures")]
#[command(version)]
struct Cli {
    /// Log verbosity. With the `tracing` feature, `RUST_LOG` overrides it.
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration as JSON, or validate a config file.
    Config(ConfigArgs),

    /// Replay a recorded session and print a JSON report.
    Replay(ReplayArgs),
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Validate this config file instead of printing defaults.
    #[arg(long)]
    check: Option<PathBuf>,

    /// Write the default config here instead of stdout.
    #[arg(long, conflicts_with = "check")]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Recorded session (JSON).
    #[arg(long)]
    session: PathBuf,

    /// Config overriding the one embedded in the session.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn init_logging(level: LogLevel) {
    #[cfg(feature = "tracing")]
    pagescan::core::init_tracing(false, level.into());
    #[cfg(not(feature = "tracing"))]
    {
        let _ = pagescan::core::init_with_level(level.into());
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Commands::Config(args) => run_config(&args),
        Commands::Replay(args) => run_replay_cmd(&args),
    }
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    if let Some(path) = &args.check {
        let cfg = ScanConfig::load_json(path)?;
        cfg.validate()?;
        println!("{}: ok", path.display());
        return Ok(());
    }
    let cfg = ScanConfig::default();
    match &args.out {
        Some(path) => {
            cfg.write_json(path)?;
            log::info!("default config written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&cfg)?),
    }
    Ok(())
}

fn run_replay_cmd(args: &ReplayArgs) -> CliResult<()> {
    log::info!("loading session {}", args.session.display());
    let session = ReplaySession::load_json(&args.session)?;
    let config = match &args.config {
        Some(path) => ScanConfig::load_json(path)?,
        None => session.config.clone().unwrap_or_default(),
    };
    let base_dir = args.session.parent().filter(|p| !p.as_os_str().is_empty());
    let report = run_replay(&session, &config, base_dir)?;

    let json = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
