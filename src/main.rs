use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use texpipe::Pipeline;
use texpipe::config::Settings;
use texpipe::exec::TokioSpawner;
use texpipe::logging::{LogFacade, LogSink};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("texpipe")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("texpipe.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Writes to the log file and echoes problems to the terminal
struct ConsoleLog {
    verbose: bool,
}

impl LogSink for ConsoleLog {
    fn error(&self, msg: &str) {
        LogFacade.error(msg);
        eprintln!("{} {}", "error:".red().bold(), msg);
    }

    fn warn(&self, msg: &str) {
        LogFacade.warn(msg);
        eprintln!("{} {}", "warning:".yellow(), msg);
    }

    fn info(&self, msg: &str) {
        LogFacade.info(msg);
        if self.verbose {
            println!("{}", msg);
        }
    }

    fn debug(&self, msg: &str) {
        LogFacade.debug(msg);
    }
}

fn pipeline(settings: Settings, verbose: bool) -> Result<Pipeline> {
    Pipeline::new(
        settings,
        Arc::new(TokioSpawner::new()),
        Arc::new(ConsoleLog { verbose }),
    )
    .context("Invalid settings")
}

async fn run_application(cli: &Cli, mut settings: Settings) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }
    if let Some(dir) = &cli.source_dir {
        settings.paths.source_dir = dir.clone();
    }

    let verbose = cli.is_verbose();
    match &cli.command {
        None => handle_create_command(&[], None, false, settings, verbose).await,
        Some(Commands::Create {
            target,
            output_dir,
            keep,
        }) => {
            handle_create_command(target, output_dir.as_ref(), *keep, settings, verbose).await
        }
        Some(Commands::Clear) => handle_clear_command(settings, verbose),
        Some(Commands::Graphics) => handle_graphics_command(settings, verbose).await,
        Some(Commands::Settings) => handle_settings_command(&settings),
    }
}

async fn handle_create_command(
    targets: &[texpipe::engine::Target],
    output_dir: Option<&PathBuf>,
    keep: bool,
    mut settings: Settings,
    verbose: bool,
) -> Result<()> {
    if let Some(dir) = output_dir {
        settings.paths.output_dir = dir.clone();
    }
    if keep {
        settings.build.clean_up = false;
    }
    let targets = if targets.is_empty() {
        settings.build.targets.clone()
    } else {
        targets.to_vec()
    };
    info!("Creating targets {:?} from {}", targets, settings.paths.source_dir.display());

    let names: Vec<&str> = targets.iter().map(|t| t.name()).collect();
    println!(
        "{} {} from {}",
        "Building:".green(),
        names.join(", "),
        settings.paths.source_dir.display()
    );

    let delivered = pipeline(settings, verbose)?
        .create(&targets)
        .await
        .context("Build failed")?;
    for file in &delivered {
        println!("  {} {}", "delivered".cyan(), file.display());
    }
    println!("{} {} files", "Done:".green(), delivered.len());
    Ok(())
}

fn handle_clear_command(settings: Settings, verbose: bool) -> Result<()> {
    info!("Clearing generated files in {}", settings.paths.source_dir.display());
    println!(
        "{} {}",
        "Clearing:".yellow(),
        settings.paths.source_dir.display()
    );
    pipeline(settings, verbose)?.clear_all().context("Clear failed")?;
    Ok(())
}

async fn handle_graphics_command(settings: Settings, verbose: bool) -> Result<()> {
    info!("Processing graphics in {}", settings.paths.source_dir.display());
    let mains = pipeline(settings, verbose)?
        .process_graphics()
        .await
        .context("Graphics processing failed")?;
    println!("{} {}", "Main documents:".green(), mains.len());
    for tex in &mains {
        println!("  {}", tex.display());
    }
    Ok(())
}

fn handle_settings_command(settings: &Settings) -> Result<()> {
    let yaml = serde_yaml::to_string(settings).context("Failed to serialize settings")?;
    print!("{}", yaml);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, settings)
        .await
        .context("Application failed")?;

    Ok(())
}
