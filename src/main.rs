use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

use tickwatch::config::Settings;
use tickwatch::runner::{ControlLoop, run_once};

mod cli;

use cli::Cli;
use cli::commands::Commands;
use cli::output;

fn setup_logging(level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tickwatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tickwatch.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    env_logger::Builder::new()
        .parse_filters(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, settings: Settings) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run { once } => handle_run_command(*once, settings).await,
        Commands::Check => handle_check_command(settings).await,
        Commands::Validate => handle_validate_command(settings),
    }
}

async fn handle_run_command(once: bool, settings: Settings) -> Result<()> {
    let mut builder = settings
        .into_builder()?
        .set_global_watcher_hooks(output::watcher_printer())
        .set_hooks(output::iteration_printer());
    if once {
        builder = builder.run_only_once();
    }
    let config = builder.build().context("Invalid configuration")?;
    info!("Running {} watchers", config.watcher_names().len());

    let monitor = ControlLoop::new(config).start();
    let handle = monitor.handle().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("{}", "Stopping after the current tick (Ctrl-C again to abort)...".yellow());
            handle.stop();
        }
        // a stopped loop no longer accepts Kill
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Aborting in-flight tick on second interrupt");
            std::process::exit(130);
        }
    });

    let summary = monitor.wait().await.context("Control loop task failed")?;
    println!(
        "{} {} after {} iterations",
        "Finished:".green(),
        summary.final_state,
        summary.iterations_completed
    );
    Ok(())
}

async fn handle_check_command(settings: Settings) -> Result<()> {
    let config = settings
        .into_builder()?
        .set_global_watcher_hooks(output::watcher_printer())
        .build()
        .context("Invalid configuration")?;

    let iteration = run_once(config)
        .await
        .ok_or_else(|| eyre::eyre!("Check did not complete"))?;
    println!("{}", output::iteration_line(&iteration));

    let failed = iteration.failed_results().count();
    if failed > 0 {
        eyre::bail!("{} watcher(s) invalid", failed);
    }
    Ok(())
}

fn handle_validate_command(settings: Settings) -> Result<()> {
    let config = settings
        .into_builder()?
        .build()
        .context("Invalid configuration")?;
    println!(
        "{} {} watchers",
        "Configuration OK:".green(),
        config.watcher_names().len()
    );
    for name in config.watcher_names() {
        println!("  {}", name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = if cli.is_verbose() {
        "debug".to_string()
    } else {
        settings.log_level.clone()
    };
    setup_logging(&level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, settings).await.context("Application failed")?;

    Ok(())
}
