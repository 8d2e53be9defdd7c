//! Modelcat CLI - Command-line interface for the model catalogue ingestion pipeline.

use clap::Parser;
use modelcat_cli::commands;
use modelcat_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn,modelcat=info",
        1 => "warn,modelcat=debug",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> modelcat_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);
    let api_key = cli.api_key.as_deref();

    match cli.command {
        Command::Submit(args) => {
            commands::execute_submit(args, &config, api_key, &formatter).await?;
        }
        Command::RunBatch(args) => {
            commands::execute_run_batch(args, &config, api_key, &formatter).await?;
        }
        Command::Ledger(args) => {
            commands::execute_ledger(args, &config, &formatter).await?;
        }
        Command::Config(args) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter)?;
        }
    }

    Ok(())
}
