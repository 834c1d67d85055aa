//! herald - send a CSV of WhatsApp messages
//!
//! Usage:
//!   herald send messages.csv
//!   herald send messages.csv --dry-run --format json
//!   herald sample

use std::{io::Write, path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use herald::{
    config::HeraldConfig,
    dry_run::DryRunTransport,
    report::Summary,
    rows,
    sample::{self, SAMPLE_FILE},
    send,
};
use herald_common::{internal, logging};
use herald_dispatch::{Dispatcher, Transport};
use herald_whatsapp::WhatsAppTransport;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Bulk WhatsApp message sender", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file, overriding discovery
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send every row of a CSV file
    Send {
        /// CSV with Mobile and Message columns, and optionally Type
        csv: PathBuf,

        /// Log messages instead of calling the API
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write a sample CSV
    Sample {
        #[arg(default_value = SAMPLE_FILE)]
        path: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    match cli.command {
        Commands::Sample { path } => {
            if sample::write_sample(&path)? {
                println!("Created {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
            Ok(())
        }
        Commands::Send {
            csv,
            dry_run,
            format,
        } => {
            let config = HeraldConfig::load(cli.config.as_deref())?;
            run_send(config, &csv, dry_run, format).await
        }
    }
}

async fn run_send(
    config: HeraldConfig,
    csv: &std::path::Path,
    dry_run: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let entries =
        rows::read_path(csv).with_context(|| format!("Failed to read {}", csv.display()))?;

    if let Err(err) = herald_metrics::init_metrics(&config.metrics) {
        tracing::warn!("Metrics disabled: {err}");
    }

    let transport: Arc<dyn Transport> = if dry_run {
        internal!(level = INFO, "Dry run, nothing will be sent");
        Arc::new(DryRunTransport::new())
    } else {
        Arc::new(WhatsAppTransport::new(&config.whatsapp)?)
    };

    let dispatcher = Dispatcher::new(config.dispatch, transport)?;

    let started = Instant::now();
    let results = send::send_all(&dispatcher, &entries, interrupted()).await;
    let summary = Summary::new(results, dispatcher.snapshot(), started.elapsed());

    let mut out = std::io::stdout().lock();
    match format {
        OutputFormat::Text => summary.write_text(&mut out)?,
        OutputFormat::Json => summary.write_json(&mut out)?,
    }
    out.flush()?;

    if let Err(err) = herald_metrics::shutdown() {
        tracing::warn!("Failed to flush metrics: {err}");
    }

    Ok(())
}

/// Resolves on CTRL+C, or SIGTERM on unix.
async fn interrupted() {
    #[cfg(unix)]
    {
        let Ok(mut terminate) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                internal!("CTRL+C entered, abandoning outstanding messages");
            }
            _ = terminate.recv() => {
                internal!("Terminate Signal received, abandoning outstanding messages");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        internal!("CTRL+C entered, abandoning outstanding messages");
    }
}
