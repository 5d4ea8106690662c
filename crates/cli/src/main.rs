mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxymate_core::{load_config_or_default, validate_config, BatchOrchestrator, ChannelSink};

use cli::{render_event, Cli, Stream};

/// Exit code for a run stopped by the user.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for run output
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
    );
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if cli.log_json {
        registry.with(fmt_layer.json()).init();
    } else {
        registry.with(fmt_layer).init();
    }

    let config_path = cli.config_path();
    info!("Loading configuration from {:?}", config_path);
    let mut config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    cli.apply_to(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    let orchestrator = Arc::new(BatchOrchestrator::from_config(&config));
    let job = cli.job(&config);
    info!(run_id = %job.run_id, "Starting batch run");

    let (sink, mut events) = ChannelSink::new();
    let handle = orchestrator
        .start_run(job, Arc::new(sink))
        .await
        .context("Failed to start batch run")?;

    let json = cli.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match render_event(&event, json) {
                (Stream::Stdout, line) => println!("{}", line),
                (Stream::Stderr, line) => eprintln!("{}", line),
            }
            if event.is_terminal() {
                break;
            }
        }
    });

    let canceller = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                orchestrator.cancel_run();
            }
        })
    };

    let result = handle.wait().await;
    canceller.abort();
    if let Err(e) = printer.await {
        warn!("Event printer failed: {}", e);
    }

    let outcome = result.context("Batch run failed")?;
    info!(
        completed = outcome.completed_count,
        total = outcome.total_files,
        "Batch run finished"
    );
    Ok(if outcome.was_cancelled {
        EXIT_CANCELLED
    } else {
        0
    })
}
