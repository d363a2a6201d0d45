//! idlestop service binary
//!
//! Stops compute instances that have been idle past a configured limit.
//!
//! ## Usage
//!
//! ```bash
//! # Run the sweep loop (requires COMPUTE_API_URL)
//! idlestop
//!
//! # Run a single sweep and exit
//! idlestop --once
//!
//! # Handle one trigger payload and exit
//! idlestop --event '{"source":"compute.instance-state-change","detail":{"instance-id":"i-0abc","state":"running"}}'
//!
//! # Run with custom log level
//! RUST_LOG=debug idlestop
//! ```

use anyhow::Context;
use clap::Parser;
use idlestop::{
    HttpComputeClient, IdleEvaluator, InactivityTracker, ReaperConfig, ShutdownController,
    TriggerEvent, WebhookRelay,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Automated idle-instance shutdown service
#[derive(Parser, Debug)]
#[command(name = "idlestop")]
#[command(version, about = "Stops compute instances that stay idle past a configured limit")]
struct Args {
    /// Handle one trigger payload (JSON) and exit
    #[arg(long, conflicts_with = "event_file")]
    event: Option<String>,

    /// Handle one trigger payload read from a file and exit
    #[arg(long)]
    event_file: Option<PathBuf>,

    /// Run a single sweep and exit
    #[arg(long, default_value = "false")]
    once: bool,

    /// Seconds between scheduled sweeps
    #[arg(long, default_value = "900")]
    sweep_interval_seconds: u64,

    /// Per-request timeout for platform and webhook calls, in seconds
    #[arg(long, default_value = "10")]
    request_timeout_seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = Args::parse();

    // Malformed configuration is fatal: refuse to run with unusable
    // thresholds rather than silently evaluating against nonsense.
    let config = ReaperConfig::from_env().context("loading configuration")?;

    info!("Starting idlestop");
    info!(
        cpu_threshold = config.cpu_threshold,
        network_threshold = config.network_threshold,
        disk_threshold = config.disk_threshold,
        inactivity_hours = config.inactivity_hours,
        "Idle thresholds loaded",
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout_seconds))
        .build()
        .context("building HTTP client")?;

    let platform = Arc::new(HttpComputeClient::new(
        config.api_url.clone(),
        config.api_token.clone(),
        http.clone(),
    ));
    let relay = Arc::new(WebhookRelay::new(config.webhook_urls.clone(), http));

    let controller = ShutdownController::new(
        platform.clone(),
        platform.clone(),
        relay,
        IdleEvaluator::new(platform.clone(), config.clone()),
        InactivityTracker::new(platform),
        config,
    );

    // One-shot event mode: handle the payload and exit; unexpected errors
    // propagate so the hosting runtime records the invocation as failed.
    let event_payload = match (&args.event, &args.event_file) {
        (Some(raw), _) => Some(raw.clone()),
        (None, Some(path)) => {
            Some(std::fs::read_to_string(path).context("reading event file")?)
        }
        (None, None) => None,
    };

    if let Some(raw) = event_payload {
        let event = TriggerEvent::from_json(&raw).context("parsing trigger event")?;
        if let Some(summary) = controller.handle_event(&event).await? {
            println!("{}", serde_json::to_string(&summary)?);
        }
        return Ok(());
    }

    if args.once {
        let summary = controller.sweep().await?;
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    // Sweep loop: a transient platform error fails one sweep, not the
    // daemon.
    info!(
        interval_seconds = args.sweep_interval_seconds,
        "Running scheduled sweeps",
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(args.sweep_interval_seconds));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = controller.sweep().await {
                    error!(error = %e, "Sweep failed");
                }
            }
        }
    }

    info!("idlestop shutting down");
    Ok(())
}
