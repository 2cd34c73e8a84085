//! Cloudflight Daemon - HyperX Cloud Flight status service.
//!
//! Opens a headset session and writes every event to stdout as one JSON
//! object per line for a presentation process to consume. Logs go to
//! stderr.

use anyhow::{Context, Result};
use cloudflight_core::HeadsetEvent;
use cloudflight_hid::Session;
use cloudflight_ipc::EventWriter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod signals;

use config::DaemonConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;
    init_logging(&config.daemon)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Cloudflight daemon");

    let mut writer = EventWriter::new(tokio::io::stdout());

    let (session, mut events) = match Session::connect(config.session.clone()) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to open headset session");
            if let Err(write_err) = writer.send(HeadsetEvent::error(&e)).await {
                warn!(error = %write_err, "Could not report failure to consumer");
            }
            return Err(e).context("Failed to open headset session");
        }
    };

    let mut shutdown_rx = signals::setup_signal_handlers(config.daemon.watch_stdin)?;

    info!("Daemon running. Press Ctrl+C to exit.");

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                debug!(channel = event.channel(), "Forwarding event");
                if let Err(e) = writer.send(event).await {
                    warn!(error = %e, "Event consumer went away");
                    break;
                }
            }

            _ = shutdown_rx.recv() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    session.shutdown().await;
    info!("Cloudflight daemon stopped");
    Ok(())
}

fn init_logging(config: &DaemonConfig) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(&config.log_level, env.as_deref())?;

    // stdout carries the event stream
    let builder = tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter);
    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Build the log filter. Directives from `RUST_LOG` replace the configured
/// level entirely.
fn log_filter(level: &str, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = env.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::try_new(directives).with_context(|| {
            format!("Invalid {} directives: {directives}", EnvFilter::DEFAULT_ENV)
        });
    }

    let defaults = ["cloudflight_daemon", "cloudflight_hid", "cloudflight_core", "cloudflight_ipc"]
        .map(|target| format!("{target}={level}"))
        .join(",");
    EnvFilter::try_new(defaults).with_context(|| format!("Invalid log level: {level}"))
}
