//! Environmental station poller.
//!
//! Reads Modbus RTU sensors on a fixed interval and uploads each cycle's
//! readings to an HTTP, Supabase, Firebase or Google Sheets sink.

use anyhow::{Context, Result};
use clap::Parser;
use envstation_common::LoggingConfig;
use envstation_modbus::config::StationConfig;
use envstation_modbus::poller::Poller;
use envstation_modbus::transport::RtuTransport;
use std::path::PathBuf;
use tracing::{info, warn};

/// Polls environmental sensors over Modbus RTU and uploads the readings.
#[derive(Parser, Debug)]
#[command(name = "envstation")]
#[command(about = "Polls Modbus RTU sensors and uploads readings")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "envstation.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single poll cycle immediately and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = StationConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    envstation_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting envstation");
    info!("Loaded configuration from {:?}", args.config);

    if let Some(wifi) = &config.wifi {
        info!(ssid = %wifi.ssid, "Network link is managed by the host");
    }

    let clock = config
        .clock
        .offset()
        .map_err(|e| anyhow::anyhow!("Invalid clock config: {}", e))?;

    let transport = RtuTransport::open(&config.serial)
        .with_context(|| format!("Failed to open serial port {}", config.serial.port))?;
    info!(
        "Opened {} at {} baud",
        config.serial.port, config.serial.baud_rate
    );

    let uploader = config
        .upload
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build uploader: {}", e))?;
    info!(
        "Uploading to {} ({})",
        config.upload.backend.name(),
        config.upload.backend.endpoint()
    );

    let mut poller = Poller::new(
        transport,
        uploader,
        config.sensors(),
        config.poll.settle_delay(),
        clock,
    );

    if args.once {
        let report = poller.poll_once().await;
        if !report.uploaded {
            warn!("Single cycle finished without a successful upload");
        }
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    let stats = poller.run(config.poll.interval(), shutdown).await;
    info!(
        "envstation stopped ({} uploads, {:.1}% successful)",
        stats.total(),
        stats.success_rate()
    );

    Ok(())
}
