//! Standalone host binary.
//!
//! Usage:
//!   cargo run -p engine_host -- [--config host.json] [--assets assets] [--frame-hz 60] [--frames 600]
//!
//! Loads every JSON payload in the asset directory, re-sends files as they are
//! edited, and runs a headless frame loop against a null device.

use std::env;

use anyhow::Context;
use engine_assets::{EngineConfig, NullDevice};
use engine_host::Host;
use tracing::info;

fn parse_args() -> anyhow::Result<EngineConfig> {
    let args: Vec<String> = env::args().collect();
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => EngineConfig::from_file(&args[i + 1])?,
        _ => EngineConfig::default(),
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--assets" if i + 1 < args.len() => {
                cfg.asset_dir = args[i + 1].clone();
                i += 2;
            }
            "--frame-hz" if i + 1 < args.len() => {
                cfg.frame_hz = args[i + 1].parse().unwrap_or(60);
                i += 2;
            }
            "--frames" if i + 1 < args.len() => {
                cfg.max_frames = args[i + 1].parse().ok();
                i += 2;
            }
            "--scene" if i + 1 < args.len() => {
                cfg.scene = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = parse_args().context("invalid arguments")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cfg.log_filter.as_str().into()),
        )
        .init();

    info!(
        assets = %cfg.asset_dir,
        frame_hz = cfg.frame_hz,
        max_frames = ?cfg.max_frames,
        "Starting host"
    );

    let mut host = Host::new(cfg, NullDevice::shared())?;
    let frames = host.run().await?;
    host.shutdown();

    info!(frames, "Host exited");
    Ok(())
}
