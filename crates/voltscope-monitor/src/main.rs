//! VoltScope monitor
//!
//! Opens the acquisition board (or the demo device), acquires on a
//! background thread and redraws every channel at a fixed interval.
//!
//! ```text
//! voltscope-monitor [--config PATH] [--demo] [--list-ports]
//! ```

mod render;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voltscope_core::prelude::*;

use crate::render::LogRenderer;

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    demo: bool,
    list_ports: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--demo" => parsed.demo = true,
            "--list-ports" => parsed.list_ports = true,
            other => bail!("Unknown argument: {other}"),
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if args.demo {
        config.demo = true;
    }
    config.validate()?;
    Ok(config)
}

/// Open the transport and start acquiring into a fresh store
fn start_acquisition(config: &MonitorConfig) -> Result<(AcquisitionLoop, StoreHandle)> {
    let store = StoreHandle::new(config.window_len);

    let acquisition = if config.demo {
        info!("Using demo device");
        let device = DemoDevice::new(config.window_len)
            .with_corruption(0.02)
            .paced(config.tick_interval());
        let reader = FrameReader::new(device)
            .with_timeout(config.read_timeout())
            .with_max_frame_len(config.max_frame_len);
        AcquisitionLoop::spawn(SampleSink::with_store(reader, store.clone()))?
    } else {
        let port = open_port(&config.port_name, Some(config.baud_rate)).with_context(|| {
            format!("Could not connect to serial port {}", config.port_name)
        })?;
        let reader = FrameReader::new(port)
            .with_timeout(config.read_timeout())
            .with_max_frame_len(config.max_frame_len);
        AcquisitionLoop::spawn(SampleSink::with_store(reader, store.clone()))?
    };

    Ok((acquisition, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let config = load_config(&args)?;

    if args.list_ports {
        for port in list_ports(Some(&config.port_name)) {
            let marker = if port.name == config.port_name { "*" } else { " " };
            let kind = if port.is_usb() { "usb" } else { "uart" };
            println!(
                "{} {}\t{}\t{}",
                marker,
                port.name,
                kind,
                port.product.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    let (acquisition, store) = start_acquisition(&config)?;
    info!("Started monitor ({} samples per channel)", config.window_len);

    let status_every = (1000 / config.tick_interval_ms).max(1);
    let mut renderer = LogRenderer::new(store, status_every);
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if acquisition.is_finished() {
                    break;
                }
                renderer.draw();
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping acquisition");
                break;
            }
        }
    }

    acquisition.stop();
    let joined = tokio::time::timeout(
        config.read_timeout() + Duration::from_secs(1),
        tokio::task::spawn_blocking(move || acquisition.join()),
    )
    .await;

    match joined {
        Ok(result) => {
            let ticks = result.context("Acquisition thread failed")??;
            info!(
                "Monitor stopped after {} acquisitions, {} redraws",
                ticks,
                renderer.frames_drawn()
            );
            Ok(())
        }
        Err(_) => {
            warn!("Acquisition thread did not stop in time");
            Ok(())
        }
    }
}
