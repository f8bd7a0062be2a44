//! Glowlink CLI — scan for devices, push colors, run a test responder.
//!
//! This is a diagnostic surface, not the product UI: it exists to exercise
//! discovery and streaming against real or simulated devices from a shell.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use glowlink_client::{CaptureSource, ColorStreamer, ConnectionManager, CropRect, StreamConfig};
use glowlink_core::{Announcement, RegionColors, Rgb, DEFAULT_DEVICE_PORT};
use glowlink_discovery::{Device, Responder, ScanConfig, ScanEvent, Scanner};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Glowlink — ambient-LED discovery and color streaming
#[derive(Parser)]
#[command(name = "glowlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter (e.g. "debug", "glowlink_discovery=trace")
    #[arg(short, long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the local network for devices
    Scan {
        /// Broadcast port
        #[arg(short, long, default_value_t = DEFAULT_DEVICE_PORT)]
        port: u16,
        /// Scan window in seconds
        #[arg(short, long, default_value_t = 10)]
        window: u64,
    },
    /// Run a device-side discovery responder (for testing scanners)
    Respond {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_DEVICE_PORT)]
        port: u16,
        /// Announced device name (defaults to the hostname)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Push a single solid color (legacy 4-byte command)
    Solid {
        /// Device address, e.g. 192.168.1.50:7777
        addr: SocketAddr,
        /// Color as #rrggbb
        color: String,
    },
    /// Stream a cycling demo pattern to a device
    Stream {
        /// Device address, e.g. 192.168.1.50:7777
        addr: SocketAddr,
        /// Frames per second
        #[arg(short, long, default_value_t = 10.0)]
        rate: f64,
        /// How long to stream, in seconds
        #[arg(short, long, default_value_t = 10)]
        secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid log filter")?)
        .init();

    match cli.command {
        Command::Scan { port, window } => scan(port, window).await,
        Command::Respond { port, name } => respond(port, name).await,
        Command::Solid { addr, color } => solid(addr, &color).await,
        Command::Stream { addr, rate, secs } => stream(addr, rate, secs).await,
    }
}

async fn scan(port: u16, window: u64) -> Result<()> {
    let mut scanner = Scanner::with_config(ScanConfig {
        port,
        scan_window: Duration::from_secs(window),
        ..ScanConfig::default()
    });

    println!("{} (port {port}, {window}s window)", "Scanning…".bold());

    let mut events = scanner.start_scan().await?;
    while let Some(event) = events.recv().await {
        match event {
            ScanEvent::Found(device) => {
                let rssi = device
                    .rssi
                    .map(|r| format!("{r} dBm"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {} {} at {} ({})",
                    "found".green(),
                    device.name.bold(),
                    device.socket_addr(),
                    rssi
                );
            }
            ScanEvent::Updated(_) => {}
            ScanEvent::Finished => break,
        }
    }

    let devices = scanner.devices();
    if devices.is_empty() {
        println!("{}", "No devices found.".yellow());
    } else {
        println!("{} device(s) total.", devices.len());
    }
    Ok(())
}

async fn respond(port: u16, name: Option<String>) -> Result<()> {
    let announcement = match name {
        Some(name) => Announcement::new(name.clone(), name),
        None => Responder::host_announcement(),
    };
    let responder = Responder::bind(port, announcement.with_port(port)).await?;
    println!("{} on port {port} (ctrl-c to stop)", "Responding".bold());
    responder.run().await?;
    Ok(())
}

fn device_at(addr: SocketAddr) -> Device {
    Device {
        id: addr.to_string(),
        name: format!("LED @ {}", addr.ip()),
        addr: addr.ip(),
        port: addr.port(),
        rssi: None,
        connected: false,
    }
}

async fn solid(addr: SocketAddr, color: &str) -> Result<()> {
    let color = Rgb::from_hex(color).context("color must be #rrggbb")?;

    let manager = ConnectionManager::new();
    manager.connect(device_at(addr)).await?;
    manager.send_solid(color).await;
    info!("sent {} to {}", color, addr);

    println!("{} {color} → {addr}", "sent".green());
    Ok(())
}

/// Demo capture source: slowly rotates a hue around the four edges
struct DemoPattern;

impl CaptureSource for DemoPattern {
    fn capture(&self, _crop: &CropRect) -> Option<RegionColors> {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_millis() as u64;
        let base = (millis / 40 % 360) as f32;
        let edge = |offset: f32| hue_to_rgb((base + offset) % 360.0);
        Some(RegionColors::new(
            edge(0.0),
            edge(90.0),
            edge(180.0),
            edge(270.0),
            edge(0.0),
        ))
    }
}

fn hue_to_rgb(hue: f32) -> Rgb {
    let h = hue / 60.0;
    let x = (1.0 - (h % 2.0 - 1.0).abs()) * 255.0;
    let (r, g, b) = match h as u32 {
        0 => (255.0, x, 0.0),
        1 => (x, 255.0, 0.0),
        2 => (0.0, 255.0, x),
        3 => (0.0, x, 255.0),
        4 => (x, 0.0, 255.0),
        _ => (255.0, 0.0, x),
    };
    Rgb::new(r as u8, g as u8, b as u8)
}

async fn stream(addr: SocketAddr, rate: f64, secs: u64) -> Result<()> {
    let manager = Arc::new(ConnectionManager::new());
    manager.connect(device_at(addr)).await?;

    let streamer = ColorStreamer::new(manager, Arc::new(DemoPattern));
    streamer.start(StreamConfig {
        update_rate: rate,
        crop: CropRect::default(),
    });

    println!(
        "{} demo pattern to {addr} at {rate:.0} fps for {secs}s",
        "Streaming".bold()
    );
    tokio::time::sleep(Duration::from_secs(secs)).await;

    streamer.stop();
    println!("{}", "Done.".green());
    Ok(())
}
