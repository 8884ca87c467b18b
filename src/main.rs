//! tagpost - RFID product-tag station relaying scans to the rental API.

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::Parser;
use linux_embedded_hal::SpidevDevice;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use mfrc522::Mfrc522;
use mfrc522::comm::blocking::spi::SpiInterface;
use tagpost as app;
use tokio::io::BufReader;
use tokio::sync::watch;
use tokio_serial::SerialPortBuilderExt;

use app::card::{CardSession, Rc522Reader};
use app::config::{ConfigLoadResult, StationConfig};
use app::link::{AtChannel, WifiLink};
use app::station::Station;

/// RFID product-tag station for the rental counter.
#[derive(Parser)]
#[command(name = "tagpost")]
struct Cli {
    /// Path to the config file (default: tagpost.toml next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use tagpost.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("tagpost starting...");

    let config_path = if let Some(path) = cli.config {
        path
    } else if cli.dev {
        tracing::info!("Dev mode: loading config from current directory");
        PathBuf::from("tagpost.toml")
    } else {
        StationConfig::default_path()
    };
    tracing::info!("Config path: {:?}", config_path);

    let config = match StationConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => {
            tracing::info!("Config loaded successfully");
            config
        }
        ConfigLoadResult::Missing => {
            tracing::info!("Config missing, running on built-in defaults");
            StationConfig::default()
        }
        ConfigLoadResult::Invalid(e) => {
            return Err(anyhow!(e).context("invalid config"));
        }
    };

    // RC522 over SPI
    let mut spi = SpidevDevice::open(&config.reader.spidev)
        .map_err(|e| anyhow!("open SPI device {}: {e:?}", config.reader.spidev))?;
    spi.0
        .configure(
            &SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(1_000_000)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build(),
        )
        .context("configure SPI device")?;

    let mfrc = Mfrc522::new(SpiInterface::new(spi))
        .init()
        .map_err(|e| anyhow!("RC522 init failed: {e:?}"))?;
    // Without a working reader no action is meaningful; refuse to start.
    let reader = Rc522Reader::new(mfrc).context("RC522 self-test")?;
    let session = CardSession::new(reader, config.reader.block);

    // ESP-01 over serial
    let port = tokio_serial::new(&config.modem.port, config.modem.baud)
        .open_native_async()
        .with_context(|| format!("open modem port {}", config.modem.port))?;
    let mut link = WifiLink::new(AtChannel::new(port), config.wifi.clone(), config.api.clone());

    link.connect(config.wifi.connect_attempts)
        .await
        .context("wifi association failed, check the modem and restart")?;

    println!("RC522 and WiFi OK!");

    // Ctrl-C flips the shutdown flag; every blocking wait selects against it.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut station = Station::new(session, link, shutdown_rx);
    station.run(BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}
