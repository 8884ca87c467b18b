//! Probe the ESP-01 link: join the network and post a test product id.
//!
//! Usage: cargo run --example link_probe [PORT] [PRODUCT_ID]
//!
//! Default port: /dev/ttyUSB0

use tagpost::config::StationConfig;
use tagpost::link::{AtChannel, WifiLink};
use tokio_serial::SerialPortBuilderExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let port_name = std::env::args().nth(1).unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let product_id = std::env::args().nth(2).unwrap_or_else(|| "999".to_string());

    let config = StationConfig::default();

    println!("Probing modem on {port_name}");
    println!("======================================");

    let port = tokio_serial::new(&port_name, config.modem.baud).open_native_async()?;
    let mut link = WifiLink::new(AtChannel::new(port), config.wifi.clone(), config.api.clone());

    println!("\n[1] Joining {}...", config.wifi.ssid);
    link.connect(config.wifi.connect_attempts).await?;
    println!("    Associated.");

    println!("\n[2] Posting product {product_id}...");
    link.post_product(&product_id).await?;
    println!("    Request pushed (delivery is fire-and-forget).");

    Ok(())
}
