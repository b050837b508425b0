//! List videos on the SD card

use tracing_subscriber::EnvFilter;
use vtxrust::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Set VTX_DEVICE_ADDR if the drone is not at 192.168.0.1
    let client = Client::new(ClientConfig::from_env()?);

    println!("Listing videos on {}...", client.config().device_addr);

    let count = client
        .action(vtxrust::Command::ListVideos, vtxrust::Payload::Empty, |listing| {
            println!("{:02X?}", &listing[..listing.len().min(64)]);
            listing.len()
        })
        .await?;

    println!("✓ {} bytes of listing", count);

    Ok(())
}
