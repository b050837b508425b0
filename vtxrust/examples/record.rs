//! Record a short clip and take a photo

use std::time::Duration;
use tokio::time::sleep;
use vtxrust::{Client, ClientConfig, Switch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let client = Client::new(ClientConfig::from_env()?);

    println!("Recording...");
    client.set_recording(Switch::On).await?;
    sleep(Duration::from_secs(5)).await;

    println!("Stopping...");
    client.set_recording(Switch::Off).await?;

    println!("Taking photo...");
    client.take_photo().await?;

    println!("Done!");

    Ok(())
}
