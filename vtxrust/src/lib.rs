//! # vtxrust
//!
//! Rust implementation of the lewei_cmd protocol spoken by drone camera
//! transmitters.
//!
//! ## Features
//!
//! - Type-safe frame codec
//! - Async/await API using Tokio
//! - Background keep-alive with reply filtering
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use vtxrust::{Client, ClientConfig, Switch};
//!
//! #[tokio::main]
//! async fn main() -> vtxrust::Result<()> {
//!     // The drone is its own access point at 192.168.0.1
//!     let client = Client::new(ClientConfig::from_env()?);
//!
//!     // Start recording
//!     client.set_recording(Switch::On).await?;
//!
//!     // Raw video listing
//!     let listing = client.list_videos().await?;
//!     println!("{:02X?}", listing);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod exchange;

// Re-exports
pub use client::{Client, Session, Switch};
pub use config::ClientConfig;
pub use error::{Error, Result};

// Re-export types
pub use vtxrust_core::{Command, Frame, Payload, Port};
pub use vtxrust_transport::{Connection, LocalAddr};
