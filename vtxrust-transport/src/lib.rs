//! Transport layer for the lewei_cmd protocol
//!
//! Provides framed TCP communication with the device.

pub mod connection;
pub mod error;
pub mod io;
pub mod local_addr;

pub use connection::{Connection, DialOptions, Teardown};
pub use error::{Error, Result};
pub use io::{read_frame, write_frame, FrameStream, FrameWriter};
pub use local_addr::LocalAddr;

use async_trait::async_trait;
use vtxrust_core::Frame;

/// Frame transport trait
///
/// One frame per call in each direction. Receiving blocks until a whole
/// frame arrived or the stream failed; there is no timeout.
#[async_trait]
pub trait Transport: Send {
    /// Send one frame
    async fn send(&mut self, frame: &Frame) -> Result<()>;

    /// Receive one frame
    async fn recv(&mut self) -> Result<Frame>;
}
