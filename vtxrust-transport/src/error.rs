//! Transport errors

use std::io;
use std::net::SocketAddr;

use vtxrust_core::Frame;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Can't connect to {addr}, are you on the drone's wifi? ({source})")]
    Unreachable {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Connection timeout to {0}")]
    ConnectTimeout(SocketAddr),

    #[error("Connection closed")]
    ConnectionClosed,

    /// Stream failed mid-payload; `partial` holds the bytes that did arrive
    #[error("Incomplete payload: expected {expected} bytes, got {}", .partial.payload_len())]
    IncompletePayload {
        partial: Box<Frame>,
        expected: u32,
        #[source]
        source: io::Error,
    },

    #[error("Declared payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    #[error("Keep-alive interval must be non-zero")]
    ZeroKeepAliveInterval,

    /// Keep-alive task panicked or was aborted before teardown
    #[error("Keep-alive task failed: {0}")]
    KeepAlive(#[from] tokio::task::JoinError),

    #[error("Frame error: {0}")]
    Core(#[from] vtxrust_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Check if a fresh connection might succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::ConnectTimeout(_) | Self::Io(_)
        )
    }

    /// Check if the stream is no longer usable
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::KeepAlive(_)
                | Self::IncompletePayload { .. }
                | Self::PayloadTooLarge { .. }
                | Self::Core(_)
                | Self::Io(_)
        )
    }
}
