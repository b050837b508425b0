//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] vtxrust_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] vtxrust_transport::Error),

    /// Reply opcode is neither the one requested nor a keep-alive
    #[error("Invalid response command type: expected 0x{expected:04X}, got 0x{received:04X}")]
    ProtocolDesync {
        expected: u32,
        received: u32,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Check if the device could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Transport(
                vtxrust_transport::Error::Unreachable { .. }
                    | vtxrust_transport::Error::ConnectTimeout(_)
            )
        )
    }
}
