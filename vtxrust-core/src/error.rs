//! Error types for vtxrust-core



/// Result type alias for vtxrust-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Payload would overflow the 32-bit length field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Header field index outside 0..9
    #[error("Header field index {0} out of range (0..9)")]
    FieldOutOfRange(usize),

    /// The length field only changes through appends
    #[error("Header field 3 (payload length) is derived from the payload and cannot be set")]
    LengthFieldReadOnly,

    /// Header does not start with "lewei_cmd\0"
    #[error("Invalid header tag: {found:02X?}")]
    InvalidTag {
        found: [u8; crate::constants::TAG_SIZE],
    },

    /// Buffer shorter than a frame header
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Bytes after the header disagree with the declared payload length
    #[error("Payload length mismatch: header declares {declared} bytes, buffer holds {actual}")]
    LengthMismatch {
        declared: u32,
        actual: usize,
    },

    /// Unknown command code
    #[error("Unknown command code: 0x{0:04X}")]
    UnknownCommand(u32),

    /// Byte buffer cannot be split into whole 32-bit words
    #[error("Cannot decode {len} bytes as 32-bit words")]
    MisalignedWords {
        len: usize,
    },
}

impl Error {
    /// Check if error comes from bytes received off the wire
    /// (as opposed to a caller mistake)
    pub fn is_wire_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTag { .. }
                | Self::FrameTooShort { .. }
                | Self::LengthMismatch { .. }
                | Self::UnknownCommand(_)
                | Self::MisalignedWords { .. }
        )
    }
}
