//! Opcode to service port routing
//!
//! The device splits its protocol over two TCP ports. Video related traffic
//! (playback, downloads, and the keep-alive that holds those sessions open)
//! goes to the stream port; everything else goes to the control port.

use std::fmt;

use crate::constants::{CONTROL_PORT, STREAM_PORT};

/// Service port selector
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Port {
    /// Commands and metadata (capture, photo, listing, delete, clock)
    Control,

    /// Live video, playback, downloads, keep-alive
    Stream,
}

impl Port {
    /// Well-known port number
    pub fn default_number(self) -> u16 {
        match self {
            Self::Control => CONTROL_PORT,
            Self::Stream => STREAM_PORT,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Stream => write!(f, "stream"),
        }
    }
}

/// Select the port an opcode is sent to
///
/// Unknown opcodes go to the control port.
pub fn route(opcode: u32) -> Port {
    match opcode {
        // keep-alive, play video, download video
        0x0001 | 0x0009 | 0x0012 => Port::Stream,
        _ => Port::Control,
    }
}
