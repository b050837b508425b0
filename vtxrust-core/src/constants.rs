//! Protocol constants

use std::net::Ipv4Addr;

/// Literal tag opening every frame header ("lewei_cmd" + NUL)
pub const TAG: &[u8; TAG_SIZE] = b"lewei_cmd\0";

/// Tag length in bytes
pub const TAG_SIZE: usize = 10;

/// Number of 32-bit header fields following the tag
pub const FIELD_COUNT: usize = 9;

/// Header size: tag + 9 × u32
pub const HEADER_SIZE: usize = TAG_SIZE + FIELD_COUNT * 4;

/// Header field holding the opcode
pub const ACTION_FIELD: usize = 0;

/// Header field holding the payload byte length
pub const LENGTH_FIELD: usize = 3;

/// Default device address (the drone acts as access point)
pub const DEVICE_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);

/// Port carrying live video, playback, downloads and keep-alive
pub const STREAM_PORT: u16 = 7060;

/// Port carrying everything else
pub const CONTROL_PORT: u16 = 8060;

/// Keep-alive interval (milliseconds)
pub const KEEPALIVE_INTERVAL_MS: u64 = 2000;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;

/// Payload words used by on/off style commands
pub mod switch {
    pub const OFF: u32 = 0;
    pub const ON: u32 = 1;
}
