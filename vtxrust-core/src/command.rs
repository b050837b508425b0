//! lewei_cmd command codes

use std::fmt;

use crate::error::{Error, Result};
use crate::route::{self, Port};

/// Protocol command codes (header field 0)
///
/// Only the opcodes the client speaks are named. Values marked reserved
/// show up on the wire but their meaning is unknown; they are kept so that
/// frames carrying them can still be labelled in logs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    // Stream port
    KeepAlive = 0x0001,
    StartStream = 0x0002,
    Reserved0003 = 0x0003,

    // Device state
    SetClock = 0x0004,

    // SD card media
    CheckVideo = 0x0006,
    ListVideos = 0x0008,
    PlayVideo = 0x0009,
    CloseStream = 0x0010,
    CaptureVideo = 0x0011,
    DownloadVideo = 0x0012,
    TakePhoto = 0x0013,
    DeleteVideo = 0x0014,

    // Stream payloads
    StreamData = 0x0101,
    VideoFile = 0x0106,
}

impl Command {
    /// Check if the opcode is seen on the wire but has no known meaning
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Self::StartStream | Self::Reserved0003 | Self::CloseStream | Self::StreamData
        )
    }

    /// Service port this command is sent to
    pub fn port(self) -> Port {
        route::route(self.into())
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::KeepAlive => "KEEP_ALIVE",
            Self::StartStream => "START_STREAM?",
            Self::Reserved0003 => "RESERVED_0003",
            Self::SetClock => "SET_CLOCK",
            Self::CheckVideo => "CHECK_VIDEO",
            Self::ListVideos => "LIST_VIDEOS",
            Self::PlayVideo => "PLAY_VIDEO",
            Self::CloseStream => "CLOSE_STREAM?",
            Self::CaptureVideo => "CAPTURE_VIDEO",
            Self::DownloadVideo => "DOWNLOAD_VIDEO",
            Self::TakePhoto => "TAKE_PHOTO",
            Self::DeleteVideo => "DELETE_VIDEO",
            Self::StreamData => "STREAM_DATA?",
            Self::VideoFile => "VIDEO_FILE",
        }
    }

    /// Render any opcode, named or not
    pub fn describe(opcode: u32) -> String {
        match Self::try_from(opcode) {
            Ok(cmd) => cmd.to_string(),
            Err(_) => format!("UNKNOWN(0x{:04X})", opcode),
        }
    }
}

impl From<Command> for u32 {
    fn from(cmd: Command) -> u32 {
        cmd as u32
    }
}

impl TryFrom<u32> for Command {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0x0001 => Ok(Self::KeepAlive),
            0x0002 => Ok(Self::StartStream),
            0x0003 => Ok(Self::Reserved0003),
            0x0004 => Ok(Self::SetClock),
            0x0006 => Ok(Self::CheckVideo),
            0x0008 => Ok(Self::ListVideos),
            0x0009 => Ok(Self::PlayVideo),
            0x0010 => Ok(Self::CloseStream),
            0x0011 => Ok(Self::CaptureVideo),
            0x0012 => Ok(Self::DownloadVideo),
            0x0013 => Ok(Self::TakePhoto),
            0x0014 => Ok(Self::DeleteVideo),
            0x0101 => Ok(Self::StreamData),
            0x0106 => Ok(Self::VideoFile),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), *self as u32)
    }
}
