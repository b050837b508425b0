//! # vtxrust-core
//!
//! Core protocol implementation for lewei_cmd camera transmitters.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - Command definitions
//! - Command to port routing
//! - Protocol constants

pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod route;
pub mod words;

pub use command::Command;
pub use error::{Error, Result};
pub use frame::{Frame, FrameHeader, Payload};
pub use route::{route, Port};

/// Frame header size
pub const HEADER_SIZE: usize = constants::HEADER_SIZE;
