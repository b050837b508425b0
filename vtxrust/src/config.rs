//! Client configuration

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use vtxrust_core::Port;
use vtxrust_core::constants::{
    CONTROL_PORT, DEFAULT_CONNECT_TIMEOUT, DEVICE_ADDR, KEEPALIVE_INTERVAL_MS, STREAM_PORT,
};
use vtxrust_transport::{DialOptions, LocalAddr};

use crate::error::{Error, Result};

/// Environment variable overriding the device address
pub const ENV_DEVICE_ADDR: &str = "VTX_DEVICE_ADDR";
/// Environment variable overriding the control port
pub const ENV_CONTROL_PORT: &str = "VTX_CONTROL_PORT";
/// Environment variable overriding the stream port
pub const ENV_STREAM_PORT: &str = "VTX_STREAM_PORT";
/// Environment variable overriding the keep-alive interval (milliseconds)
pub const ENV_KEEPALIVE_MS: &str = "VTX_KEEPALIVE_MS";

/// Where and how to reach the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub device_addr: Ipv4Addr,
    pub control_port: u16,
    pub stream_port: u16,
    pub keepalive_interval: Duration,
    pub connect_timeout: Option<Duration>,
    pub local_addr: LocalAddr,
    pub max_payload_size: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device_addr: DEVICE_ADDR,
            control_port: CONTROL_PORT,
            stream_port: STREAM_PORT,
            keepalive_interval: Duration::from_millis(KEEPALIVE_INTERVAL_MS),
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT)),
            local_addr: LocalAddr::Auto,
            max_payload_size: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `VTX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `VTX_*` keys
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = parse(&lookup, ENV_DEVICE_ADDR)? {
            config.device_addr = addr;
        }
        if let Some(port) = parse(&lookup, ENV_CONTROL_PORT)? {
            config.control_port = port;
        }
        if let Some(port) = parse(&lookup, ENV_STREAM_PORT)? {
            config.stream_port = port;
        }
        if let Some(ms) = parse::<u64>(&lookup, ENV_KEEPALIVE_MS)? {
            if ms == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", ENV_KEEPALIVE_MS)));
            }
            config.keepalive_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Set device address
    pub fn with_device_addr(mut self, addr: Ipv4Addr) -> Self {
        self.device_addr = addr;
        self
    }

    /// Set control and stream port numbers
    pub fn with_ports(mut self, control: u16, stream: u16) -> Self {
        self.control_port = control;
        self.stream_port = stream;
        self
    }

    /// Set keep-alive interval
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set connection timeout (`None` waits for the OS)
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set local address policy
    pub fn with_local_addr(mut self, local: LocalAddr) -> Self {
        self.local_addr = local;
        self
    }

    /// Reject replies declaring more payload than this
    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = Some(max);
        self
    }

    /// Port number for a service port
    pub fn port_number(&self, port: Port) -> u16 {
        match port {
            Port::Control => self.control_port,
            Port::Stream => self.stream_port,
        }
    }

    pub fn dial_options(&self) -> DialOptions {
        DialOptions {
            device_addr: self.device_addr,
            local_addr: self.local_addr,
            connect_timeout: self.connect_timeout,
            keepalive_interval: self.keepalive_interval,
            max_payload_size: self.max_payload_size,
        }
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::InvalidConfig(format!("{}={:?}: {}", key, raw, e))),
    }
}
