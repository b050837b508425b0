//! Local source address selection
//!
//! Best-effort: a host joined to the drone's access point usually has one
//! address on the device's /24. When several qualify the one with the
//! smallest last octet wins, and when none do the OS picks.

use std::net::{IpAddr, Ipv4Addr};

use tracing::{debug, warn};

/// Local address policy for new connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalAddr {
    /// Scan interfaces for an address on the device's subnet
    #[default]
    Auto,

    /// Always bind this address
    Fixed(Ipv4Addr),
}

impl LocalAddr {
    /// Address to bind when dialing `device`
    pub fn resolve(self, device: Ipv4Addr) -> Ipv4Addr {
        match self {
            Self::Auto => select_local_ip(device),
            Self::Fixed(ip) => ip,
        }
    }
}

/// Pick a local IPv4 address on the device's subnet from the system's interfaces
pub fn select_local_ip(device: Ipv4Addr) -> Ipv4Addr {
    let candidates = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .filter_map(|iface| match iface.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .collect::<Vec<_>>(),
        Err(e) => {
            warn!("Can't list network interfaces: {}", e);
            Vec::new()
        }
    };

    let ip = pick_local_ip(device, candidates);
    debug!(%device, local = %ip, "Selected local address");
    ip
}

/// Among `candidates`, the address on the device's /24 with the smallest
/// last octet, or `0.0.0.0` if there is none
pub fn pick_local_ip(device: Ipv4Addr, candidates: impl IntoIterator<Item = Ipv4Addr>) -> Ipv4Addr {
    candidates
        .into_iter()
        .filter(|ip| same_subnet(*ip, device))
        .min_by_key(|ip| ip.octets()[3])
        .unwrap_or(Ipv4Addr::UNSPECIFIED)
}

fn same_subnet(ip: Ipv4Addr, device: Ipv4Addr) -> bool {
    ip.octets()[..3] == device.octets()[..3]
}
