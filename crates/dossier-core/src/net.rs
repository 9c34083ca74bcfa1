//! Fixed-width network-byte-order encodings used for range comparisons.
//!
//! IPv4 addresses encode to 4 bytes and IPv6 addresses to 16, so within one
//! address family a plain byte comparison orders addresses numerically
//! (`10.0.0.9 < 10.0.0.10`), which string comparison does not.

use std::net::IpAddr;

use ipnet::IpNet;

/// Network-order bytes of an address.
pub fn hton(ip: &IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// IP version number (4 or 6).
pub fn ip_version(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 6,
    }
}

/// Numeric value of an address.
pub fn ip_to_u128(ip: &IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// First and last address of a network.
pub fn net_bounds(net: &IpNet) -> (IpAddr, IpAddr) {
    (net.network(), net.broadcast())
}

/// Parse a colon-separated six-octet MAC address into its big-endian value.
pub fn mac_to_u64(mac: &str) -> Option<u64> {
    let mut value: u64 = 0;
    let mut count = 0;
    for octet in mac.split(':') {
        if octet.len() != 2 {
            return None;
        }
        let byte = u8::from_str_radix(octet, 16).ok()?;
        value = (value << 8) | byte as u64;
        count += 1;
    }
    (count == 6).then_some(value)
}

/// `host:port` with IPv6 hosts bracketed.
pub fn socket_string(address: &str, port: u16) -> String {
    if address.contains(':') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}
