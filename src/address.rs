use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Deserialize;

/// Which address family a source answers with, or which one a caller asks for.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    #[default]
    Any,
    V4,
    V6,
}

impl Family {
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            Family::Any => true,
            Family::V4 => ip.is_ipv4(),
            Family::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Any => write!(f, "IPv4/IPv6"),
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

/// Trims the text a source replied with and checks that it is an address of
/// the expected family.
///
/// The address is returned the way the source wrote it, so
/// `2345:0425:2ca1:0000:0000:0567:5673:23b5` is not shortened. A zone suffix
/// such as `fe80::1%eth0` is allowed on IPv6 addresses and kept.
pub fn validate(text: &str, family: Family) -> Result<String, String> {
    let candidate = text.trim();
    if candidate.is_empty() {
        return Err("the reply was empty".to_string());
    }
    let ip = parse(candidate).ok_or_else(|| format!("'{}' is not an IP address", candidate))?;
    if !family.matches(&ip) {
        return Err(format!("'{}' is not an {} address", candidate, family));
    }
    Ok(candidate.to_string())
}

fn parse(candidate: &str) -> Option<IpAddr> {
    if let Ok(ipv4) = candidate.parse::<Ipv4Addr>() {
        return Some(IpAddr::V4(ipv4));
    }
    let without_zone = match candidate.split_once('%') {
        Some((address, zone)) if !zone.is_empty() => address,
        Some(_) => return None,
        None => candidate,
    };
    without_zone.parse::<Ipv6Addr>().ok().map(IpAddr::V6)
}
