//! Range token parsing.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::ParseError;
use crate::Interval;

/// Parse one range token into its canonical interval.
///
/// Accepts CIDR notation and bare addresses (treated as a /32 or /128
/// host route). IPv4 is tried before IPv6. Host bits below the prefix are
/// allowed and cleared, so `10.1.2.3/8` covers `10.0.0.0-10.255.255.255`.
///
/// # Examples
/// ```
/// use redblock::parse;
///
/// let interval = parse("192.168.0.0/24").unwrap();
/// assert_eq!(interval.to_string(), "192.168.0.0-192.168.0.255");
/// assert!(parse("not-an-ip").is_err());
/// ```
pub fn parse(token: &str) -> Result<Interval, ParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(net) = token.parse::<Ipv4Net>() {
        return Ok(net.into());
    }
    if let Ok(addr) = token.parse::<Ipv4Addr>() {
        return Ok(Interval::host(IpAddr::V4(addr)));
    }

    if let Ok(net) = token.parse::<Ipv6Net>() {
        return Ok(net.into());
    }
    if let Ok(addr) = token.parse::<Ipv6Addr>() {
        return Ok(Interval::host(IpAddr::V6(addr)));
    }

    Err(ParseError::Malformed(token.to_string()))
}
