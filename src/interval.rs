//! Inclusive numeric address intervals.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::AddressFamily;

/// An inclusive range `[start, end]` of numeric addresses in one family.
///
/// IPv4 values occupy the low 32 bits; `start <= end` always holds and
/// both endpoints fit the family's address width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    family: AddressFamily,
    start: u128,
    end: u128,
}

impl Interval {
    /// Create an interval.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or an endpoint exceeds the family's width.
    /// Use [`Interval::try_new`] for untrusted values.
    pub fn new(family: AddressFamily, start: u128, end: u128) -> Self {
        match Self::try_new(family, start, end) {
            Some(interval) => interval,
            None => panic!("invalid {} interval [{}, {}]", family, start, end),
        }
    }

    /// Create an interval, returning `None` when the invariants do not hold.
    pub fn try_new(family: AddressFamily, start: u128, end: u128) -> Option<Self> {
        if start > end || end > family.max_value() {
            return None;
        }
        Some(Self { family, start, end })
    }

    /// IPv4 interval from numeric endpoints.
    pub fn v4(start: u32, end: u32) -> Self {
        Self::new(AddressFamily::V4, start as u128, end as u128)
    }

    /// IPv6 interval from numeric endpoints.
    pub fn v6(start: u128, end: u128) -> Self {
        Self::new(AddressFamily::V6, start, end)
    }

    /// Single-address interval.
    pub fn host(ip: IpAddr) -> Self {
        let value = ip_to_u128(ip);
        Self {
            family: AddressFamily::of(&ip),
            start: value,
            end: value,
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn start(&self) -> u128 {
        self.start
    }

    pub fn end(&self) -> u128 {
        self.end
    }

    /// Check if `address` lies inside this interval.
    pub fn contains(&self, address: u128) -> bool {
        self.start <= address && address <= self.end
    }

    /// Check if the two intervals overlap or are directly adjacent.
    ///
    /// Intervals of different families never touch.
    pub fn touches(&self, other: &Interval) -> bool {
        if self.family != other.family {
            return false;
        }
        let (lo, hi) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        lo.end.saturating_add(1) >= hi.start
    }

    /// Smallest interval covering both.
    ///
    /// Only meaningful when [`Interval::touches`] holds.
    pub(crate) fn span(&self, other: &Interval) -> Interval {
        debug_assert_eq!(self.family, other.family);
        Interval {
            family: self.family,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// First address as an `IpAddr`.
    pub fn first_addr(&self) -> IpAddr {
        u128_to_ip(self.family, self.start)
    }

    /// Last address as an `IpAddr`.
    pub fn last_addr(&self) -> IpAddr {
        u128_to_ip(self.family, self.end)
    }
}

impl From<Ipv4Net> for Interval {
    fn from(net: Ipv4Net) -> Self {
        Interval::v4(u32::from(net.network()), u32::from(net.broadcast()))
    }
}

impl From<Ipv6Net> for Interval {
    fn from(net: Ipv6Net) -> Self {
        Interval::v6(u128::from(net.network()), u128::from(net.broadcast()))
    }
}

impl From<IpNet> for Interval {
    fn from(net: IpNet) -> Self {
        match net {
            IpNet::V4(v4) => v4.into(),
            IpNet::V6(v6) => v6.into(),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first_addr(), self.last_addr())
    }
}

/// Numeric value of an IP address.
pub fn ip_to_u128(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

fn u128_to_ip(family: AddressFamily, value: u128) -> IpAddr {
    match family {
        AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(value as u32)),
        AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(value)),
    }
}
