//! Address family tags and ingestion filters.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// AddressFamily identifies which address space an interval lives in.
///
/// The numeric tag is what the artifact stores in each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum AddressFamily {
    /// 32-bit IPv4 address space
    #[serde(rename = "ipv4")]
    V4 = 4,
    /// 128-bit IPv6 address space
    #[serde(rename = "ipv6")]
    V6 = 6,
}

impl AddressFamily {
    /// Convert from a record family tag.
    ///
    /// Returns `None` for anything but 4 or 6.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            4 => Some(AddressFamily::V4),
            6 => Some(AddressFamily::V6),
            _ => None,
        }
    }

    /// Record family tag.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Family of an IP address.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Largest numeric address in this family.
    pub fn max_value(self) -> u128 {
        match self {
            AddressFamily::V4 => u32::MAX as u128,
            AddressFamily::V6 => u128::MAX,
        }
    }

    /// Matching filter flag.
    pub fn filter(self) -> FamilyFilter {
        match self {
            AddressFamily::V4 => FamilyFilter::V4,
            AddressFamily::V6 => FamilyFilter::V6,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "ipv4",
            AddressFamily::V6 => "ipv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AddressFamily {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ipv4" | "v4" | "4" => Ok(AddressFamily::V4),
            "ipv6" | "v6" | "6" => Ok(AddressFamily::V6),
            _ => Err(()),
        }
    }
}

bitflags! {
    /// Families accepted during ingestion.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FamilyFilter: u8 {
        /// Accept IPv4 ranges.
        const V4 = 0b01;
        /// Accept IPv6 ranges.
        const V6 = 0b10;
    }
}

impl FamilyFilter {
    /// Build a filter from a list of families.
    pub fn from_families(families: &[AddressFamily]) -> Self {
        families
            .iter()
            .fold(FamilyFilter::empty(), |acc, family| acc | family.filter())
    }

    /// Check whether ranges of `family` pass this filter.
    pub fn accepts(self, family: AddressFamily) -> bool {
        self.contains(family.filter())
    }
}

impl Default for FamilyFilter {
    fn default() -> Self {
        FamilyFilter::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_tags() {
        assert_eq!(AddressFamily::from_tag(4), Some(AddressFamily::V4));
        assert_eq!(AddressFamily::from_tag(6), Some(AddressFamily::V6));
        assert_eq!(AddressFamily::from_tag(0), None);
        assert_eq!(AddressFamily::from_tag(5), None);
        assert_eq!(AddressFamily::V4.tag(), 4);
        assert_eq!(AddressFamily::V6.tag(), 6);
    }

    #[test]
    fn test_family_from_str() {
        assert_eq!("ipv4".parse(), Ok(AddressFamily::V4));
        assert_eq!("IPv6".parse(), Ok(AddressFamily::V6));
        assert_eq!("6".parse(), Ok(AddressFamily::V6));
        assert_eq!("ipx".parse::<AddressFamily>(), Err(()));
    }

    #[test]
    fn test_family_display() {
        assert_eq!(AddressFamily::V4.to_string(), "ipv4");
        assert_eq!(AddressFamily::V6.to_string(), "ipv6");
    }

    #[test]
    fn test_filter() {
        let only_v4 = FamilyFilter::from_families(&[AddressFamily::V4]);
        assert!(only_v4.accepts(AddressFamily::V4));
        assert!(!only_v4.accepts(AddressFamily::V6));

        let both = FamilyFilter::from_families(&[AddressFamily::V6, AddressFamily::V4]);
        assert_eq!(both, FamilyFilter::all());

        assert!(FamilyFilter::from_families(&[]).is_empty());
    }
}
