//! Ordered, coalesced interval collection.

use std::net::IpAddr;

use crate::{AddressFamily, Interval};

/// IntervalSet holds merged address ranges, one sorted list per family.
///
/// Every list is ascending by start, and consecutive entries are separated
/// by at least one uncovered address: overlapping or adjacent ranges are
/// coalesced on insertion. Lookups are binary searches.
///
/// # Examples
/// ```
/// use redblock::{AddressFamily, Interval, IntervalSet};
///
/// let mut set = IntervalSet::new();
/// set.insert(Interval::v4(10, 20));
/// set.insert(Interval::v4(21, 30));
///
/// assert_eq!(set.to_sorted_list(), vec![Interval::v4(10, 30)]);
/// assert!(set.contains(AddressFamily::V4, 25));
/// assert!(!set.contains(AddressFamily::V6, 25));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    /// IPv4 intervals (sorted by start, coalesced)
    v4: Vec<Interval>,
    /// IPv6 intervals (sorted by start, coalesced)
    v6: Vec<Interval>,
}

impl IntervalSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an already sorted and coalesced list without re-merging.
    ///
    /// Families may be interleaved in `list`; each family's subsequence
    /// must satisfy the set invariant. Returns `None` otherwise.
    pub fn from_sorted(list: &[Interval]) -> Option<Self> {
        if !Self::is_canonical(list) {
            return None;
        }
        let mut set = Self::new();
        for interval in list {
            set.list_mut(interval.family()).push(*interval);
        }
        Some(set)
    }

    /// Check whether `list` is sorted and coalesced within each family.
    pub fn is_canonical(list: &[Interval]) -> bool {
        let mut last_v4: Option<&Interval> = None;
        let mut last_v6: Option<&Interval> = None;

        for interval in list {
            let last = match interval.family() {
                AddressFamily::V4 => &mut last_v4,
                AddressFamily::V6 => &mut last_v6,
            };
            if let Some(prev) = last {
                // Ascending, with at least one uncovered address between
                if prev.start() > interval.start() || prev.touches(interval) {
                    return false;
                }
            }
            *last = Some(interval);
        }
        true
    }

    /// Insert an interval, merging it with every overlapping or adjacent neighbour.
    ///
    /// Returns `true` if the set now covers addresses it did not cover before.
    pub fn insert(&mut self, interval: Interval) -> bool {
        let list = self.list_mut(interval.family());

        // First entry that reaches interval.start (end + 1 >= start).
        let lo = list.partition_point(|existing| existing.end().saturating_add(1) < interval.start());
        // First entry that starts past interval.end + 1.
        let hi = list.partition_point(|existing| existing.start() <= interval.end().saturating_add(1));

        if lo >= hi {
            list.insert(lo, interval);
            return true;
        }

        if hi - lo == 1 {
            let existing = &list[lo];
            if existing.contains(interval.start()) && existing.contains(interval.end()) {
                return false;
            }
        }

        let merged = interval.span(&list[lo]).span(&list[hi - 1]);
        list.splice(lo..hi, std::iter::once(merged));
        true
    }

    /// Absorb every interval of `other`.
    pub fn merge(&mut self, other: IntervalSet) {
        if self.is_empty() {
            *self = other;
            return;
        }
        for interval in other.v4.into_iter().chain(other.v6) {
            self.insert(interval);
        }
    }

    /// Check if `address` of `family` falls inside any interval.
    pub fn contains(&self, family: AddressFamily, address: u128) -> bool {
        self.find(family, address).is_some()
    }

    /// Check if an IP address falls inside any interval.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) match both the IPv4
    /// ranges and IPv6 ranges listed inside `::ffff:0:0/96`.
    pub fn contains_ip(&self, ip: IpAddr) -> bool {
        self.find_ip(ip).is_some()
    }

    /// Find the interval covering `address`, if any.
    pub fn find(&self, family: AddressFamily, address: u128) -> Option<&Interval> {
        let list = self.list(family);
        let idx = list.partition_point(|interval| interval.end() < address);
        list.get(idx).filter(|interval| interval.contains(address))
    }

    /// Find the interval covering an IP address.
    ///
    /// An IPv4-mapped address is looked up as IPv4 first, then as its raw
    /// IPv6 value.
    pub fn find_ip(&self, ip: IpAddr) -> Option<&Interval> {
        match ip {
            IpAddr::V4(v4) => self.find(AddressFamily::V4, u32::from(v4) as u128),
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .and_then(|v4| self.find(AddressFamily::V4, u32::from(v4) as u128))
                .or_else(|| self.find(AddressFamily::V6, u128::from(v6))),
        }
    }

    /// Intervals of one family, ascending.
    pub fn intervals(&self, family: AddressFamily) -> &[Interval] {
        self.list(family)
    }

    /// All intervals: IPv4 first, then IPv6, each ascending.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.v4.iter().chain(self.v6.iter())
    }

    /// Owned copy of [`IntervalSet::iter`], ready for encoding.
    pub fn to_sorted_list(&self) -> Vec<Interval> {
        self.iter().copied().collect()
    }

    /// Number of IPv4 intervals.
    pub fn v4_count(&self) -> usize {
        self.v4.len()
    }

    /// Number of IPv6 intervals.
    pub fn v6_count(&self) -> usize {
        self.v6.len()
    }

    /// Total number of intervals.
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    fn list(&self, family: AddressFamily) -> &Vec<Interval> {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }

    fn list_mut(&mut self, family: AddressFamily) -> &mut Vec<Interval> {
        match family {
            AddressFamily::V4 => &mut self.v4,
            AddressFamily::V6 => &mut self.v6,
        }
    }
}

impl Extend<Interval> for IntervalSet {
    fn extend<I: IntoIterator<Item = Interval>>(&mut self, iter: I) {
        for interval in iter {
            self.insert(interval);
        }
    }
}

impl FromIterator<Interval> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        let mut set = IntervalSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4_set(intervals: &[(u32, u32)]) -> IntervalSet {
        intervals.iter().map(|&(s, e)| Interval::v4(s, e)).collect()
    }

    #[test]
    fn test_adjacent_intervals_coalesce() {
        let set = v4_set(&[(10, 20), (21, 30)]);
        assert_eq!(set.to_sorted_list(), vec![Interval::v4(10, 30)]);
    }

    #[test]
    fn test_gap_preserved() {
        let set = v4_set(&[(10, 20), (25, 30)]);
        assert_eq!(
            set.to_sorted_list(),
            vec![Interval::v4(10, 20), Interval::v4(25, 30)]
        );
    }

    #[test]
    fn test_contained_interval_absorbed() {
        let mut set = v4_set(&[(10, 30)]);
        assert!(!set.insert(Interval::v4(20, 25)));
        assert_eq!(set.to_sorted_list(), vec![Interval::v4(10, 30)]);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let once = v4_set(&[(10, 20)]);
        let mut twice = once.clone();
        assert!(!twice.insert(Interval::v4(10, 20)));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_insert_bridges_many_neighbours() {
        let mut set = v4_set(&[(0, 1), (5, 6), (10, 11), (20, 21), (40, 41)]);
        assert!(set.insert(Interval::v4(2, 19)));
        assert_eq!(
            set.to_sorted_list(),
            vec![Interval::v4(0, 21), Interval::v4(40, 41)]
        );
    }

    #[test]
    fn test_insert_extends_left_and_right() {
        let mut set = v4_set(&[(10, 20)]);
        set.insert(Interval::v4(5, 12));
        set.insert(Interval::v4(18, 22));
        assert_eq!(set.to_sorted_list(), vec![Interval::v4(5, 22)]);
    }

    #[test]
    fn test_insert_at_address_space_edges() {
        let mut set = IntervalSet::new();
        set.insert(Interval::v4(u32::MAX - 1, u32::MAX));
        set.insert(Interval::v4(0, 0));
        set.insert(Interval::v6(u128::MAX, u128::MAX));
        set.insert(Interval::v6(0, u128::MAX - 1));
        assert_eq!(
            set.to_sorted_list(),
            vec![
                Interval::v4(0, 0),
                Interval::v4(u32::MAX - 1, u32::MAX),
                Interval::v6(0, u128::MAX),
            ]
        );
    }

    #[test]
    fn test_contains() {
        let set = v4_set(&[(10, 20)]);
        assert!(set.contains(AddressFamily::V4, 15));
        assert!(set.contains(AddressFamily::V4, 10));
        assert!(set.contains(AddressFamily::V4, 20));
        assert!(!set.contains(AddressFamily::V4, 21));
        assert!(!set.contains(AddressFamily::V4, 9));
    }

    #[test]
    fn test_contains_on_empty_set() {
        let set = IntervalSet::new();
        assert!(!set.contains(AddressFamily::V4, 0));
        assert!(!set.contains(AddressFamily::V6, u128::MAX));
        assert!(set.is_empty());
    }

    #[test]
    fn test_family_isolation() {
        let mut set = IntervalSet::new();
        set.insert(Interval::v4(10, 20));
        assert!(!set.contains(AddressFamily::V6, 15));

        set.insert(Interval::v6(100, 200));
        assert!(!set.contains(AddressFamily::V4, 150));
        assert!(set.contains(AddressFamily::V4, 15));
        assert_eq!(set.v4_count(), 1);
        assert_eq!(set.v6_count(), 1);

        // A v6 interval adjacent to a v4 one stays separate
        set.insert(Interval::v6(21, 30));
        assert_eq!(set.intervals(AddressFamily::V4), &[Interval::v4(10, 20)]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_contains_ip_unwraps_ipv4_mapped() {
        let set: IntervalSet = [Interval::v4(0xC0A8_0000, 0xC0A8_FFFF)].into_iter().collect();
        assert!(set.contains_ip("192.168.1.1".parse().unwrap()));
        assert!(set.contains_ip("::ffff:192.168.1.1".parse().unwrap()));
        assert!(!set.contains_ip("::ffff:10.0.0.1".parse().unwrap()));
        assert!(!set.contains_ip("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_mapped_ipv6_range_matches_mapped_address() {
        let set: IntervalSet = [crate::parse("::ffff:1.2.3.0/120").unwrap()]
            .into_iter()
            .collect();
        let inside: IpAddr = "::ffff:1.2.3.4".parse().unwrap();

        assert_eq!(set.v6_count(), 1);
        assert!(set.contains_ip(inside));
        assert_eq!(set.find_ip(inside), set.intervals(AddressFamily::V6).first());
        assert!(!set.contains_ip("::ffff:1.2.4.0".parse().unwrap()));
        // The IPv6 range does not extend to plain IPv4 clients
        assert!(!set.contains_ip("1.2.3.4".parse().unwrap()));
    }

    #[test]
    fn test_find() {
        let set = v4_set(&[(10, 20), (30, 40)]);
        assert_eq!(set.find(AddressFamily::V4, 35), Some(&Interval::v4(30, 40)));
        assert_eq!(set.find(AddressFamily::V4, 25), None);
    }

    #[test]
    fn test_merge_sets() {
        let mut left = v4_set(&[(10, 20)]);
        let mut right = v4_set(&[(21, 25), (50, 60)]);
        right.insert(Interval::v6(1, 2));
        left.merge(right);
        assert_eq!(
            left.to_sorted_list(),
            vec![Interval::v4(10, 25), Interval::v4(50, 60), Interval::v6(1, 2)]
        );

        let mut empty = IntervalSet::new();
        empty.merge(left.clone());
        assert_eq!(empty, left);
    }

    #[test]
    fn test_from_sorted() {
        let list = vec![Interval::v4(1, 2), Interval::v6(1, 2), Interval::v4(5, 6)];
        let set = IntervalSet::from_sorted(&list).unwrap();
        assert_eq!(set.v4_count(), 2);
        assert_eq!(set.v6_count(), 1);

        // Adjacent entries are not canonical
        assert!(IntervalSet::from_sorted(&[Interval::v4(1, 2), Interval::v4(3, 4)]).is_none());
        // Unsorted
        assert!(IntervalSet::from_sorted(&[Interval::v4(5, 6), Interval::v4(1, 2)]).is_none());
        // Duplicates
        assert!(IntervalSet::from_sorted(&[Interval::v4(1, 2), Interval::v4(1, 2)]).is_none());
    }

    /// Deterministic xorshift so the randomized check needs no extra crates.
    fn next(state: &mut u64) -> u64 {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        *state
    }

    #[test]
    fn test_random_inserts_match_bitmap() {
        const SPACE: u32 = 512;
        let mut state = 0x9E37_79B9_7F4A_7C15;

        for _ in 0..50 {
            let mut set = IntervalSet::new();
            let mut covered = vec![false; SPACE as usize];

            for _ in 0..40 {
                let start = (next(&mut state) % SPACE as u64) as u32;
                let len = (next(&mut state) % 24) as u32;
                let end = (start + len).min(SPACE - 1);
                set.insert(Interval::v4(start, end));
                for addr in start..=end {
                    covered[addr as usize] = true;
                }

                let list = set.to_sorted_list();
                assert!(IntervalSet::is_canonical(&list));
                for window in list.windows(2) {
                    assert!(window[0].end() + 1 < window[1].start());
                }
            }

            for addr in 0..SPACE {
                assert_eq!(
                    set.contains(AddressFamily::V4, addr as u128),
                    covered[addr as usize],
                    "address {}",
                    addr
                );
            }
        }
    }
}
