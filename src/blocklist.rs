//! Consumer-side block list with hot reload support.
//!
//! A [`BlockList`] is what a proxy or firewall keeps in memory: the
//! decoded artifact, brought back to canonical form, answering
//! `contains(ip)` by binary search. [`SharedBlockList`] wraps one in an
//! `ArcSwap` so a fresh artifact can replace it while readers keep
//! querying.

use arc_swap::ArcSwap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::codec::{RecordLayout, RecordReader};
use crate::{Interval, IntervalSet, Result};

/// In-memory block list loaded from an artifact.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    set: IntervalSet,
    rebuilt: bool,
}

impl BlockList {
    /// Build from decoded records.
    ///
    /// Records already in canonical order are adopted directly. Anything
    /// else (unsorted, overlapping, duplicated) is re-merged record by
    /// record, since binary search on a non-canonical list gives wrong
    /// answers.
    pub fn from_intervals(list: &[Interval]) -> Self {
        match IntervalSet::from_sorted(list) {
            Some(set) => Self {
                set,
                rebuilt: false,
            },
            None => {
                let set: IntervalSet = list.iter().copied().collect();
                log::warn!(
                    "Artifact records are not sorted and merged, rebuilt {} records into {} intervals",
                    list.len(),
                    set.len()
                );
                Self { set, rebuilt: true }
            }
        }
    }

    /// Load an artifact file.
    pub fn open(path: &Path, layout: RecordLayout) -> Result<Self> {
        let reader = RecordReader::open(path, layout)?;
        let list = reader.decode()?;
        let block_list = Self::from_intervals(&list);
        log::info!(
            "Loaded {} intervals ({} IPv4, {} IPv6) from {:?}",
            block_list.len(),
            block_list.set.v4_count(),
            block_list.set.v6_count(),
            path
        );
        Ok(block_list)
    }

    /// Load artifact bytes.
    pub fn from_bytes(data: &[u8], layout: RecordLayout) -> Result<Self> {
        let list = crate::codec::decode(data, layout)?;
        Ok(Self::from_intervals(&list))
    }

    /// Check if `ip` is blocked.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.set.contains_ip(ip)
    }

    /// The range blocking `ip`, if any.
    pub fn matching_interval(&self, ip: IpAddr) -> Option<&Interval> {
        self.set.find_ip(ip)
    }

    /// Whether loading had to re-merge the records.
    pub fn was_rebuilt(&self) -> bool {
        self.rebuilt
    }

    pub fn intervals(&self) -> &IntervalSet {
        &self.set
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl From<IntervalSet> for BlockList {
    fn from(set: IntervalSet) -> Self {
        Self {
            set,
            rebuilt: false,
        }
    }
}

/// Block list shared between threads, replaceable without blocking readers.
///
/// # Example
///
/// ```ignore
/// use redblock::{RecordLayout, SharedBlockList};
/// use std::path::Path;
///
/// let list = SharedBlockList::open(Path::new("/etc/nginx/redblock_ranges.bin"), RecordLayout::Compact)?;
/// if list.contains("203.0.113.7".parse()?) {
///     // deny
/// }
///
/// // Pick up a regenerated artifact
/// list.reload(Path::new("/etc/nginx/redblock_ranges.bin"))?;
/// ```
pub struct SharedBlockList {
    inner: ArcSwap<BlockList>,
    layout: RecordLayout,
    /// Incremented on every successful reload.
    generation: AtomicU64,
}

impl SharedBlockList {
    /// Wrap an already loaded block list.
    pub fn new(block_list: BlockList, layout: RecordLayout) -> Self {
        Self {
            inner: ArcSwap::from_pointee(block_list),
            layout,
            generation: AtomicU64::new(0),
        }
    }

    /// Load an artifact file.
    pub fn open(path: &Path, layout: RecordLayout) -> Result<Self> {
        Ok(Self::new(BlockList::open(path, layout)?, layout))
    }

    /// Replace the block list with the artifact at `path`.
    ///
    /// On error the current list stays in service. In-flight queries finish
    /// against the list they started with.
    pub fn reload(&self, path: &Path) -> Result<()> {
        let block_list = BlockList::open(path, self.layout)?;
        self.store(block_list);
        log::info!("Hot reloaded block list from {:?}", path);
        Ok(())
    }

    /// Replace the block list with artifact bytes.
    pub fn reload_from_bytes(&self, data: &[u8]) -> Result<()> {
        let block_list = BlockList::from_bytes(data, self.layout)?;
        self.store(block_list);
        log::info!("Hot reloaded block list from bytes");
        Ok(())
    }

    fn store(&self, block_list: BlockList) {
        self.inner.store(Arc::new(block_list));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Check if `ip` is blocked by the current list.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.inner.load().contains(ip)
    }

    /// Snapshot of the current list.
    pub fn current(&self) -> Arc<BlockList> {
        self.inner.load_full()
    }

    /// Number of successful reloads.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
