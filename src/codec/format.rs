//! Record layout constants and field packing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CodecError;
use crate::{AddressFamily, Interval};

/// Path the proxy module loads its block list from.
pub const DEFAULT_ARTIFACT_PATH: &str = "/etc/nginx/redblock_ranges.bin";

/// Compact record size in bytes.
pub const COMPACT_RECORD_SIZE: usize = 12;

/// Wide record size in bytes.
pub const WIDE_RECORD_SIZE: usize = 36;

/// Byte layout of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLayout {
    /// Three u32 fields. IPv4 ranges only: the proxy module does not
    /// look at the family tag.
    #[default]
    Compact,
    /// u128 endpoints and a u32 family tag.
    Wide,
}

impl RecordLayout {
    /// Size of one record.
    pub fn record_size(self) -> usize {
        match self {
            RecordLayout::Compact => COMPACT_RECORD_SIZE,
            RecordLayout::Wide => WIDE_RECORD_SIZE,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordLayout::Compact => "compact",
            RecordLayout::Wide => "wide",
        }
    }

    /// Check whether `interval` can be stored in this layout.
    ///
    /// Compact rejects every IPv6 range, even one with small endpoints such
    /// as `::/96`, which a tag-blind consumer would read as IPv4.
    pub fn can_represent(self, interval: &Interval) -> bool {
        match self {
            RecordLayout::Compact => interval.family() == AddressFamily::V4,
            RecordLayout::Wide => true,
        }
    }

    /// Append the record for `interval` to `out`.
    ///
    /// `index` is only used to identify the record in errors.
    pub(crate) fn pack(
        self,
        index: usize,
        interval: &Interval,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        if !self.can_represent(interval) {
            return Err(CodecError::Unrepresentable {
                index,
                layout: self.as_str(),
            });
        }

        match self {
            RecordLayout::Compact => {
                out.extend_from_slice(&(interval.start() as u32).to_le_bytes());
                out.extend_from_slice(&(interval.end() as u32).to_le_bytes());
            }
            RecordLayout::Wide => {
                out.extend_from_slice(&interval.start().to_le_bytes());
                out.extend_from_slice(&interval.end().to_le_bytes());
            }
        }
        out.extend_from_slice(&interval.family().tag().to_le_bytes());
        Ok(())
    }

    /// Decode one record. `record` must be exactly [`RecordLayout::record_size`] bytes.
    pub(crate) fn unpack(self, index: usize, record: &[u8]) -> Result<Interval, CodecError> {
        debug_assert_eq!(record.len(), self.record_size());

        let (start, end, tag) = match self {
            RecordLayout::Compact => (
                read_u32(&record[0..4]) as u128,
                read_u32(&record[4..8]) as u128,
                read_u32(&record[8..12]),
            ),
            RecordLayout::Wide => (
                read_u128(&record[0..16]),
                read_u128(&record[16..32]),
                read_u32(&record[32..36]),
            ),
        };

        let family =
            AddressFamily::from_tag(tag).ok_or(CodecError::InvalidFamily { index, tag })?;

        if start > end {
            return Err(CodecError::InvalidRecord {
                index,
                reason: "start exceeds end",
            });
        }

        Interval::try_new(family, start, end).ok_or(CodecError::InvalidRecord {
            index,
            reason: "endpoint exceeds family address width",
        })
    }
}

impl fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RecordLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(RecordLayout::Compact),
            "wide" => Ok(RecordLayout::Wide),
            other => Err(format!(
                "unknown record layout '{}' (expected compact or wide)",
                other
            )),
        }
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn read_u128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf.copy_from_slice(bytes);
    u128::from_le_bytes(buf)
}
