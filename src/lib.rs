//! redblock - compile IP block lists into a sorted binary range artifact.
//!
//! This crate turns an unordered, possibly overlapping collection of IPv4
//! and IPv6 networks into a flat array of merged ranges that a reverse
//! proxy or firewall module can load and binary search.
//!
//! # Features
//!
//! - **Range parsing**: CIDR and bare addresses, host bits normalized
//! - **Merge on insert**: overlapping, adjacent and duplicate ranges coalesce
//! - **O(log n) lookups**: per-family sorted arrays searched by bisection
//! - **Fixed-width records**: a 12-byte layout compatible with the existing
//!   proxy module, and a 36-byte layout with full IPv6 endpoints
//! - **Hot reload**: swap in a regenerated artifact without blocking readers
//!
//! # Quick Start
//!
//! ```
//! use redblock::{codec, parse, BlockList, IntervalSet, RecordLayout};
//!
//! let mut set = IntervalSet::new();
//! for token in ["192.168.0.0/24", "192.168.1.0/24", "10.0.0.1"] {
//!     set.insert(parse(token).unwrap());
//! }
//!
//! let artifact = codec::encode(&set.to_sorted_list(), RecordLayout::Compact).unwrap();
//! assert_eq!(artifact.len(), 2 * 12);
//!
//! let block_list = BlockList::from_bytes(&artifact, RecordLayout::Compact).unwrap();
//! assert!(block_list.contains("192.168.1.77".parse().unwrap()));
//! assert!(!block_list.contains("192.168.2.1".parse().unwrap()));
//! ```
//!
//! # Data Flow
//!
//! 1. Tokens → [`parse`] → [`Interval`]
//! 2. Intervals → [`IntervalSet::insert`] (merging)
//! 3. [`IntervalSet::to_sorted_list`] → [`codec::encode`] → artifact
//! 4. Artifact → [`codec::decode`] → [`BlockList`] → `contains(ip)`

mod error;
mod family;
mod interval;
mod parser;
mod set;

pub mod blocklist;
pub mod codec;
pub mod config;
pub mod ingest;
pub mod metadata;

// Re-export core types
pub use error::{CodecError, Error, ParseError, Result};
pub use family::{AddressFamily, FamilyFilter};
pub use interval::{ip_to_u128, Interval};
pub use parser::parse;
pub use set::IntervalSet;

// Re-export the codec and consumer types
pub use blocklist::{BlockList, SharedBlockList};
pub use codec::{RecordLayout, RecordReader, RecordWriter};

// Re-export ingestion and configuration
pub use config::BuildConfig;
pub use ingest::{IngestReport, Ingestor};
pub use metadata::ArtifactMetadata;
