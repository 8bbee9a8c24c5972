//! Fixed-width binary record format for interval artifacts.
//!
//! An artifact is a flat sequence of records with no header, footer or
//! separator. Every record has the same size, so the file length is always
//! an exact multiple of the record size.
//!
//! # Record Layouts
//!
//! ```text
//! Compact (12 bytes, compatible with the proxy module)
//! +-----------+-----------+------------+
//! | start u32 |  end u32  | family u32 |
//! +-----------+-----------+------------+
//!
//! Wide (36 bytes, full IPv6 fidelity)
//! +------------+------------+------------+
//! | start u128 |  end u128  | family u32 |
//! +------------+------------+------------+
//! ```
//!
//! All fields are little-endian. The family tag is 4 for IPv4 and 6 for
//! IPv6. The layout is not recorded in the file; producer and consumer
//! agree on it out of band.

mod format;
mod reader;
mod writer;


pub use format::*;
pub use reader::{decode, RecordReader};
pub use writer::{encode, RecordWriter};
