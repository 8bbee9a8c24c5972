//! Artifact reader with memory-mapping support.

use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::format::RecordLayout;
use crate::error::CodecError;
use crate::Interval;

/// Decode every record of `data`.
///
/// Fails on the first bad record, or with [`CodecError::Truncated`] when
/// `data` is not a whole number of records. Records are returned in file
/// order; nothing here assumes they are sorted.
pub fn decode(data: &[u8], layout: RecordLayout) -> Result<Vec<Interval>, CodecError> {
    check_length(data.len(), layout)?;
    data.chunks_exact(layout.record_size())
        .enumerate()
        .map(|(index, record)| layout.unpack(index, record))
        .collect()
}

fn check_length(len: usize, layout: RecordLayout) -> Result<(), CodecError> {
    let record_size = layout.record_size();
    if len % record_size != 0 {
        return Err(CodecError::Truncated { len, record_size });
    }
    Ok(())
}

enum Source {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mapped(mmap) => &mmap[..],
            Source::Owned(data) => &data[..],
        }
    }
}

/// Binary artifact reader.
///
/// The length check happens up front, so a reader that was constructed
/// successfully always holds a whole number of records.
pub struct RecordReader {
    source: Source,
    layout: RecordLayout,
}

impl RecordReader {
    /// Open an artifact file by memory-mapping it.
    pub fn open(path: &Path, layout: RecordLayout) -> Result<Self, CodecError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        check_length(len, layout)?;

        // Empty files cannot be mapped on every platform.
        let source = if len == 0 {
            Source::Owned(Vec::new())
        } else {
            // The artifact is replaced by rename, never rewritten in place.
            Source::Mapped(unsafe { Mmap::map(&file)? })
        };

        Ok(Self { source, layout })
    }

    /// Wrap artifact bytes already in memory.
    pub fn from_bytes(data: Vec<u8>, layout: RecordLayout) -> Result<Self, CodecError> {
        check_length(data.len(), layout)?;
        Ok(Self {
            source: Source::Owned(data),
            layout,
        })
    }

    /// Read an artifact from a stream until end-of-stream.
    pub fn from_reader<R: Read>(mut reader: R, layout: RecordLayout) -> Result<Self, CodecError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data, layout)
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Raw artifact bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.source.bytes()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.as_bytes().len() / self.layout.record_size()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Decode record `index`.
    pub fn get(&self, index: usize) -> Option<Result<Interval, CodecError>> {
        let size = self.layout.record_size();
        let offset = index.checked_mul(size)?;
        let record = self.as_bytes().get(offset..offset.checked_add(size)?)?;
        Some(self.layout.unpack(index, record))
    }

    /// Iterate over decoded records in file order.
    pub fn records(&self) -> impl Iterator<Item = Result<Interval, CodecError>> + '_ {
        self.as_bytes()
            .chunks_exact(self.layout.record_size())
            .enumerate()
            .map(move |(index, record)| self.layout.unpack(index, record))
    }

    /// Decode all records, failing on the first bad one.
    pub fn decode(&self) -> Result<Vec<Interval>, CodecError> {
        self.records().collect()
    }
}
