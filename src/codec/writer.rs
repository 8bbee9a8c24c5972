//! Artifact writer.

use std::io::Write;
use std::path::Path;

use super::format::RecordLayout;
use crate::error::CodecError;
use crate::Interval;

/// Encode intervals into records, in the order given.
///
/// The list is transcribed as-is; pass [`crate::IntervalSet::to_sorted_list`]
/// to get an artifact consumers can binary search.
pub fn encode(list: &[Interval], layout: RecordLayout) -> Result<Vec<u8>, CodecError> {
    RecordWriter::new(layout).write(list)
}

/// Binary artifact writer.
pub struct RecordWriter {
    layout: RecordLayout,
    buffer: Vec<u8>,
}

impl RecordWriter {
    /// Create a new writer for `layout`.
    pub fn new(layout: RecordLayout) -> Self {
        Self {
            layout,
            buffer: Vec::new(),
        }
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Encode `list` into a fresh byte buffer.
    ///
    /// Fails without output if any interval does not fit the layout.
    pub fn write(&mut self, list: &[Interval]) -> Result<Vec<u8>, CodecError> {
        self.buffer.clear();
        self.buffer.reserve(list.len() * self.layout.record_size());

        for (index, interval) in list.iter().enumerate() {
            self.layout.pack(index, interval, &mut self.buffer)?;
        }

        Ok(std::mem::take(&mut self.buffer))
    }

    /// Encode `list` and write it to `writer`.
    ///
    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&mut self, list: &[Interval], mut writer: W) -> Result<usize, CodecError> {
        let data = self.write(list)?;
        writer.write_all(&data)?;
        writer.flush()?;
        Ok(data.len())
    }

    /// Encode `list` and atomically replace the file at `path`.
    ///
    /// Records go to a temporary file in the same directory which is then
    /// renamed over `path`, so a reader never sees a partial artifact.
    /// Returns the bytes written.
    pub fn write_file(&mut self, list: &[Interval], path: &Path) -> Result<Vec<u8>, CodecError> {
        let data = self.write(list)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        temp_file.write_all(&data)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| e.error)?;

        log::debug!(
            "Wrote {} {} records ({} bytes) to {:?}",
            list.len(),
            self.layout,
            data.len(),
            path
        );

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_empty_list() {
        let mut writer = RecordWriter::new(RecordLayout::Compact);
        let data = writer.write(&[]).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_write_preserves_order() {
        let list = [Interval::v4(50, 60), Interval::v4(10, 20)];
        let data = encode(&list, RecordLayout::Compact).unwrap();
        assert_eq!(data.len(), 24);
        assert_eq!(&data[0..4], &50u32.to_le_bytes());
        assert_eq!(&data[12..16], &10u32.to_le_bytes());
    }

    #[test]
    fn test_write_rejects_wide_values_in_compact() {
        let list = [Interval::v4(1, 2), Interval::v6(0, 1 << 40)];
        let err = encode(&list, RecordLayout::Compact).unwrap_err();
        assert!(matches!(err, CodecError::Unrepresentable { index: 1, .. }));
    }

    #[test]
    fn test_write_file_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranges.bin");
        std::fs::write(&path, b"stale").unwrap();

        let mut writer = RecordWriter::new(RecordLayout::Wide);
        let written = writer.write_file(&[Interval::v6(1, 2)], &path).unwrap();

        assert_eq!(written.len(), 36);
        assert_eq!(std::fs::read(&path).unwrap().len(), 36);
    }
}
