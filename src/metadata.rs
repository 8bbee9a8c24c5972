//! Metadata sidecar describing a generated artifact.
//!
//! The record format carries no header, so counts, layout and a checksum
//! are kept next to the artifact in `<artifact>.meta` as JSON.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

use crate::codec::RecordLayout;
use crate::error::{Error, Result};
use crate::{AddressFamily, Interval};

/// Description of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(with = "system_time_serde")]
    pub generated_at: Option<SystemTime>,
    pub layout: RecordLayout,
    pub record_count: usize,
    pub v4_count: usize,
    pub v6_count: usize,
    /// Lowercase hex SHA-256 of the artifact bytes
    pub sha256: String,
}

mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        time.map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)))
    }
}

impl ArtifactMetadata {
    /// Describe freshly encoded artifact bytes.
    pub fn describe(data: &[u8], list: &[Interval], layout: RecordLayout) -> Self {
        let v4_count = list
            .iter()
            .filter(|i| i.family() == AddressFamily::V4)
            .count();
        Self {
            generated_at: Some(SystemTime::now()),
            layout,
            record_count: list.len(),
            v4_count,
            v6_count: list.len() - v4_count,
            sha256: sha256_hex(data),
        }
    }

    /// Sidecar path for an artifact.
    pub fn path_for(artifact: &Path) -> PathBuf {
        let mut name = artifact.as_os_str().to_os_string();
        name.push(".meta");
        PathBuf::from(name)
    }

    /// Load metadata from a file.
    ///
    /// Returns `None` if the file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Save metadata to a file.
    ///
    /// The file is replaced by rename, so a reader sees either the old or
    /// the new sidecar, never a partial one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Check artifact bytes against the recorded checksum and size.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = sha256_hex(data);
        if actual != self.sha256 {
            return Err(Error::ChecksumMismatch {
                expected: self.sha256.clone(),
                actual,
            });
        }
        let expected_len = self.record_count * self.layout.record_size();
        if data.len() != expected_len {
            return Err(Error::LengthMismatch {
                expected: expected_len,
                actual: data.len(),
            });
        }
        Ok(())
    }
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
