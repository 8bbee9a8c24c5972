//! Build configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::{RecordLayout, DEFAULT_ARTIFACT_PATH};
use crate::error::{Error, Result};
use crate::{AddressFamily, FamilyFilter};

/// Settings for one artifact build.
///
/// Every field has a default, so a YAML file only needs the keys it
/// changes:
///
/// ```yaml
/// input: /var/lib/redblock/ranges.txt
/// output: /etc/nginx/redblock_ranges.bin
/// families: [ipv4]
/// layout: compact
/// threads: 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Token list to read (`-` for stdin)
    pub input: Option<PathBuf>,
    /// Artifact to write
    pub output: PathBuf,
    /// Families to keep; everything else is counted and dropped
    pub families: Vec<AddressFamily>,
    /// Record layout agreed with the consumer
    pub layout: RecordLayout,
    /// Parser threads (1 parses inline)
    pub threads: usize,
    /// Write `<output>.meta` next to the artifact
    pub write_metadata: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            families: Vec::new(),
            layout: RecordLayout::default(),
            threads: 1,
            write_metadata: true,
        }
    }
}

impl BuildConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that do not depend on CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::Config("threads must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Family filter for ingestion.
    ///
    /// At least one family must be selected.
    pub fn family_filter(&self) -> Result<FamilyFilter> {
        let filter = FamilyFilter::from_families(&self.families);
        if filter.is_empty() {
            return Err(Error::Config(
                "specify at least one of ipv4 or ipv6".to_string(),
            ));
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.output, PathBuf::from("/etc/nginx/redblock_ranges.bin"));
        assert_eq!(config.layout, RecordLayout::Compact);
        assert_eq!(config.threads, 1);
        assert!(config.write_metadata);
        assert!(config.family_filter().is_err());
    }

    #[test]
    fn test_from_yaml() {
        let config = BuildConfig::from_yaml(
            "input: ranges.txt\nfamilies: [ipv4, ipv6]\nlayout: wide\nthreads: 8\n",
        )
        .unwrap();
        assert_eq!(config.input, Some(PathBuf::from("ranges.txt")));
        assert_eq!(config.layout, RecordLayout::Wide);
        assert_eq!(config.threads, 8);
        assert_eq!(config.family_filter().unwrap(), FamilyFilter::all());
        assert_eq!(config.output, PathBuf::from(DEFAULT_ARTIFACT_PATH));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            BuildConfig::from_yaml("reason: tor_exit\n"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn test_rejects_zero_threads() {
        assert!(matches!(
            BuildConfig::from_yaml("threads: 0\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redblock.yml");
        std::fs::write(&path, "families: [ipv6]\nwrite_metadata: false\n").unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.family_filter().unwrap(), FamilyFilter::V6);
        assert!(!config.write_metadata);
    }
}
