//! Configuration for the geotag finder

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::walker::ScanExtensionSet;

/// Default number of files read between yields
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default photo database file name
pub const DEFAULT_DB_FILE: &str = "geotags.db";

/// Configuration for a find-and-store run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root directories to search
    pub roots: Vec<PathBuf>,

    /// File extensions to include, in any case, with or without a leading period
    pub extensions: Vec<String>,

    /// Number of files read per chunk before yielding
    pub chunk_size: usize,

    /// Maximum directory depth below each root (None = unlimited)
    pub max_depth: Option<usize>,

    /// Database path for storing geotagged photos
    pub db_path: Option<PathBuf>,

    /// Whether photos already in the database get their location overwritten
    pub update_existing: bool,

    /// Whether to emit JSON progress lines on stderr
    pub show_progress: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: Self::default_extensions(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_depth: None,
            db_path: None,
            update_existing: false,
            show_progress: false,
        }
    }
}

impl ScanConfig {
    /// Create a new config with the given root directories
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }

    /// Create a config builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::new()
    }

    /// Get the default photo extensions
    pub fn default_extensions() -> Vec<String> {
        ["jpg", "jpeg"].iter().map(|s| s.to_string()).collect()
    }

    /// Build the normalized extension filter for this config
    pub fn extension_set(&self) -> ScanExtensionSet {
        ScanExtensionSet::new(&self.extensions)
    }

    /// Get the effective chunk size (never zero)
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Get the effective database path
    pub fn effective_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
    }
}

/// Builder for ScanConfig
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directories
    pub fn roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.roots = roots;
        self
    }

    /// Add a root directory
    pub fn add_root(mut self, root: PathBuf) -> Self {
        self.config.roots.push(root);
        self
    }

    /// Set the extensions whitelist
    pub fn extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.config.extensions = extensions.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    /// Set the chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the maximum depth below each root
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the database path
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.config.db_path = Some(path);
        self
    }

    /// Overwrite stored locations of photos found again
    pub fn update_existing(mut self, enabled: bool) -> Self {
        self.config.update_existing = enabled;
        self
    }

    /// Enable or disable progress output
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.config.show_progress = enabled;
        self
    }

    /// Build the config
    pub fn build(self) -> ScanConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(config.roots.is_empty());
        assert_eq!(config.extensions, vec!["jpg", "jpeg"]);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.max_depth.is_none());
        assert!(!config.update_existing);
        assert_eq!(config.effective_db_path(), PathBuf::from(DEFAULT_DB_FILE));
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .add_root(PathBuf::from("/photos"))
            .extensions(&[".JPG", "cr2"])
            .chunk_size(25)
            .max_depth(Some(4))
            .db_path(PathBuf::from("/tmp/photos.db"))
            .update_existing(true)
            .build();

        assert_eq!(config.roots, vec![PathBuf::from("/photos")]);
        assert_eq!(config.chunk_size, 25);
        assert_eq!(config.max_depth, Some(4));
        assert!(config.update_existing);
        assert_eq!(config.effective_db_path(), PathBuf::from("/tmp/photos.db"));

        let set = config.extension_set();
        assert!(set.contains("jpg"));
        assert!(set.contains("cr2"));
        assert!(!set.contains("jpeg"));
    }

    #[test]
    fn test_effective_chunk_size() {
        let config = ScanConfig::builder().chunk_size(0).build();
        assert_eq!(config.effective_chunk_size(), 1);

        let config = ScanConfig::builder().chunk_size(7).build();
        assert_eq!(config.effective_chunk_size(), 7);
    }
}
