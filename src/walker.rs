//! Path enumerator - walks a directory tree and collects candidate photo paths

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::ScanError;

/// Normalize file extensions: lower-case and strip a single leading period.
///
/// Order and duplicates are preserved.
pub fn sanitize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| {
            let ext = ext.as_ref().to_lowercase();
            match ext.strip_prefix('.') {
                Some(stripped) => stripped.to_string(),
                None => ext,
            }
        })
        .collect()
}

/// Normalized set of extensions used as a filter predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanExtensionSet {
    extensions: HashSet<String>,
}

impl ScanExtensionSet {
    /// Build a set from raw extension strings
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: sanitize_extensions(extensions).into_iter().collect(),
        }
    }

    /// Check if a sanitized extension is part of the set
    pub fn contains(&self, ext: &str) -> bool {
        self.extensions.contains(ext)
    }

    /// Check if a path's last extension is part of the set.
    ///
    /// A path without an extension only matches the empty extension.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.extensions.contains(&ext)
    }

    /// Number of distinct extensions
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether no extension is accepted
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Recursively collect the absolute paths of files under `base_directory`
/// whose extension is one of `extensions`.
///
/// Fails if `base_directory` is missing or is not a directory. Symbolic links
/// and entries that cannot be read are logged and skipped. The order of the
/// returned paths is unspecified.
pub fn enumerate_photo_paths<S: AsRef<str>>(
    base_directory: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, ScanError> {
    walk_root(base_directory, &ScanExtensionSet::new(extensions), None)
}

/// Collect candidate paths from every root of a config.
///
/// An invalid root fails the whole call before anything is returned.
pub fn enumerate_with_config(config: &ScanConfig) -> Result<Vec<PathBuf>, ScanError> {
    let extensions = config.extension_set();
    let mut paths = Vec::new();
    for root in &config.roots {
        paths.extend(walk_root(root, &extensions, config.max_depth)?);
    }
    Ok(paths)
}

/// Check the root and resolve it to an absolute path
fn resolve_root(base_directory: &Path) -> Result<PathBuf, ScanError> {
    let metadata =
        std::fs::metadata(base_directory).map_err(|_| ScanError::root_missing(base_directory))?;
    if !metadata.is_dir() {
        return Err(ScanError::not_a_directory(base_directory));
    }
    std::fs::canonicalize(base_directory).map_err(|_| ScanError::root_missing(base_directory))
}

fn walk_root(
    base_directory: &Path,
    extensions: &ScanExtensionSet,
    max_depth: Option<usize>,
) -> Result<Vec<PathBuf>, ScanError> {
    let root = resolve_root(base_directory)?;
    log::info!("Searching {} for {:?}", root.display(), extensions);

    let mut walker = WalkDir::new(&root).follow_links(false);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    let mut skipped = 0usize;

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let error = ScanError::from(e);
                log::warn!("Error occurred while reading {:?}: {}", error.path, error.message);
                skipped += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if file_type.is_symlink() {
            log::debug!("Skipping symbolic link {}", entry.path().display());
            skipped += 1;
            continue;
        }

        if extensions.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }

    log::info!(
        "Found {} candidate files under {} ({} entries skipped)",
        files.len(),
        root.display(),
        skipped
    );
    Ok(files)
}
