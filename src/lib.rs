//! Geotagged photo finder
//!
//! This library walks a directory tree for photos, reads the GPS position and
//! capture time from each file's EXIF header in small cooperative chunks, and
//! stores the geotagged ones in a SQLite photo database.

pub mod config;
pub mod db;
pub mod error;
pub mod geotag;
pub mod models;
pub mod progress;
pub mod scanner;
pub mod walker;

#[cfg(test)]
mod test_support;

pub use config::ScanConfig;
pub use db::{PhotoDatabase, SaveSummary};
pub use error::{ScanError, ScanErrorKind};
pub use geotag::classify_photo;
pub use models::{
    DateRange, GeotagScanReport, GeotaggedPhoto, PhotoOutcome, ScanProgress, ScanStatus,
};
pub use progress::{
    DoneMessage, ErrorProgressMessage, ProgressMessage, ProgressReporter, StartMessage,
};
pub use scanner::{
    scan_geotags, scan_geotags_cancellable, spawn_geotag_finder, spawn_geotag_finder_cancellable,
    CancellationToken, FinderEvent, FinderHandle, GeotagScan, ScanState,
};
pub use walker::{
    enumerate_photo_paths, enumerate_with_config, sanitize_extensions, ScanExtensionSet,
};
