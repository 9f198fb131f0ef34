//! Core data models for the geotag finder

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ScanError;

/// A photo whose EXIF metadata carries a GPS position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeotaggedPhoto {
    /// Absolute path to the image file, unique per photo
    pub path: PathBuf,
    /// Latitude in decimal degrees, negative south of the equator
    pub latitude: f64,
    /// Longitude in decimal degrees, negative west of Greenwich
    pub longitude: f64,
    /// Capture time as Unix timestamp, 0 when the photo has no DateTimeOriginal
    pub create_time: i64,
}

impl GeotaggedPhoto {
    /// Create a new geotagged photo record
    pub fn new(path: PathBuf, latitude: f64, longitude: f64, create_time: i64) -> Self {
        Self {
            path,
            latitude,
            longitude,
            create_time,
        }
    }

    /// Whether the capture time is known
    pub fn has_create_time(&self) -> bool {
        self.create_time != 0
    }
}

/// Outcome of inspecting a single candidate file
#[derive(Debug, Clone)]
pub enum PhotoOutcome {
    /// EXIF parsed and contained both coordinates
    Geotagged(GeotaggedPhoto),
    /// EXIF parsed but has no usable GPS position
    NotGeotagged,
    /// File could not be read or its EXIF could not be parsed
    Unreadable(ScanError),
}

impl PhotoOutcome {
    /// Consume the outcome, keeping only a geotagged photo
    pub fn into_photo(self) -> Option<GeotaggedPhoto> {
        match self {
            PhotoOutcome::Geotagged(photo) => Some(photo),
            _ => None,
        }
    }
}

/// Progress information during a geotag scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of paths processed so far
    pub processed: usize,
    /// Total number of paths in the scan
    pub total: usize,
}

impl ScanProgress {
    /// Create a new progress value
    pub fn new(processed: usize, total: usize) -> Self {
        Self { processed, total }
    }

    /// Whether every path has been processed
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }

    /// Calculate estimated remaining time from the time spent so far
    pub fn estimated_remaining_ms(&self, elapsed_ms: u64) -> Option<u64> {
        if self.processed == 0 || elapsed_ms == 0 {
            return None;
        }
        let rate = self.processed as f64 / elapsed_ms as f64;
        let remaining = self.total.saturating_sub(self.processed);
        Some((remaining as f64 / rate) as u64)
    }
}

/// How a geotag scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Every path was processed
    Completed,
    /// The cancellation token was set before all paths were processed
    Cancelled,
}

impl ScanStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Completed => "completed",
            ScanStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a geotag scan
#[derive(Debug, Clone, Serialize)]
pub struct GeotagScanReport {
    /// Geotagged photos in input order
    pub photos: Vec<GeotaggedPhoto>,
    /// Whether the scan ran to completion
    pub status: ScanStatus,
    /// Number of paths processed
    pub processed: usize,
    /// Number of paths handed to the scan
    pub total: usize,
    /// Number of files with EXIF but no GPS position
    pub not_geotagged: usize,
    /// Number of files that could not be read or parsed
    pub unreadable: usize,
    /// Reasons for the unreadable files
    #[serde(skip)]
    pub errors: Vec<ScanError>,
    /// Total scan duration in milliseconds
    pub duration_ms: u64,
}

impl GeotagScanReport {
    /// Number of geotagged photos found
    pub fn geotagged(&self) -> usize {
        self.photos.len()
    }

    /// Whether the scan was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.status == ScanStatus::Cancelled
    }
}

/// Inclusive range of capture timestamps used to filter stored photos
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// First accepted timestamp
    pub start: Option<i64>,
    /// Last accepted timestamp
    pub end: Option<i64>,
}

impl DateRange {
    /// Range accepting every photo
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a range covering whole calendar days: from the first second of
    /// `from` up to the last second of `to`
    pub fn from_dates(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        let start = from
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp());
        let end = to
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc().timestamp());
        Self { start, end }
    }

    /// Parse a `YYYY-MM-DD` date
    pub fn parse_date(input: &str) -> Result<NaiveDate, ScanError> {
        NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
            .map_err(|e| ScanError::invalid_date(input, e.to_string()))
    }

    /// Check if a timestamp falls inside the range
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }
}
