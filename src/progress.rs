//! Progress reporting module for geotag scans
//!
//! This module provides the JSON-lines messages and the reporter that writes
//! scan progress to stderr for external callers.

use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::models::{GeotagScanReport, ScanProgress, ScanStatus};

/// Start message sent when a search begins
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    /// Message type identifier
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Search root paths
    pub roots: Vec<String>,
    /// Extensions searched for
    pub extensions: Vec<String>,
    /// Files read per chunk
    pub chunk_size: usize,
}

impl StartMessage {
    /// Create a new start message
    pub fn new(
        seq: u64,
        ts: u64,
        roots: Vec<String>,
        extensions: Vec<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            msg_type: "start",
            seq,
            ts,
            roots,
            extensions,
            chunk_size,
        }
    }
}

/// Progress message sent during a scan
#[derive(Debug, Clone, Serialize)]
pub struct ProgressMessage {
    /// Message type identifier ("p" for progress)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Number of files processed
    #[serde(rename = "n")]
    pub processed: usize,
    /// Total number of files
    #[serde(rename = "t")]
    pub total: usize,
    /// Estimated remaining time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_ms: Option<u64>,
}

impl ProgressMessage {
    /// Create a new progress message
    pub fn new(seq: u64, ts: u64, processed: usize, total: usize, eta_ms: Option<u64>) -> Self {
        Self {
            msg_type: "p",
            seq,
            ts,
            processed,
            total,
            eta_ms,
        }
    }
}

/// Error message sent when the search fails
#[derive(Debug, Clone, Serialize)]
pub struct ErrorProgressMessage {
    /// Message type identifier ("err" for error)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Error type/category
    pub error_type: String,
    /// Error message description
    pub message: String,
    /// Path that caused the error (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorProgressMessage {
    /// Create a new error progress message
    pub fn new(
        seq: u64,
        ts: u64,
        error_type: String,
        message: String,
        path: Option<String>,
    ) -> Self {
        Self {
            msg_type: "err",
            seq,
            ts,
            error_type,
            message,
            path,
        }
    }
}

/// Done message sent when a scan reaches a terminal state
#[derive(Debug, Clone, Serialize)]
pub struct DoneMessage {
    /// Message type identifier ("done" for completion)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// How the scan ended
    pub status: ScanStatus,
    /// Number of files processed
    #[serde(rename = "n")]
    pub processed: usize,
    /// Total number of files
    #[serde(rename = "t")]
    pub total: usize,
    /// Number of geotagged photos found
    #[serde(rename = "g")]
    pub geotagged: usize,
    /// Number of photos without GPS position
    #[serde(rename = "ng")]
    pub not_geotagged: usize,
    /// Number of unreadable files
    #[serde(rename = "ur")]
    pub unreadable: usize,
    /// Total scan duration in milliseconds
    pub ms: u64,
}

impl DoneMessage {
    /// Create a done message from a scan report
    pub fn from_report(seq: u64, ts: u64, report: &GeotagScanReport) -> Self {
        Self {
            msg_type: "done",
            seq,
            ts,
            status: report.status,
            processed: report.processed,
            total: report.total,
            geotagged: report.geotagged(),
            not_geotagged: report.not_geotagged,
            unreadable: report.unreadable,
            ms: report.duration_ms,
        }
    }
}

/// Progress reporter for outputting scan progress to stderr
///
/// Progress ticks are throttled to one per interval, except the final tick of
/// a scan which is always written.
pub struct ProgressReporter {
    /// Whether progress reporting is enabled
    enabled: bool,
    /// Reporting interval in milliseconds
    interval_ms: u64,
    /// Last report time
    last_report: std::cell::Cell<Option<Instant>>,
    /// Time of the priming `(0, total)` tick of the current scan
    scan_started: std::cell::Cell<Option<Instant>>,
    /// Sequence number for messages
    seq: AtomicU64,
    /// Start time of the reporter
    start_time: Instant,
}

impl ProgressReporter {
    /// Create a new ProgressReporter
    ///
    /// # Arguments
    /// * `enabled` - Whether progress reporting is enabled
    /// * `interval_ms` - Minimum interval between progress messages in milliseconds
    pub fn new(enabled: bool, interval_ms: u64) -> Self {
        Self {
            enabled,
            interval_ms,
            last_report: std::cell::Cell::new(None),
            scan_started: std::cell::Cell::new(None),
            seq: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Check if enough time has passed since the last report
    pub fn should_report(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_report.get() {
            Some(last) => last.elapsed().as_millis() as u64 >= self.interval_ms,
            None => true,
        }
    }

    /// Get the next sequence number (monotonically increasing)
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the current timestamp in milliseconds since reporter creation
    pub fn current_timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Output a serializable message to stderr as JSON
    pub fn output_to_stderr<T: Serialize>(&self, msg: &T) {
        if let Ok(json) = serde_json::to_string(msg) {
            eprintln!("{}", json);
            std::io::stderr().flush().ok();
        }
    }

    /// Report search start
    pub fn report_start(&self, config: &ScanConfig) {
        if !self.enabled {
            return;
        }

        let roots: Vec<String> = config
            .roots
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        let msg = StartMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            roots,
            config.extensions.clone(),
            config.effective_chunk_size(),
        );

        self.output_to_stderr(&msg);
    }

    /// Milliseconds spent scanning, counted from the priming tick.
    ///
    /// A tick with nothing processed restarts the clock, so time spent
    /// enumerating never counts towards the estimate.
    pub fn scan_elapsed_ms(&self, progress: &ScanProgress) -> u64 {
        match self.scan_started.get() {
            Some(started) if progress.processed > 0 => started.elapsed().as_millis() as u64,
            _ => {
                self.scan_started.set(Some(Instant::now()));
                0
            }
        }
    }

    /// Build the message for a progress tick, or None when throttled
    pub fn progress_message(&self, progress: &ScanProgress) -> Option<ProgressMessage> {
        if !self.enabled {
            return None;
        }
        let scan_elapsed = self.scan_elapsed_ms(progress);
        if !progress.is_complete() && !self.should_report() {
            return None;
        }

        let ts = self.current_timestamp();
        self.last_report.set(Some(Instant::now()));
        Some(ProgressMessage::new(
            self.next_seq(),
            ts,
            progress.processed,
            progress.total,
            progress.estimated_remaining_ms(scan_elapsed),
        ))
    }

    /// Report scan progress.
    ///
    /// Returns true if a message was actually sent.
    pub fn report_progress(&self, progress: &ScanProgress) -> bool {
        match self.progress_message(progress) {
            Some(msg) => {
                self.output_to_stderr(&msg);
                true
            }
            None => false,
        }
    }

    /// Report an error. Ignores interval timing.
    pub fn report_error(&self, error: &ScanError) {
        if !self.enabled {
            return;
        }

        let msg = ErrorProgressMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            format!("{:?}", error.kind),
            error.message.clone(),
            error.path.as_ref().map(|p| p.to_string_lossy().to_string()),
        );

        self.output_to_stderr(&msg);
    }

    /// Report scan completion
    pub fn report_done(&self, report: &GeotagScanReport) {
        if !self.enabled {
            return;
        }

        let msg = DoneMessage::from_report(self.next_seq(), self.current_timestamp(), report);
        self.output_to_stderr(&msg);
    }

    /// Check if the reporter is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeotaggedPhoto;
    use std::path::PathBuf;

    fn report(status: ScanStatus) -> GeotagScanReport {
        GeotagScanReport {
            photos: vec![GeotaggedPhoto::new(PathBuf::from("/p/a.jpg"), 1.0, 2.0, 0)],
            status,
            processed: 4,
            total: 5,
            not_geotagged: 2,
            unreadable: 1,
            errors: Vec::new(),
            duration_ms: 4500,
        }
    }

    #[test]
    fn test_start_message_serialization() {
        let msg = StartMessage::new(
            1,
            100,
            vec!["/path/to/photos".to_string()],
            vec!["jpg".to_string(), "jpeg".to_string()],
            100,
        );
        let parsed: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(parsed["_t"], "start");
        assert_eq!(parsed["seq"], 1);
        assert_eq!(parsed["ts"], 100);
        assert_eq!(parsed["roots"][0], "/path/to/photos");
        assert_eq!(parsed["extensions"][1], "jpeg");
        assert_eq!(parsed["chunk_size"], 100);
    }

    #[test]
    fn test_progress_message_serialization() {
        let msg = ProgressMessage::new(2, 200, 10, 40, Some(600));
        let parsed: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(parsed["_t"], "p");
        assert_eq!(parsed["seq"], 2);
        assert_eq!(parsed["n"], 10);
        assert_eq!(parsed["t"], 40);
        assert_eq!(parsed["eta_ms"], 600);

        let json = serde_json::to_string(&ProgressMessage::new(1, 1, 0, 3, None)).unwrap();
        assert!(!json.contains("eta_ms"));
    }

    #[test]
    fn test_error_message_serialization() {
        let msg = ErrorProgressMessage::new(
            3,
            300,
            "NotADirectory".to_string(),
            "/foo/bar does not exist".to_string(),
            Some("/foo/bar".to_string()),
        );
        let parsed: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(parsed["_t"], "err");
        assert_eq!(parsed["error_type"], "NotADirectory");
        assert_eq!(parsed["path"], "/foo/bar");

        let msg = ErrorProgressMessage::new(1, 1, "IoError".to_string(), "x".to_string(), None);
        assert!(!serde_json::to_string(&msg).unwrap().contains("\"path\""));
    }

    #[test]
    fn test_done_message_from_report() {
        let msg = DoneMessage::from_report(10, 5000, &report(ScanStatus::Cancelled));
        let parsed: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(parsed["_t"], "done");
        assert_eq!(parsed["status"], "cancelled");
        assert_eq!(parsed["n"], 4);
        assert_eq!(parsed["t"], 5);
        assert_eq!(parsed["g"], 1);
        assert_eq!(parsed["ng"], 2);
        assert_eq!(parsed["ur"], 1);
        assert_eq!(parsed["ms"], 4500);
    }

    #[test]
    fn test_progress_reporter_sequence_numbers() {
        let reporter = ProgressReporter::new(true, 200);
        assert_eq!(reporter.next_seq(), 0);
        assert_eq!(reporter.next_seq(), 1);
        assert_eq!(reporter.next_seq(), 2);
    }

    #[test]
    fn test_progress_throttled_but_final_tick_always_sent() {
        let reporter = ProgressReporter::new(true, 60_000);

        // First tick goes out, the next ones fall inside the interval
        assert!(reporter.progress_message(&ScanProgress::new(0, 3)).is_some());
        assert!(reporter.progress_message(&ScanProgress::new(1, 3)).is_none());
        assert!(reporter.progress_message(&ScanProgress::new(2, 3)).is_none());
        let last = reporter.progress_message(&ScanProgress::new(3, 3)).unwrap();
        assert_eq!(last.processed, 3);
        assert_eq!(last.seq, 1);
    }

    #[test]
    fn test_eta_ignores_time_before_scan_start() {
        let reporter = ProgressReporter::new(true, 0);

        // Time spent enumerating before the priming tick
        std::thread::sleep(std::time::Duration::from_millis(200));
        let priming = reporter.progress_message(&ScanProgress::new(0, 2)).unwrap();
        assert_eq!(priming.eta_ms, None);
        assert!(priming.ts >= 200);

        std::thread::sleep(std::time::Duration::from_millis(20));
        let tick = reporter.progress_message(&ScanProgress::new(1, 2)).unwrap();
        let eta = tick.eta_ms.unwrap();
        // One of two files done, so the estimate equals the time spent scanning
        assert!(eta >= 20, "eta {}", eta);
        assert!(eta + 200 <= tick.ts, "eta {} counts enumeration, ts {}", eta, tick.ts);
    }

    #[test]
    fn test_progress_reporter_should_report_timing() {
        let reporter = ProgressReporter::new(true, 10);
        assert!(reporter.should_report());

        reporter.last_report.set(Some(Instant::now()));
        assert!(!reporter.should_report());

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(reporter.should_report());
    }

    #[test]
    fn test_disabled_reporter_is_silent() {
        let reporter = ProgressReporter::new(false, 0);
        assert!(!reporter.is_enabled());
        assert!(!reporter.should_report());
        assert!(!reporter.report_progress(&ScanProgress::new(3, 3)));

        reporter.report_start(&ScanConfig::default());
        reporter.report_error(&ScanError::database_error("boom"));
        reporter.report_done(&report(ScanStatus::Completed));

        // Nothing consumed a sequence number
        assert_eq!(reporter.next_seq(), 0);
    }
}
