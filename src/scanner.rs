//! Scanner module - chunked, cancellable geotag scan over a list of paths

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanErrorKind};
use crate::geotag::classify_photo;
use crate::models::{GeotagScanReport, GeotaggedPhoto, PhotoOutcome, ScanProgress, ScanStatus};
use crate::walker::enumerate_with_config;

/// Shared flag used to stop a scan at the next chunk boundary
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Files already being read finish first.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// State of a [`GeotagScan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Not started; the first step announces the total
    Idle,
    /// Paths remain to be processed
    Scanning,
    /// Every path was processed
    Completed,
    /// Stopped by the cancellation token
    Cancelled,
}

impl ScanState {
    /// Whether stepping further has no effect
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Cancelled)
    }
}

/// A single geotag scan over a fixed list of paths.
///
/// Each call to [`GeotagScan::step`] processes at most `chunk_size` paths and
/// then returns, so the owner decides when to resume. The cancellation token
/// is only checked before a chunk starts.
pub struct GeotagScan<F> {
    paths: Vec<PathBuf>,
    chunk_size: usize,
    index: usize,
    state: ScanState,
    on_progress: F,
    token: CancellationToken,
    photos: Vec<GeotaggedPhoto>,
    not_geotagged: usize,
    errors: Vec<ScanError>,
    started: Option<Instant>,
}

impl<F: FnMut(ScanProgress)> GeotagScan<F> {
    /// Create a scan. A chunk size of 0 is treated as 1.
    pub fn new(paths: Vec<PathBuf>, chunk_size: usize, on_progress: F) -> Self {
        Self {
            paths,
            chunk_size: chunk_size.max(1),
            index: 0,
            state: ScanState::Idle,
            on_progress,
            token: CancellationToken::new(),
            photos: Vec::new(),
            not_geotagged: 0,
            errors: Vec::new(),
            started: None,
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Get the current state
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Get the number of paths processed so far out of the total
    pub fn progress(&self) -> ScanProgress {
        ScanProgress::new(self.index, self.paths.len())
    }

    /// Process the next chunk and return the resulting state
    pub fn step(&mut self) -> ScanState {
        if self.state.is_terminal() {
            return self.state;
        }

        if self.state == ScanState::Idle {
            self.started = Some(Instant::now());
            self.state = ScanState::Scanning;
            let progress = self.progress();
            (self.on_progress)(progress);
        }

        if self.token.is_cancelled() {
            log::info!(
                "Geotag scan cancelled after {} of {} files",
                self.index,
                self.paths.len()
            );
            self.state = ScanState::Cancelled;
            return self.state;
        }

        let end = (self.index + self.chunk_size).min(self.paths.len());
        while self.index < end {
            let outcome = classify_photo(&self.paths[self.index]);
            self.record(outcome);
            self.index += 1;
            let progress = self.progress();
            (self.on_progress)(progress);
        }

        if self.index >= self.paths.len() {
            self.state = ScanState::Completed;
        }
        self.state
    }

    fn record(&mut self, outcome: PhotoOutcome) {
        match outcome {
            PhotoOutcome::Geotagged(photo) => self.photos.push(photo),
            PhotoOutcome::NotGeotagged => self.not_geotagged += 1,
            PhotoOutcome::Unreadable(error) => {
                log::warn!("Could not read EXIF: {}", error);
                self.errors.push(error);
            }
        }
    }

    /// Drive the scan to a terminal state, yielding the thread between chunks
    pub fn run(mut self) -> GeotagScanReport {
        while !self.step().is_terminal() {
            std::thread::yield_now();
        }
        self.into_report()
    }

    /// Finish the scan and collect what was accumulated.
    ///
    /// A scan that has not reached a terminal state is reported as cancelled.
    pub fn into_report(self) -> GeotagScanReport {
        let status = match self.state {
            ScanState::Completed => ScanStatus::Completed,
            _ => ScanStatus::Cancelled,
        };
        let duration_ms = self
            .started
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0);

        log::info!(
            "Geotag scan {}: {} geotagged, {} without GPS, {} unreadable, {} of {} files in {}ms",
            status,
            self.photos.len(),
            self.not_geotagged,
            self.errors.len(),
            self.index,
            self.paths.len(),
            duration_ms
        );

        GeotagScanReport {
            photos: self.photos,
            status,
            processed: self.index,
            total: self.paths.len(),
            not_geotagged: self.not_geotagged,
            unreadable: self.errors.len(),
            errors: self.errors,
            duration_ms,
        }
    }
}

/// Scan `paths` for geotagged photos in chunks of `chunk_size`.
///
/// `on_progress` receives `(0, total)` first, then one call per path. Files
/// that cannot be read are skipped, never reported as an error.
pub fn scan_geotags<P, F>(paths: &[P], on_progress: F, chunk_size: usize) -> GeotagScanReport
where
    P: AsRef<Path>,
    F: FnMut(ScanProgress),
{
    scan_geotags_cancellable(paths, on_progress, chunk_size, CancellationToken::new())
}

/// Same as [`scan_geotags`], stopping at the first chunk boundary after
/// `token` is cancelled. The report then holds the photos found so far.
pub fn scan_geotags_cancellable<P, F>(
    paths: &[P],
    on_progress: F,
    chunk_size: usize,
    token: CancellationToken,
) -> GeotagScanReport
where
    P: AsRef<Path>,
    F: FnMut(ScanProgress),
{
    let paths = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
    GeotagScan::new(paths, chunk_size, on_progress)
        .with_cancellation(token)
        .run()
}

/// Events sent by a background finder
#[derive(Debug, Clone)]
pub enum FinderEvent {
    /// Candidate paths were enumerated
    Enumerated { total: usize },
    /// A scan progress tick
    Progress(ScanProgress),
    /// The scan reached a terminal state
    Finished(GeotagScanReport),
    /// Enumeration failed; no scan was started
    Failed(ScanError),
}

/// Handle to a finder running on its own thread
pub struct FinderHandle {
    events: Receiver<FinderEvent>,
    token: CancellationToken,
    thread: JoinHandle<Result<GeotagScanReport, ScanError>>,
}

impl FinderHandle {
    /// Receiver of progress and completion events
    pub fn events(&self) -> &Receiver<FinderEvent> {
        &self.events
    }

    /// Get a clone of the token that stops this finder
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the finder at the next chunk boundary
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the finder thread to finish
    pub fn join(self) -> Result<GeotagScanReport, ScanError> {
        self.thread.join().unwrap_or_else(|_| {
            Err(ScanError::new(
                ScanErrorKind::Unknown,
                None,
                "geotag finder thread panicked",
            ))
        })
    }
}

/// Enumerate the configured roots and scan the candidates on a background
/// thread, reporting through [`FinderEvent`]s.
pub fn spawn_geotag_finder(config: ScanConfig) -> FinderHandle {
    spawn_geotag_finder_cancellable(config, CancellationToken::new())
}

/// Same as [`spawn_geotag_finder`], stopped by an externally owned `token`.
/// A token cancelled before the call still enumerates, then ends the scan
/// before its first chunk.
pub fn spawn_geotag_finder_cancellable(
    config: ScanConfig,
    token: CancellationToken,
) -> FinderHandle {
    let (tx, rx) = unbounded();
    let worker_token = token.clone();

    let thread = std::thread::spawn(move || run_finder(&config, worker_token, &tx));

    FinderHandle {
        events: rx,
        token,
        thread,
    }
}

fn run_finder(
    config: &ScanConfig,
    token: CancellationToken,
    tx: &Sender<FinderEvent>,
) -> Result<GeotagScanReport, ScanError> {
    let paths = match enumerate_with_config(config) {
        Ok(paths) => paths,
        Err(e) => {
            log::error!("Photo search failed: {}", e);
            tx.send(FinderEvent::Failed(e.clone())).ok();
            return Err(e);
        }
    };
    tx.send(FinderEvent::Enumerated { total: paths.len() }).ok();

    let progress_tx = tx.clone();
    let report = GeotagScan::new(paths, config.effective_chunk_size(), move |progress| {
        progress_tx.send(FinderEvent::Progress(progress)).ok();
    })
    .with_cancellation(token)
    .run();

    tx.send(FinderEvent::Finished(report.clone())).ok();
    Ok(report)
}
