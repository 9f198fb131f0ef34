//! Photo Geotagger CLI
//!
//! Finds geotagged photos under one or more directories and keeps their
//! locations in a SQLite database.

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use std::path::PathBuf;

use photo_geotagger::{
    spawn_geotag_finder_cancellable, CancellationToken, DateRange, FinderEvent, GeotagScanReport,
    PhotoDatabase, ProgressReporter, ScanConfig, ScanError,
};

const ABOUT: &str = r#"
Photo Geotagger - find photos with GPS positions in their EXIF metadata

Examples:
  photo_geotagger scan -r ~/Pictures                      search one directory
  photo_geotagger scan -r /photos -r /backup -e jpg,cr2   several roots, custom extensions
  photo_geotagger scan -r /photos --progress              JSON progress lines on stderr
  photo_geotagger list --from 2017-08-01 --to 2017-08-31  photos taken in August 2017
  photo_geotagger prune                                   forget photos deleted from disk
"#;

/// Progress line interval in milliseconds
const PROGRESS_INTERVAL_MS: u64 = 200;

/// Geotagged photo finder
#[derive(Parser)]
#[command(name = "photo_geotagger")]
#[command(author, version, about = ABOUT, long_about = None)]
#[command(help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// SQLite database file
    #[arg(short = 'd', long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search directories for geotagged photos and store them
    Scan {
        /// Root directory to search, may be repeated
        #[arg(short = 'r', long, required = true)]
        roots: Vec<PathBuf>,

        /// File extensions to include, comma separated
        #[arg(
            short = 'e',
            long,
            value_delimiter = ',',
            default_values_t = ScanConfig::default_extensions()
        )]
        extensions: Vec<String>,

        /// Number of files read between yields
        #[arg(short = 'c', long, default_value_t = photo_geotagger::config::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Maximum directory depth below each root
        #[arg(long)]
        max_depth: Option<usize>,

        /// Overwrite locations of photos already in the database
        #[arg(short = 'u', long)]
        update: bool,

        /// Do not write results to the database
        #[arg(long)]
        dry_run: bool,

        /// Emit JSON progress lines on stderr
        #[arg(long)]
        progress: bool,

        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored photos, most recent first
    List {
        /// Only photos taken on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only photos taken on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove stored photos whose file no longer exists
    Prune,
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Scan {
            roots,
            extensions,
            chunk_size,
            max_depth,
            update,
            dry_run,
            progress,
            json,
        }) => {
            let mut builder = ScanConfig::builder()
                .roots(roots)
                .extensions(&extensions)
                .chunk_size(chunk_size)
                .max_depth(max_depth)
                .update_existing(update)
                .show_progress(progress);
            if let Some(db) = cli.db {
                builder = builder.db_path(db);
            }
            run_scan(builder.build(), dry_run, json)
        }
        Some(Commands::List { from, to, json }) => run_list(cli.db, from, to, json),
        Some(Commands::Prune) => run_prune(cli.db),
        None => {
            println!("{}", ABOUT);
            println!("Run 'photo_geotagger --help' for all options");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn open_database(db: Option<PathBuf>) -> Result<PhotoDatabase, ScanError> {
    let path = ScanConfig {
        db_path: db,
        ..Default::default()
    }
    .effective_db_path();
    info!("Using database {}", path.display());
    Ok(PhotoDatabase::open(&path)?)
}

fn run_scan(config: ScanConfig, dry_run: bool, json: bool) -> Result<(), ScanError> {
    info!("Starting photo search...");
    info!("Roots: {:?}", config.roots);
    info!("Extensions: {:?}", config.extensions);
    info!("Chunk size: {}", config.effective_chunk_size());

    let reporter = ProgressReporter::new(config.show_progress, PROGRESS_INTERVAL_MS);
    reporter.report_start(&config);

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }
    let handle = spawn_geotag_finder_cancellable(config.clone(), token);

    for event in handle.events().iter() {
        match event {
            FinderEvent::Enumerated { total } => info!("Reading EXIF from {} files", total),
            FinderEvent::Progress(progress) => {
                reporter.report_progress(&progress);
            }
            FinderEvent::Finished(report) => reporter.report_done(&report),
            FinderEvent::Failed(error) => reporter.report_error(&error),
        }
    }
    let report = handle.join()?;

    if report.is_cancelled() {
        warn!(
            "Search cancelled after {} of {} files",
            report.processed, report.total
        );
    }

    let summary = if dry_run {
        None
    } else {
        let mut db = open_database(config.db_path.clone())?;
        Some(db.save_photos(&report.photos, config.update_existing)?)
    };

    if json {
        let output = serde_json::json!({
            "report": report,
            "saved": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        print_report(&report);
        if let Some(summary) = summary {
            println!("  Added to database: {}", summary.added);
            println!("  Updated in database: {}", summary.updated);
            println!("  Already stored: {}", summary.skipped);
        }
    }
    Ok(())
}

fn print_report(report: &GeotagScanReport) {
    println!("Search {}:", report.status);
    println!("  Files checked: {} of {}", report.processed, report.total);
    println!("  Geotagged photos: {}", report.geotagged());
    println!("  Without GPS: {}", report.not_geotagged);
    println!("  Unreadable: {}", report.unreadable);
    println!("  Duration: {}ms", report.duration_ms);
}

fn run_list(
    db: Option<PathBuf>,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<(), ScanError> {
    let from = from.as_deref().map(DateRange::parse_date).transpose()?;
    let to = to.as_deref().map(DateRange::parse_date).transpose()?;
    let range = DateRange::from_dates(from, to);

    let db = open_database(db)?;
    let photos = db.find_taken_between(&range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&photos).unwrap_or_default());
        return Ok(());
    }

    for photo in &photos {
        let taken = if photo.has_create_time() {
            chrono::DateTime::from_timestamp(photo.create_time, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default()
        } else {
            "unknown date".to_string()
        };
        println!(
            "{:>11.6} {:>11.6}  {}  {}",
            photo.latitude,
            photo.longitude,
            taken,
            photo.path.display()
        );
    }
    println!("{} photos", photos.len());
    Ok(())
}

fn run_prune(db: Option<PathBuf>) -> Result<(), ScanError> {
    let mut db = open_database(db)?;
    let removed = db.remove_missing()?;
    println!("Removed {} missing photos, {} remain", removed, db.count()?);
    Ok(())
}
