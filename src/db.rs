//! Database module for persisting geotagged photos

use rusqlite::{params, Connection, Result as SqliteResult, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::models::{DateRange, GeotaggedPhoto};

/// Counts of what a save did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    /// Photos whose path was not stored yet
    pub added: u64,
    /// Stored photos whose location and time were overwritten
    pub updated: u64,
    /// Stored photos left untouched
    pub skipped: u64,
}

/// Photo store backed by SQLite, keyed by file path
pub struct PhotoDatabase {
    conn: Connection,
}

impl PhotoDatabase {
    /// Open or create database
    pub fn open(path: &Path) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> SqliteResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS photos (
                path BLOB PRIMARY KEY,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                create_time INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_photos_create_time ON photos(create_time);
            ",
        )?;
        Ok(())
    }

    /// Store photos in one transaction.
    ///
    /// New paths are inserted. Paths already stored are overwritten only when
    /// `update_existing` is set, otherwise they are skipped.
    pub fn save_photos(
        &mut self,
        photos: &[GeotaggedPhoto],
        update_existing: bool,
    ) -> SqliteResult<SaveSummary> {
        let mut summary = SaveSummary::default();
        let tx = self.conn.transaction()?;
        {
            let mut exists_stmt = tx.prepare("SELECT 1 FROM photos WHERE path = ?1")?;
            let mut insert_stmt = tx.prepare(
                "INSERT INTO photos (path, latitude, longitude, create_time)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut update_stmt = tx.prepare(
                "UPDATE photos SET latitude = ?2, longitude = ?3, create_time = ?4
                 WHERE path = ?1",
            )?;

            for photo in photos {
                let Some(key) = path_key(&photo.path) else {
                    log::warn!("Skipping {}: path is not valid Unicode", photo.path.display());
                    summary.skipped += 1;
                    continue;
                };

                if !exists_stmt.exists([&key])? {
                    log::debug!("Adding {} to database", photo.path.display());
                    insert_stmt.execute(params![
                        key,
                        photo.latitude,
                        photo.longitude,
                        photo.create_time
                    ])?;
                    summary.added += 1;
                } else if update_existing {
                    log::debug!("Updating {} in database", photo.path.display());
                    update_stmt.execute(params![
                        key,
                        photo.latitude,
                        photo.longitude,
                        photo.create_time
                    ])?;
                    summary.updated += 1;
                } else {
                    summary.skipped += 1;
                }
            }
        }
        tx.commit()?;

        log::info!(
            "Saved photos: {} added, {} updated, {} already stored",
            summary.added,
            summary.updated,
            summary.skipped
        );
        Ok(summary)
    }

    /// Load all photos, most recent first
    pub fn find_all(&self) -> SqliteResult<Vec<GeotaggedPhoto>> {
        self.find_taken_between(&DateRange::unbounded())
    }

    /// Load photos taken inside the range, most recent first
    pub fn find_taken_between(&self, range: &DateRange) -> SqliteResult<Vec<GeotaggedPhoto>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, latitude, longitude, create_time FROM photos
             WHERE (?1 IS NULL OR create_time >= ?1) AND (?2 IS NULL OR create_time <= ?2)
             ORDER BY create_time DESC, path",
        )?;

        let rows = stmt.query_map(params![range.start, range.end], photo_from_row)?;

        let mut photos = Vec::new();
        for row in rows {
            photos.push(row?);
        }
        Ok(photos)
    }

    /// Get photo count
    pub fn count(&self) -> SqliteResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete photos whose file no longer exists on disk
    pub fn remove_missing(&mut self) -> SqliteResult<u64> {
        let keys: Vec<Vec<u8>> = {
            let mut stmt = self.conn.prepare("SELECT path FROM photos")?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
            rows.collect::<SqliteResult<_>>()?
        };

        let missing: Vec<&Vec<u8>> = keys
            .iter()
            .filter(|key| !path_from_key(key).exists())
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM photos WHERE path = ?1")?;
            for key in &missing {
                log::debug!("Removing missing photo {}", path_from_key(key).display());
                stmt.execute(params![key])?;
            }
        }
        tx.commit()?;
        Ok(missing.len() as u64)
    }
}

/// Raw OS bytes of a path, used as the row key
#[cfg(unix)]
fn path_key(path: &Path) -> Option<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Some(path.as_os_str().as_bytes().to_vec())
}

/// UTF-8 bytes of a path; paths that are not valid Unicode have no key
#[cfg(not(unix))]
fn path_key(path: &Path) -> Option<Vec<u8>> {
    path.to_str().map(|s| s.as_bytes().to_vec())
}

#[cfg(unix)]
fn path_from_key(key: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(key))
}

#[cfg(not(unix))]
fn path_from_key(key: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(key).into_owned())
}

fn photo_from_row(row: &Row<'_>) -> SqliteResult<GeotaggedPhoto> {
    Ok(GeotaggedPhoto {
        path: path_from_key(&row.get::<_, Vec<u8>>(0)?),
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        create_time: row.get(3)?,
    })
}
