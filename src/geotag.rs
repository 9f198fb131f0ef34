//! EXIF reading and per-file geotag classification

use chrono::{NaiveDate, NaiveTime};
use exif::{In, Tag, Value};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::ScanError;
use crate::models::{GeotaggedPhoto, PhotoOutcome};

/// Number of leading bytes read from each file. EXIF lives in the header
/// segments of the supported formats, so the rest of the file is never read.
pub const EXIF_HEADER_LEN: u64 = 65535;

/// Read at most [`EXIF_HEADER_LEN`] bytes from the start of a file
pub fn read_exif_header(path: &Path) -> Result<Vec<u8>, ScanError> {
    let file = File::open(path).map_err(|e| ScanError::from_io(e, path))?;
    let mut buffer = Vec::with_capacity(EXIF_HEADER_LEN as usize);
    file.take(EXIF_HEADER_LEN)
        .read_to_end(&mut buffer)
        .map_err(|e| ScanError::from_io(e, path))?;
    Ok(buffer)
}

/// Parse EXIF out of a header buffer (JPEG, TIFF, HEIF, PNG or WebP container)
pub fn parse_exif(header: &[u8], path: &Path) -> Result<exif::Exif, ScanError> {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(header))
        .map_err(|e| ScanError::exif_unreadable(path, e.to_string()))
}

/// Read and parse the EXIF metadata of a photo
pub fn read_photo_exif(path: &Path) -> Result<exif::Exif, ScanError> {
    let header = read_exif_header(path)?;
    parse_exif(&header, path)
}

/// Extract GPS coordinates from EXIF data as (latitude, longitude)
pub fn extract_coordinates(exif_data: &exif::Exif) -> Option<(f64, f64)> {
    let lat_field = exif_data.get_field(Tag::GPSLatitude, In::PRIMARY)?;
    let lon_field = exif_data.get_field(Tag::GPSLongitude, In::PRIMARY)?;

    let mut lat = parse_gps_coordinate(&lat_field.value)?;
    let mut lon = parse_gps_coordinate(&lon_field.value)?;

    if reference_is(exif_data, Tag::GPSLatitudeRef, b'S') {
        lat = -lat;
    }
    if reference_is(exif_data, Tag::GPSLongitudeRef, b'W') {
        lon = -lon;
    }

    Some((lat, lon))
}

/// Parse a GPS coordinate magnitude from degree/minute/second rationals.
/// Trailing components may be missing.
fn parse_gps_coordinate(value: &Value) -> Option<f64> {
    const WEIGHTS: [f64; 3] = [1.0, 60.0, 3600.0];

    let Value::Rational(rats) = value else {
        return None;
    };
    if rats.is_empty() || rats.iter().take(3).any(|r| r.denom == 0) {
        return None;
    }

    let degrees = rats
        .iter()
        .zip(WEIGHTS)
        .map(|(r, weight)| r.to_f64() / weight)
        .sum::<f64>();
    degrees.is_finite().then_some(degrees)
}

fn reference_is(exif_data: &exif::Exif, tag: Tag, expected: u8) -> bool {
    match exif_data.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(values)) => values
            .first()
            .and_then(|v| v.first())
            .is_some_and(|c| c.eq_ignore_ascii_case(&expected)),
        _ => false,
    }
}

/// Extract DateTimeOriginal as a Unix timestamp.
///
/// EXIF stores local wall-clock time without a zone; it is read as UTC.
pub fn extract_create_time(exif_data: &exif::Exif) -> Option<i64> {
    let field = exif_data.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(values.first()?).ok()?;
    let date = NaiveDate::from_ymd_opt(dt.year as i32, dt.month as u32, dt.day as u32)?;
    let time = NaiveTime::from_hms_opt(dt.hour as u32, dt.minute as u32, dt.second as u32)?;
    Some(date.and_time(time).and_utc().timestamp())
}

/// Classify a single file. Never fails: read and parse errors become
/// [`PhotoOutcome::Unreadable`].
pub fn classify_photo(path: &Path) -> PhotoOutcome {
    log::debug!("Reading EXIF from {}", path.display());

    let exif_data = match read_photo_exif(path) {
        Ok(exif_data) => exif_data,
        Err(e) => return PhotoOutcome::Unreadable(e),
    };

    match extract_coordinates(&exif_data) {
        Some((latitude, longitude)) => {
            let create_time = extract_create_time(&exif_data).unwrap_or(0);
            PhotoOutcome::Geotagged(GeotaggedPhoto::new(
                path.to_path_buf(),
                latitude,
                longitude,
                create_time,
            ))
        }
        None => PhotoOutcome::NotGeotagged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanErrorKind;
    use crate::test_support::{assert_close, jpeg_without_exif, ExifFixture};
    use tempfile::TempDir;

    #[test]
    fn test_reads_coordinates_and_time() {
        let dir = TempDir::new().unwrap();
        let path = ExifFixture::geotagged(46.585755679985255, -112.01842411999628)
            .taken_at("2017:08:22 17:40:38")
            .write_to(&dir.path().join("image_with_exif.jpg"));

        let exif_data = read_photo_exif(&path).unwrap();
        let (lat, lon) = extract_coordinates(&exif_data).unwrap();

        assert_close(lat, 46.585755679985255);
        assert_close(lon, -112.01842411999628);
        assert_eq!(extract_create_time(&exif_data), Some(1503423638));
    }

    #[test]
    fn test_classify_geotagged_photo() {
        let dir = TempDir::new().unwrap();
        let path = ExifFixture::geotagged(-33.8567844, 151.213108)
            .taken_at("2017:08:20 16:48:54")
            .write_to(&dir.path().join("opera.jpg"));

        let photo = classify_photo(&path).into_photo().unwrap();
        assert_eq!(photo.path, path);
        assert_close(photo.latitude, -33.8567844);
        assert_close(photo.longitude, 151.213108);
        assert_eq!(photo.create_time, 1503247734);
    }

    #[test]
    fn test_missing_date_gives_zero_create_time() {
        let dir = TempDir::new().unwrap();
        let path = ExifFixture::geotagged(10.0, 20.0).write_to(&dir.path().join("undated.jpg"));

        let photo = classify_photo(&path).into_photo().unwrap();
        assert_eq!(photo.create_time, 0);
        assert!(!photo.has_create_time());
    }

    #[test]
    fn test_equator_photo_is_geotagged() {
        let dir = TempDir::new().unwrap();
        let path = ExifFixture::geotagged(0.0, 0.0).write_to(&dir.path().join("null_island.jpg"));

        assert!(matches!(classify_photo(&path), PhotoOutcome::Geotagged(_)));
    }

    #[test]
    fn test_photo_without_gps_is_not_geotagged() {
        let dir = TempDir::new().unwrap();
        let path = ExifFixture::without_gps()
            .taken_at("2017:08:22 17:40:38")
            .write_to(&dir.path().join("image_without_geotags.jpg"));

        assert!(matches!(classify_photo(&path), PhotoOutcome::NotGeotagged));
    }

    #[test]
    fn test_latitude_only_is_not_geotagged() {
        let dir = TempDir::new().unwrap();
        let fixture = ExifFixture {
            latitude: Some(12.5),
            longitude: None,
            date_time_original: None,
        };
        let path = fixture.write_to(&dir.path().join("half.jpg"));

        assert!(matches!(classify_photo(&path), PhotoOutcome::NotGeotagged));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        match classify_photo(Path::new("abcd")) {
            PhotoOutcome::Unreadable(e) => {
                assert_eq!(e.kind, ScanErrorKind::NotFound);
                assert_eq!(e.path.as_deref(), Some(Path::new("abcd")));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_unreadable() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            classify_photo(dir.path()),
            PhotoOutcome::Unreadable(_)
        ));
    }

    #[test]
    fn test_file_without_exif_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("file_without_exif");
        std::fs::write(&text, b"just some text").unwrap();
        let jpeg = dir.path().join("image_without_exif.jpg");
        std::fs::write(&jpeg, jpeg_without_exif()).unwrap();

        for path in [text, jpeg] {
            match classify_photo(&path) {
                PhotoOutcome::Unreadable(e) => assert_eq!(e.kind, ScanErrorKind::ExifUnreadable),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    #[test]
    fn test_header_read_is_bounded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 200_000]).unwrap();

        let header = read_exif_header(&path).unwrap();
        assert_eq!(header.len() as u64, EXIF_HEADER_LEN);
    }

    #[test]
    fn test_exif_past_header_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let tagged = ExifFixture::geotagged(1.0, 2.0).to_jpeg();

        // Push the EXIF segment past the header with a maximum-size APP0 segment
        let mut padded = vec![0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xFF];
        padded.extend(std::iter::repeat(0u8).take(0xFFFF - 2));
        padded.extend_from_slice(&tagged[2..]);
        let path = dir.path().join("padded.jpg");
        std::fs::write(&path, &padded).unwrap();

        assert!(matches!(
            classify_photo(&path),
            PhotoOutcome::Unreadable(_)
        ));
    }

    #[test]
    fn test_parse_gps_coordinate_rejects_bad_rationals() {
        let zero_denominator = Value::Rational(vec![exif::Rational { num: 1, denom: 0 }]);
        assert_eq!(parse_gps_coordinate(&zero_denominator), None);
        assert_eq!(parse_gps_coordinate(&Value::Rational(vec![])), None);
        assert_eq!(parse_gps_coordinate(&Value::Ascii(vec![b"12".to_vec()])), None);

        let degrees_only = Value::Rational(vec![exif::Rational { num: 45, denom: 2 }]);
        assert_eq!(parse_gps_coordinate(&degrees_only), Some(22.5));
    }
}
