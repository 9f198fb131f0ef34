//! EXIF fixture builders shared by unit tests

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Describes the EXIF block of a generated JPEG
#[derive(Debug, Clone, Default)]
pub struct ExifFixture {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_time_original: Option<&'static str>,
}

impl ExifFixture {
    pub fn geotagged(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            date_time_original: None,
        }
    }

    pub fn without_gps() -> Self {
        Self::default()
    }

    /// Set DateTimeOriginal, formatted `YYYY:MM:DD HH:MM:SS`
    pub fn taken_at(mut self, date_time: &'static str) -> Self {
        self.date_time_original = Some(date_time);
        self
    }

    /// Encode a minimal JPEG: SOI, an APP1 EXIF segment, EOI
    pub fn to_jpeg(&self) -> Vec<u8> {
        let mut fields = vec![ascii_field(Tag::Make, "photo_geotagger")];
        if let Some(lat) = self.latitude {
            fields.push(ascii_field(Tag::GPSLatitudeRef, if lat < 0.0 { "S" } else { "N" }));
            fields.push(dms_field(Tag::GPSLatitude, lat));
        }
        if let Some(lon) = self.longitude {
            fields.push(ascii_field(Tag::GPSLongitudeRef, if lon < 0.0 { "W" } else { "E" }));
            fields.push(dms_field(Tag::GPSLongitude, lon));
        }
        if let Some(taken) = self.date_time_original {
            fields.push(ascii_field(Tag::DateTimeOriginal, taken));
        }

        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).expect("encode EXIF fixture");
        let tiff = tiff.into_inner();

        let segment_len = u16::try_from(2 + 6 + tiff.len()).expect("EXIF fixture too large");
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    /// Write the JPEG to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(path, self.to_jpeg()).expect("write fixture");
        path.to_path_buf()
    }
}

/// A JPEG with no APP1 segment at all
pub fn jpeg_without_exif() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xD9]
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn ascii_field(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

/// Split decimal degrees into degree, minute and second rationals
fn dms_field(tag: Tag, value: f64) -> Field {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes_full = (value - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;

    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational { num: degrees as u32, denom: 1 },
            Rational { num: minutes as u32, denom: 1 },
            Rational { num: (seconds * 1e7).round() as u32, denom: 10_000_000 },
        ]),
    }
}
