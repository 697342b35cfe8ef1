//! Best-effort capture time for a photo.
//!
//! EXIF date fields first, then filesystem modification time, then nothing.
//! Every failure downgrades to the next strategy; nothing here returns an error.

use crate::types::TimestampSource;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const EXIF_DATETIME_TAGS: [Tag; 3] = [
    Tag::DateTimeOriginal,
    Tag::DateTimeDigitized,
    Tag::DateTime,
];
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Resolve the capture time of `path` and where it came from.
pub fn resolve(path: &Path) -> (Option<String>, TimestampSource) {
    if let Some(taken_at) = read_exif_timestamp(path) {
        return (Some(taken_at), TimestampSource::Exif);
    }
    match modified_timestamp(path) {
        Some(modified) => (Some(modified), TimestampSource::FileModified),
        None => (None, TimestampSource::Unknown),
    }
}

fn read_exif_timestamp(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "no readable EXIF");
            return None;
        }
    };

    select_timestamp(&exif)
}

/// First date field that parses, in `EXIF_DATETIME_TAGS` order.
fn select_timestamp(exif: &Exif) -> Option<String> {
    EXIF_DATETIME_TAGS.iter().find_map(|&tag| {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let raw = ascii_value(&field.value)?;
        parse_exif_datetime(&raw)
    })
}

fn ascii_value(value: &Value) -> Option<String> {
    let Value::Ascii(parts) = value else {
        return None;
    };
    let bytes = parts.first()?;
    let text = std::str::from_utf8(bytes).ok()?;
    let text = text.trim_end_matches('\0').trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` value into `YYYY-MM-DDTHH:MM:SS`.
fn parse_exif_datetime(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw, EXIF_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn modified_timestamp(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(format_utc(DateTime::<Utc>::from(modified)))
}

fn format_utc(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Current UTC time in the same format as file-modified timestamps.
pub fn now_utc() -> String {
    format_utc(Utc::now())
}
