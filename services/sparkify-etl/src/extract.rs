//!
//! src/extract.rs  Andrew Belles  Oct 19th, 2026
//!
//! Parses a single artifact into typed records. Song artifacts hold one
//! json object, event logs hold one json object per line. Nothing here
//! touches the destination.
//!

use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::EtlError;
use crate::types::{ArtistRecord, LogEvent, SongRecord};

#[derive(Debug, Deserialize)]
struct RawSong {
    song_id: String,
    title: String,
    artist_id: String,
    artist_name: String,
    artist_location: Option<String>,
    artist_latitude: Option<f64>,
    artist_longitude: Option<f64>,
    year: Option<i32>,
    duration: f64
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    page: Option<String>,
    #[serde(default, deserialize_with = "epoch_millis")]
    ts: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "string_or_number")]
    user_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    level: Option<String>,
    song: Option<String>,
    artist: Option<String>,
    length: Option<f64>,
    session_id: Option<i64>,
    location: Option<String>,
    user_agent: Option<String>
}

/// userId shows up as "39", 39, or "" for logged out sessions
fn string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        },
        Some(Value::Number(n)) => whole_number(&n).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("userId must be a whole number, got {n}"))
        }),
        Some(other) => Err(serde::de::Error::custom(
            format!("userId must be a string or number, got {other}")
        )),
    }
}

/// 8, 8.0 and "8" are the same user
fn whole_number(n: &serde_json::Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    let f = n.as_f64()?;
    let whole = f.is_finite() && f.fract() == 0.0
        && f >= i64::MIN as f64 && f < i64::MAX as f64;
    whole.then(|| (f as i64).to_string())
}

/// ts is epoch milliseconds, written as an integer or a float.
/// A value outside the representable range is treated as absent.
fn epoch_millis<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n,
        Some(other) => return Err(serde::de::Error::custom(
            format!("ts must be epoch milliseconds, got {other}")
        )),
    };

    if let Some(ms) = n.as_i64() {
        return Ok(DateTime::<Utc>::from_timestamp_millis(ms));
    }
    match n.as_f64() {
        Some(ms) if ms.is_finite() => {
            let secs  = (ms / 1000.0).floor();
            let nanos = ((ms - secs * 1000.0) * 1_000_000.0).round().min(999_999_999.0);
            if secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
                return Ok(None);
            }
            Ok(DateTime::<Utc>::from_timestamp(secs as i64, nanos as u32))
        },
        _ => Ok(None),
    }
}

impl From<RawEvent> for LogEvent {
    fn from(raw: RawEvent) -> Self {
        Self {
            page: raw.page.unwrap_or_default(),
            timestamp: raw.ts,
            user_id: raw.user_id,
            first_name: raw.first_name,
            last_name: raw.last_name,
            gender: raw.gender,
            level: raw.level,
            song: raw.song,
            artist: raw.artist,
            length: raw.length,
            session_id: raw.session_id,
            location: raw.location,
            user_agent: raw.user_agent
        }
    }
}

/// Parses the text of one song artifact. Exactly one json object is
/// accepted, anything after it is an error.
pub fn parse_song_record(text: &str) -> Result<(SongRecord, ArtistRecord), EtlError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(EtlError::Parse("song artifact must be a single json object".into()));
    }
    let raw: RawSong = serde_json::from_value(value)?;

    let song = SongRecord {
        song_id: raw.song_id,
        title: raw.title,
        artist_id: raw.artist_id.clone(),
        year: raw.year.unwrap_or(0),
        duration: raw.duration
    };
    let artist = ArtistRecord {
        artist_id: raw.artist_id,
        name: raw.artist_name,
        location: raw.artist_location,
        latitude: raw.artist_latitude,
        longitude: raw.artist_longitude
    };
    Ok((song, artist))
}

/// Parses json-lines text into events, preserving line order
pub fn parse_log_events(text: &str) -> Result<Vec<LogEvent>, EtlError> {
    let mut events = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawEvent = serde_json::from_str(line)
            .map_err(|e| EtlError::Parse(format!("line {}: {e}", i + 1)))?;
        events.push(LogEvent::from(raw));
    }
    Ok(events)
}

pub fn read_song_file(path: &Path) -> Result<(SongRecord, ArtistRecord), EtlError> {
    let text = fs::read_to_string(path)?;
    parse_song_record(&text)
        .map_err(|e| EtlError::Parse(format!("{}: {e}", path.display())))
}

pub fn read_log_file(path: &Path) -> Result<Vec<LogEvent>, EtlError> {
    let text = fs::read_to_string(path)?;
    parse_log_events(&text)
        .map_err(|e| EtlError::Parse(format!("{}: {e}", path.display())))
}
