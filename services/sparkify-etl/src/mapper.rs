//!
//! src/mapper.rs  Andrew Belles  Oct 19th, 2026
//!
//! Converts extracted records into the exact column tuples each
//! destination table binds by position
//!

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::errors::EtlError;
use crate::types::*;
use crate::warehouse::SongLookup;

/// The only page type that produces a song play
pub const NEXT_SONG: &str = "NextSong";

pub fn map_song(song: &SongRecord) -> SongRow {
    (
        song.song_id.clone(),
        song.title.clone(),
        song.artist_id.clone(),
        song.year,
        song.duration
    )
}

pub fn map_artist(artist: &ArtistRecord) -> ArtistRow {
    (
        artist.artist_id.clone(),
        artist.name.clone(),
        artist.location.clone(),
        artist.latitude,
        artist.longitude
    )
}

pub fn is_play_event(event: &LogEvent) -> bool {
    event.page == NEXT_SONG
}

/// Keeps load-eligible events, relative order is untouched
pub fn filter_play_events(events: Vec<LogEvent>) -> Vec<LogEvent> {
    events.into_iter().filter(is_play_event).collect()
}

/// Calendar parts in UTC. week is the ISO week, weekday counts Monday as 0.
pub fn derive_time(ts: DateTime<Utc>) -> TimeRecord {
    TimeRecord {
        start_time: ts,
        hour: ts.hour(),
        day: ts.day(),
        week: ts.iso_week().week(),
        month: ts.month(),
        year: ts.year(),
        weekday: ts.weekday().num_days_from_monday()
    }
}

fn required_timestamp(event: &LogEvent) -> Result<DateTime<Utc>, EtlError> {
    event.timestamp.ok_or_else(|| EtlError::Mapping(
        format!("{} event without a timestamp", event.page)
    ))
}

fn required_user(event: &LogEvent) -> Result<String, EtlError> {
    event.user_id.clone().ok_or_else(|| EtlError::Mapping(
        format!("{} event without a user id", event.page)
    ))
}

/// Time row for one event, a missing ts is a mapping error
pub fn map_time(event: &LogEvent) -> Result<TimeRow, EtlError> {
    Ok( derive_time(required_timestamp(event)?).row() )
}

pub fn map_user(event: &LogEvent) -> Result<UserRow, EtlError> {
    let user = UserRecord {
        user_id: required_user(event)?,
        first_name: event.first_name.clone(),
        last_name: event.last_name.clone(),
        gender: event.gender.clone(),
        level: event.level.clone()
    };
    Ok( user.row() )
}

/// Builds the fact row. song/artist ids come from the lookup and are left
/// empty when it has no match or the event lacks the song triple.
pub async fn resolve_song_play<L>(event: &LogEvent, lookup: &mut L) ->
    Result<SongPlayRecord, EtlError>
where
    L: SongLookup + Send + ?Sized,
{
    let start_time = required_timestamp(event)?;
    let user_id    = required_user(event)?;

    let resolved = match (&event.song, &event.artist, event.length) {
        (Some(song), Some(artist), Some(length)) =>
            lookup.lookup_song_and_artist(song, artist, length).await?,
        _ => None,
    };
    let (song_id, artist_id) = resolved.unzip();

    Ok(SongPlayRecord {
        start_time,
        user_id,
        level: event.level.clone(),
        song_id,
        artist_id,
        session_id: event.session_id,
        location: event.location.clone(),
        user_agent: event.user_agent.clone()
    })
}
