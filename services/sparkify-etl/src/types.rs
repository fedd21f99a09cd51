use chrono::{DateTime, Utc};

// Row tuples, element order is the positional bind order of each insert

/// (song_id, title, artist_id, year, duration)
pub type SongRow = (String, String, String, i32, f64);

/// (artist_id, name, location, latitude, longitude)
pub type ArtistRow = (String, String, Option<String>, Option<f64>, Option<f64>);

/// (start_time, hour, day, week, month, year, weekday)
pub type TimeRow = (DateTime<Utc>, u32, u32, u32, u32, i32, u32);

/// (user_id, first_name, last_name, gender, level)
pub type UserRow = (String, Option<String>, Option<String>, Option<String>, Option<String>);

/// (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
pub type SongPlayRow = (
    DateTime<Utc>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>
);

#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,              // 0 when unknown
    pub duration: f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>
}

/// One line of an event log, ts already converted from epoch millis
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub page: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRecord {
    pub start_time: DateTime<Utc>,
    pub hour: u32,
    pub day: u32,
    pub week: u32,              // ISO 8601
    pub month: u32,
    pub year: i32,
    pub weekday: u32            // Monday = 0
}

impl TimeRecord {
    pub fn row(&self) -> TimeRow {
        (self.start_time, self.hour, self.day, self.week, self.month, self.year, self.weekday)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>
}

impl UserRecord {
    pub fn row(&self) -> UserRow {
        (
            self.user_id.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.gender.clone(),
            self.level.clone()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongPlayRecord {
    pub start_time: DateTime<Utc>,
    pub user_id: String,
    pub level: Option<String>,
    pub song_id: Option<String>,    // None on lookup miss
    pub artist_id: Option<String>,  // None on lookup miss
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>
}

impl SongPlayRecord {
    pub fn row(&self) -> SongPlayRow {
        (
            self.start_time,
            self.user_id.clone(),
            self.level.clone(),
            self.song_id.clone(),
            self.artist_id.clone(),
            self.session_id,
            self.location.clone(),
            self.user_agent.clone()
        )
    }
}
