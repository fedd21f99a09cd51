//!
//! src/driver.rs  Andrew Belles  Oct 19th, 2026
//!
//! Walks a data root and pushes every artifact through its
//! extract + map pair into the warehouse, one commit per artifact
//!
//!

use std::path::Path;

use async_trait::async_trait;
use tracing::{Instrument, debug, error, warn};

use crate::config::EtlConfig;
use crate::errors::EtlError;
use crate::extract::{read_log_file, read_song_file};
use crate::mapper::{filter_play_events, map_artist, map_song, map_time, map_user, resolve_song_play};
use crate::types::LogEvent;
use crate::walker::discover;
use crate::warehouse::Warehouse;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub inserted: usize,    // rows handed to the warehouse
    pub skipped: usize      // load-eligible rows dropped by mapping errors
}

/// Extract + map pair for one kind of artifact
#[async_trait]
pub trait ArtifactLoader: Sync {
    fn name(&self) -> &'static str;

    async fn load<W: Warehouse>(&self, path: &Path, warehouse: &mut W) ->
        Result<LoadStats, EtlError>;
}

pub struct SongFileLoader;

#[async_trait]
impl ArtifactLoader for SongFileLoader {
    fn name(&self) -> &'static str { "song" }

    async fn load<W: Warehouse>(&self, path: &Path, warehouse: &mut W) ->
        Result<LoadStats, EtlError> {
        // parse fully before the first insert
        let (song, artist) = read_song_file(path)?;

        warehouse.insert_song(&map_song(&song)).await?;
        warehouse.insert_artist(&map_artist(&artist)).await?;

        Ok( LoadStats { inserted: 2, skipped: 0 } )
    }
}

pub struct LogFileLoader;

impl LogFileLoader {
    /// All three rows of one event are mapped before any is inserted,
    /// so a mapping error leaves nothing behind for that event
    async fn load_event<W: Warehouse>(event: &LogEvent, warehouse: &mut W) ->
        Result<usize, EtlError> {
        let time = map_time(event)?;
        let user = map_user(event)?;
        let play = resolve_song_play(event, &mut *warehouse).await?;

        warehouse.insert_time(&time).await?;
        warehouse.insert_user(&user).await?;
        warehouse.insert_song_play(&play.row()).await?;
        Ok(3)
    }
}

#[async_trait]
impl ArtifactLoader for LogFileLoader {
    fn name(&self) -> &'static str { "log" }

    async fn load<W: Warehouse>(&self, path: &Path, warehouse: &mut W) ->
        Result<LoadStats, EtlError> {
        let events = filter_play_events(read_log_file(path)?);
        let mut stats = LoadStats::default();

        for (i, event) in events.iter().enumerate() {
            match Self::load_event(event, &mut *warehouse).await {
                Ok(rows) => stats.inserted += rows,
                Err(EtlError::Mapping(msg)) => {
                    warn!(event = i, reason = %msg, "driver.row_skipped");
                    stats.skipped += 1;
                },
                Err(e) => return Err(e),
            }
        }
        Ok(stats)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub extension: String,
    pub fail_fast: bool
}

impl From<&EtlConfig> for ProcessOptions {
    fn from(cfg: &EtlConfig) -> Self {
        Self { extension: cfg.extension.clone(), fail_fast: cfg.fail_fast }
    }
}

/// Loads every artifact under root, returning how many loaded cleanly.
///
/// Every artifact gets exactly one commit, including failed ones, so rows
/// inserted before a storage failure stay in the destination. A parse
/// failure inserts nothing. Storage failures end the run only with
/// fail_fast set.
pub async fn process<L, W>(
    root: &Path,
    loader: &L,
    warehouse: &mut W,
    opts: &ProcessOptions
) -> Result<usize, EtlError>
where
    L: ArtifactLoader,
    W: Warehouse,
{
    let files = discover(root, &opts.extension);
    let total = files.len();
    println!("{} files found in {}", total, root.display());

    let mut loaded = 0;
    for (i, path) in files.iter().enumerate() {
        let span = tracing::debug_span!("artifact", kind = loader.name(), path = %path.display());

        let outcome = match loader.load(path, &mut *warehouse).instrument(span).await {
            Ok(stats) => warehouse.commit().await.map(|()| stats),
            Err(e) => {
                if let Err(commit_err) = warehouse.commit().await {
                    warn!(path = %path.display(), error = %commit_err, "driver.commit_failed");
                }
                Err(e)
            }
        };

        match outcome {
            Ok(stats) => {
                loaded += 1;
                debug!(
                    path = %path.display(),
                    inserted = stats.inserted,
                    skipped = stats.skipped,
                    "driver.artifact_loaded"
                );
            },
            Err(e) if e.is_storage() && opts.fail_fast => {
                error!(path = %path.display(), error = %e, "driver.abort");
                return Err(e);
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "driver.artifact_failed");
            }
        }

        println!("{}/{} files processed.", i + 1, total);
    }

    Ok(loaded)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub songs: usize,
    pub logs: usize
}

/// Song root first so song plays can resolve against loaded songs
pub async fn run<W: Warehouse>(cfg: &EtlConfig, warehouse: &mut W) ->
    Result<RunSummary, EtlError> {
    let opts  = ProcessOptions::from(cfg);
    let songs = process(&cfg.song_data_root, &SongFileLoader, &mut *warehouse, &opts).await?;
    let logs  = process(&cfg.log_data_root, &LogFileLoader, warehouse, &opts).await?;
    Ok( RunSummary { songs, logs } )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    use crate::types::*;
    use crate::warehouse::{SongLookup, SqliteWarehouse};
    use super::*;

    const SONG_A: &str = r#"{"song_id":"S1","title":"T1","artist_id":"AR1","artist_name":"Artist1","artist_location":"LOC","artist_latitude":1.0,"artist_longitude":2.0,"year":2000,"duration":200.5}"#;

    const NEXT_SONG: &str = r#"{"artist":"Artist1","auth":"Logged In","firstName":"Ava","gender":"F","lastName":"Robinson","length":200.5,"level":"free","location":"New Haven-Milford, CT","page":"NextSong","sessionId":56,"song":"T1","ts":1541106106796,"userAgent":"Mozilla/5.0","userId":"50"}"#;

    const LOGIN: &str = r#"{"artist":null,"auth":"Logged In","firstName":"Ava","gender":"F","lastName":"Robinson","length":null,"level":"free","location":"New Haven-Milford, CT","page":"Login","sessionId":56,"song":null,"ts":1541106000000,"userAgent":"Mozilla/5.0","userId":"50"}"#;

    const NO_USER: &str = r#"{"artist":"Artist1","length":200.5,"level":"free","page":"NextSong","sessionId":57,"song":"T1","ts":1541106206796,"userId":""}"#;

    #[derive(Default)]
    struct Recorder {
        songs: Vec<SongRow>,
        artists: Vec<ArtistRow>,
        times: Vec<TimeRow>,
        users: Vec<UserRow>,
        plays: Vec<SongPlayRow>,
        commits: usize,
        catalog: HashMap<(String, String), (String, String)>,
        reject_plays: bool
    }

    impl Recorder {
        fn inserts(&self) -> usize {
            self.songs.len() + self.artists.len() + self.times.len()
                + self.users.len() + self.plays.len()
        }
    }

    #[async_trait]
    impl SongLookup for Recorder {
        async fn lookup_song_and_artist(&mut self, title: &str, artist: &str, _: f64) ->
            Result<Option<(String, String)>, EtlError> {
            Ok(self.catalog.get(&(title.to_string(), artist.to_string())).cloned())
        }
    }

    #[async_trait]
    impl Warehouse for Recorder {
        async fn insert_song(&mut self, row: &SongRow) -> Result<(), EtlError> {
            self.songs.push(row.clone());
            Ok(())
        }
        async fn insert_artist(&mut self, row: &ArtistRow) -> Result<(), EtlError> {
            self.artists.push(row.clone());
            Ok(())
        }
        async fn insert_time(&mut self, row: &TimeRow) -> Result<(), EtlError> {
            self.times.push(*row);
            Ok(())
        }
        async fn insert_user(&mut self, row: &UserRow) -> Result<(), EtlError> {
            self.users.push(row.clone());
            Ok(())
        }
        async fn insert_song_play(&mut self, row: &SongPlayRow) -> Result<(), EtlError> {
            if self.reject_plays {
                return Err(EtlError::Db("songplays is read-only".into()));
            }
            self.plays.push(row.clone());
            Ok(())
        }
        async fn commit(&mut self) -> Result<(), EtlError> {
            self.commits += 1;
            Ok(())
        }
    }

    fn opts() -> ProcessOptions {
        ProcessOptions { extension: "json".into(), fail_fast: false }
    }

    fn write(root: &Path, rel: &str, body: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn song_artifact_inserts_one_song_and_one_artist() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A/A/A/TRAAAAW128F429D538.json", SONG_A);

        let mut rec = Recorder::default();
        let count = process(dir.path(), &SongFileLoader, &mut rec, &opts()).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(rec.songs, vec![
            ("S1".to_string(), "T1".to_string(), "AR1".to_string(), 2000, 200.5)
        ]);
        assert_eq!(rec.artists, vec![
            ("AR1".to_string(), "Artist1".to_string(), Some("LOC".to_string()), Some(1.0), Some(2.0))
        ]);
        assert_eq!(rec.commits, 1);
    }

    #[tokio::test]
    async fn only_next_song_lines_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "2018/11/2018-11-01-events.json", &format!("{NEXT_SONG}\n{LOGIN}\n"));

        let mut rec = Recorder::default();
        let count = process(dir.path(), &LogFileLoader, &mut rec, &opts()).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(rec.users.len(), 1);
        assert_eq!(rec.times.len(), 1);
        assert_eq!(rec.plays.len(), 1);
        assert_eq!(rec.commits, 1);

        let play = &rec.plays[0];
        assert_eq!(play.1, "50");
        assert_eq!((play.3.clone(), play.4.clone()), (None, None));
        assert_eq!(rec.times[0].0.timestamp_millis(), 1541106106796);
    }

    #[tokio::test]
    async fn lookup_hits_flow_into_the_fact_row() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "events.json", NEXT_SONG);

        let mut rec = Recorder::default();
        rec.catalog.insert(("T1".into(), "Artist1".into()), ("S1".into(), "AR1".into()));
        process(dir.path(), &LogFileLoader, &mut rec, &opts()).await.unwrap();

        assert_eq!(rec.plays[0].3.as_deref(), Some("S1"));
        assert_eq!(rec.plays[0].4.as_deref(), Some("AR1"));
    }

    #[tokio::test]
    async fn empty_root_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "readme.txt", "not an artifact");

        let mut rec = Recorder::default();
        let count = process(dir.path(), &SongFileLoader, &mut rec, &opts()).await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(rec.inserts(), 0);
        assert_eq!(rec.commits, 0);
    }

    #[tokio::test]
    async fn one_commit_per_artifact() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/one.json", NEXT_SONG);
        write(dir.path(), "a/two.json", &format!("{NEXT_SONG}\n{NEXT_SONG}\n{NEXT_SONG}"));
        write(dir.path(), "b/three.json", LOGIN);

        let mut rec = Recorder::default();
        let count = process(dir.path(), &LogFileLoader, &mut rec, &opts()).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(rec.commits, 3);
        assert_eq!(rec.plays.len(), 4);
        assert_eq!(rec.users.len(), 4);
    }

    #[tokio::test]
    async fn parse_failure_only_drops_its_artifact() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.json", SONG_A);
        write(dir.path(), "bad.json", "{\"song_id\": ");

        let mut rec = Recorder::default();
        let count = process(dir.path(), &SongFileLoader, &mut rec, &opts()).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(rec.songs.len(), 1);
        assert_eq!(rec.commits, 2);
    }

    #[tokio::test]
    async fn rows_missing_a_user_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "events.json", &format!("{NEXT_SONG}\n{NO_USER}\n{NEXT_SONG}"));

        let mut rec = Recorder::default();
        let stats = LogFileLoader.load(&dir.path().join("events.json"), &mut rec).await.unwrap();

        assert_eq!(stats, LoadStats { inserted: 6, skipped: 1 });
        assert_eq!(rec.times.len(), 2);
        assert_eq!(rec.users.len(), 2);
        assert_eq!(rec.plays.len(), 2);
    }

    #[tokio::test]
    async fn storage_failures_continue_unless_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "one.json", NEXT_SONG);
        write(dir.path(), "two.json", NEXT_SONG);

        let mut rec = Recorder { reject_plays: true, ..Default::default() };
        let count = process(dir.path(), &LogFileLoader, &mut rec, &opts()).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(rec.commits, 2);
        // rows before the failure are kept
        assert_eq!(rec.users.len(), 2);

        let strict = ProcessOptions { fail_fast: true, ..opts() };
        let mut rec = Recorder { reject_plays: true, ..Default::default() };
        let result = process(dir.path(), &LogFileLoader, &mut rec, &strict).await;
        assert!(matches!(result, Err(EtlError::Db(_))));
        assert_eq!(rec.commits, 1);
    }

    #[tokio::test]
    async fn run_loads_songs_then_resolves_plays() {
        let dir = tempfile::tempdir().unwrap();
        let song_root = dir.path().join("song_data");
        let log_root  = dir.path().join("log_data");
        write(&song_root, "A/B/C/song.json", SONG_A);
        write(&log_root, "2018/11/events.json", &format!("{LOGIN}\n{NEXT_SONG}\n"));

        let cfg = EtlConfig {
            song_data_root: song_root,
            log_data_root: log_root,
            destination: "sqlite::memory:".into(),
            ..EtlConfig::default()
        };
        let mut wh = SqliteWarehouse::connect(&cfg.destination).await.unwrap();
        let summary = run(&cfg, &mut wh).await.unwrap();

        assert_eq!(summary, RunSummary { songs: 1, logs: 1 });
        assert_eq!(wh.count_rows("songs").await.unwrap(), 1);
        assert_eq!(wh.count_rows("artists").await.unwrap(), 1);
        assert_eq!(wh.count_rows("users").await.unwrap(), 1);
        assert_eq!(wh.count_rows("time").await.unwrap(), 1);
        assert_eq!(wh.count_rows("songplays").await.unwrap(), 1);
        assert_eq!(wh.count_resolved_song_plays().await.unwrap(), 1);
    }
}
