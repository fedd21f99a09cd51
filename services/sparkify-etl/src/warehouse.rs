//!
//! src/warehouse.rs  Andrew Belles  Oct 19th, 2026
//!
//! Defines the storage capabilities the loader consumes and the sqlite
//! star schema backing them. Rows are written inside a unit of work
//! that stays open until commit() is called by the driver.
//!

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Pool, Sqlite, Transaction};

use crate::errors::EtlError;
use crate::types::{ArtistRow, SongPlayRow, SongRow, TimeRow, UserRow};

/// Tables of the star schema
pub const TABLES: [&str; 5] = ["songplays", "users", "songs", "artists", "time"];

#[async_trait]
pub trait SongLookup: Send {
    /// (song_id, artist_id) of the song matching title, artist name and
    /// duration exactly, None when nothing matches
    async fn lookup_song_and_artist(&mut self, title: &str, artist: &str, duration: f64) ->
        Result<Option<(String, String)>, EtlError>;
}

///
/// Row-insert capability of the destination. Inserts bind by position, see
/// the row aliases in types.rs for column order.
///
/// users: upsert on user_id, the last written level wins
/// songs, artists, time: repeated keys are ignored
/// songplays: append only
///
#[async_trait]
pub trait Warehouse: SongLookup {
    async fn insert_song(&mut self, row: &SongRow) -> Result<(), EtlError>;
    async fn insert_artist(&mut self, row: &ArtistRow) -> Result<(), EtlError>;
    async fn insert_time(&mut self, row: &TimeRow) -> Result<(), EtlError>;
    async fn insert_user(&mut self, row: &UserRow) -> Result<(), EtlError>;
    async fn insert_song_play(&mut self, row: &SongPlayRow) -> Result<(), EtlError>;
    /// Closes the current unit of work, a no-op when nothing is open
    async fn commit(&mut self) -> Result<(), EtlError>;
}

pub struct SqliteWarehouse {
    pool: Pool<Sqlite>,
    tx: Option<Transaction<'static, Sqlite>>
}

impl SqliteWarehouse {

    async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), EtlError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS songplays (
              songplay_id   INTEGER PRIMARY KEY AUTOINCREMENT,
              start_time    TEXT NOT NULL,
              user_id       TEXT NOT NULL,
              level         TEXT,
              song_id       TEXT,
              artist_id     TEXT,
              session_id    INTEGER,
              location      TEXT,
              user_agent    TEXT
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
              user_id       TEXT PRIMARY KEY,
              first_name    TEXT,
              last_name     TEXT,
              gender        TEXT,
              level         TEXT
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS songs (
              song_id       TEXT PRIMARY KEY,
              title         TEXT NOT NULL,
              artist_id     TEXT NOT NULL,
              year          INTEGER NOT NULL DEFAULT 0,
              duration      REAL NOT NULL
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS artists (
              artist_id     TEXT PRIMARY KEY,
              name          TEXT NOT NULL,
              location      TEXT,
              latitude      REAL,
              longitude     REAL
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS time (
              start_time    TEXT PRIMARY KEY,
              hour          INTEGER NOT NULL,
              day           INTEGER NOT NULL,
              week          INTEGER NOT NULL,
              month         INTEGER NOT NULL,
              year          INTEGER NOT NULL,
              weekday       INTEGER NOT NULL
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title, duration);"
        ).execute(pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name);"
        ).execute(pool).await?;

        Ok(())
    }

    pub async fn connect(database_url: &str) -> Result<Self, EtlError> {
        let is_memory = database_url.starts_with("sqlite::memory:");

        let mut opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true);

        // WAL is file-only
        if !is_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                       .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        // an in-memory database lives and dies with its one connection
        let mut pool_opts = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(if is_memory {1} else {4});
        if is_memory {
            pool_opts = pool_opts.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_opts.connect_with(opts).await?;

        Self::ensure_schema(&pool).await?;
        tracing::debug!(url = %database_url, "warehouse.connected");

        Ok(Self { pool, tx: None })
    }

    /// Current unit of work, opened on first use
    async fn unit_of_work(&mut self) -> Result<&mut Transaction<'static, Sqlite>, EtlError> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await?);
        }
        self.tx.as_mut().ok_or_else(|| EtlError::Db("unit of work not open".into()))
    }

    pub async fn count_rows(&mut self, table: &str) -> Result<i64, EtlError> {
        if !TABLES.contains(&table) {
            return Err(EtlError::Db(format!("unknown table {table}")));
        }
        let sql = format!("SELECT COUNT(*) FROM {table};");
        let tx = self.unit_of_work().await?;
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut **tx)
            .await?;
        Ok(count)
    }

    #[cfg(test)]
    pub async fn user_level(&mut self, user_id: &str) -> Result<Option<String>, EtlError> {
        let tx = self.unit_of_work().await?;
        let level: Option<Option<String>> = sqlx::query_scalar(
            "SELECT level FROM users WHERE user_id = ?1;"
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(level.flatten())
    }

    /// Song plays whose song and artist were resolved at load time
    pub async fn count_resolved_song_plays(&mut self) -> Result<i64, EtlError> {
        let tx = self.unit_of_work().await?;
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM songplays WHERE song_id IS NOT NULL AND artist_id IS NOT NULL;"
        )
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    pub async fn close(mut self) -> Result<(), EtlError> {
        self.commit().await?;
        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl SongLookup for SqliteWarehouse {
    async fn lookup_song_and_artist(&mut self, title: &str, artist: &str, duration: f64) ->
        Result<Option<(String, String)>, EtlError> {
        let tx = self.unit_of_work().await?;
        let row: Option<(String, String)> = sqlx::query_as(
            r"
            SELECT s.song_id, a.artist_id
              FROM songs s
              JOIN artists a ON s.artist_id = a.artist_id
             WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3
             LIMIT 1;
            "
        )
        .bind(title)
        .bind(artist)
        .bind(duration)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn insert_song(&mut self, row: &SongRow) -> Result<(), EtlError> {
        let tx = self.unit_of_work().await?;
        sqlx::query(
            r"
            INSERT INTO songs (song_id, title, artist_id, year, duration)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(song_id) DO NOTHING;
            "
        )
        .bind(&row.0)
        .bind(&row.1)
        .bind(&row.2)
        .bind(row.3)
        .bind(row.4)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_artist(&mut self, row: &ArtistRow) -> Result<(), EtlError> {
        let tx = self.unit_of_work().await?;
        sqlx::query(
            r"
            INSERT INTO artists (artist_id, name, location, latitude, longitude)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(artist_id) DO NOTHING;
            "
        )
        .bind(&row.0)
        .bind(&row.1)
        .bind(&row.2)
        .bind(row.3)
        .bind(row.4)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_time(&mut self, row: &TimeRow) -> Result<(), EtlError> {
        let tx = self.unit_of_work().await?;
        sqlx::query(
            r"
            INSERT INTO time (start_time, hour, day, week, month, year, weekday)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(start_time) DO NOTHING;
            "
        )
        .bind(row.0)
        .bind(row.1)
        .bind(row.2)
        .bind(row.3)
        .bind(row.4)
        .bind(row.5)
        .bind(row.6)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_user(&mut self, row: &UserRow) -> Result<(), EtlError> {
        let tx = self.unit_of_work().await?;
        sqlx::query(
            r"
            INSERT INTO users (user_id, first_name, last_name, gender, level)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET level = excluded.level;
            "
        )
        .bind(&row.0)
        .bind(&row.1)
        .bind(&row.2)
        .bind(&row.3)
        .bind(&row.4)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_song_play(&mut self, row: &SongPlayRow) -> Result<(), EtlError> {
        let tx = self.unit_of_work().await?;
        sqlx::query(
            r"
            INSERT INTO songplays (
                start_time, user_id, level, song_id, artist_id,
                session_id, location, user_agent
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);
            "
        )
        .bind(row.0)
        .bind(&row.1)
        .bind(&row.2)
        .bind(&row.3)
        .bind(&row.4)
        .bind(row.5)
        .bind(&row.6)
        .bind(&row.7)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), EtlError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}
