//!
//! src/main.rs  Andrew Belles  Oct 19th, 2026
//!
//! Entry point of the song-play loader. Reads song metadata and
//! event logs from disk and loads the sparkify star schema.
//!
//!

mod config;
mod driver;
mod errors;
mod extract;
mod logging;
mod mapper;
mod types;
mod walker;
mod warehouse;

use crate::errors::EtlError;

#[tokio::main]
async fn main() -> Result<(), EtlError> {
    let cfgs    = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="sparkify-etl",
        version=%env!("CARGO_PKG_VERSION"),
        songs=%cfgs.etl.song_data_root.display(),
        logs=%cfgs.etl.log_data_root.display(),
        destination=%cfgs.etl.destination,
        "starting"
    );

    let mut db = warehouse::SqliteWarehouse::connect(&cfgs.etl.destination).await?;
    let summary = driver::run(&cfgs.etl, &mut db).await?;

    let plays    = db.count_rows("songplays").await?;
    let resolved = db.count_resolved_song_plays().await?;
    tracing::info!(
        song_files=summary.songs,
        log_files=summary.logs,
        songplays=plays,
        resolved=resolved,
        "finished"
    );

    db.close().await?;
    Ok(())
}
