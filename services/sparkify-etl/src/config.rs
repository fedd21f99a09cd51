use std::path::PathBuf;
use crate::errors::EtlError;

/// Defaults for the ETL Config
pub const SONG_DATA_ROOT: &str = "data/song_data";
pub const LOG_DATA_ROOT: &str = "data/log_data";
pub const DESTINATION: &str = "sqlite:./data/sparkify.db";
pub const ARTIFACT_EXTENSION: &str = "json";

/// Returns the value of s if it is set and not blank
fn env_opt(var: &impl Fn(&str) -> Option<String>, s: &str) -> Option<String> {
    match var(s) {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_bool(var: &impl Fn(&str) -> Option<String>, s: &str, default: bool) ->
    Result<bool, EtlError> {
    match env_opt(var, s) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on"  => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(EtlError::Config(format!("{s} is not a boolean: {v}"))),
        }
    }
}

///
/// Configuration for the load itself: where artifacts live and where rows go
///
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub song_data_root: PathBuf,
    pub log_data_root: PathBuf,
    pub destination: String,    // sqlx url, sqlite:./data/sparkify.db
    pub extension: String,      // recognized artifact extension, no dot
    pub fail_fast: bool         // abort the run on the first storage error
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            song_data_root: PathBuf::from(SONG_DATA_ROOT),
            log_data_root: PathBuf::from(LOG_DATA_ROOT),
            destination: DESTINATION.to_string(),
            extension: ARTIFACT_EXTENSION.to_string(),
            fail_fast: false
        }
    }
}

fn build_etl(var: &impl Fn(&str) -> Option<String>) -> Result<EtlConfig, EtlError> {
    let defaults = EtlConfig::default();

    let song_data_root = env_opt(var, "SONG_DATA_ROOT")
        .map(PathBuf::from)
        .unwrap_or(defaults.song_data_root);
    let log_data_root = env_opt(var, "LOG_DATA_ROOT")
        .map(PathBuf::from)
        .unwrap_or(defaults.log_data_root);
    let destination = env_opt(var, "DATABASE_URL")
        .unwrap_or(defaults.destination);

    if !destination.starts_with("sqlite:") {
        return Err(EtlError::Config(
            format!("DATABASE_URL must be a sqlite url: {destination}")
        ));
    }

    // accept ".json" as well as "json"
    let extension = env_opt(var, "ARTIFACT_EXTENSION")
        .map(|e| e.trim_start_matches('.').to_string())
        .unwrap_or(defaults.extension);
    let fail_fast = env_bool(var, "ETL_FAIL_FAST", defaults.fail_fast)?;

    Ok( EtlConfig { song_data_root, log_data_root, destination, extension, fail_fast } )
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,sparkify_etl=debug,sqlx=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true
        }
    }
}

fn build_logging(var: &impl Fn(&str) -> Option<String>) ->
    Result<LoggingConfig, EtlError> {
    let mut logging = LoggingConfig::default();

    if let Some(format) = env_opt(var, "LOG_FORMAT") {
        logging.format = match format.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json"   => LogFormat::Json,
            other    => return Err(EtlError::Config(
                format!("LOG_FORMAT must be pretty or json, got {other}")
            )),
        };
    }

    // json lines go to collectors, not terminals
    logging.with_ansi = logging.format == LogFormat::Pretty;
    logging.include_file_line = logging.format == LogFormat::Json;
    Ok(logging)
}

///
/// AppConfig which holds everything the loader needs at program start
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub etl: EtlConfig,
    pub logging: LoggingConfig
}

fn build_config(var: impl Fn(&str) -> Option<String>) -> Result<AppConfig, EtlError> {
    let etl     = build_etl(&var)?;
    let logging = build_logging(&var)?;
    Ok( AppConfig { etl, logging } )
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, EtlError> {
    dotenvy::dotenv().ok();
    build_config(|s| std::env::var(s).ok())
}
