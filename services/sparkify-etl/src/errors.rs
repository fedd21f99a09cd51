//!
//! src/errors.rs  Andrew Belles  Oct 19th, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the loader uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("config error: {0}")]
    Config(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("mapping error: {0}")]
    Mapping(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl EtlError {
    /// True for failures that belong to the destination rather than
    /// to a single input artifact
    pub fn is_storage(&self) -> bool {
        matches!(self, EtlError::Db(_))
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(e: serde_json::Error) -> Self { EtlError::Parse(e.to_string()) }
}

impl From<sqlx::Error> for EtlError {
    fn from(e: sqlx::Error) -> Self { EtlError::Db(e.to_string()) }
}
