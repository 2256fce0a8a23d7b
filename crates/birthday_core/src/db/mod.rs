//! Roster database: connection bootstrap and schema versioning.
//!
//! Everything above this module assumes the `people` and `reset_state`
//! tables exist at the shape of [`migrations::latest_version`].

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating the roster database.
#[derive(Debug)]
pub enum DbError {
    /// SQLite refused an open, pragma or query outside a migration step.
    Sqlite(rusqlite::Error),
    /// Migration `version` failed; the schema was rolled back to where it was.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file was written by a newer binary with an unknown schema.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "roster database error: {err}"),
            Self::Migration { version, source } => {
                write!(f, "roster migration {version:04} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "roster schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
