//! Database readiness subsystem.
//!
//! # Data Flow
//! ```text
//! Database::init() (open store)
//!     → need_create / need_upgrade (schema readiness flags)
//!     → both false: load_system_config() → WebConfig::update_sys(Some(..))
//!     → otherwise: maintenance mode, WebConfig::update_sys(None)
//! ```
//!
//! # Design Decisions
//! - Readiness flags alone decide the app mode
//! - Schema creation and upgrade belong to the maintenance UI, not to startup

pub mod sqlite;

use serde::Serialize;
use thiserror::Error;

use crate::config::SystemConfig;

pub use sqlite::{SqliteDatabase, CURRENT_DB_VERSION};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("can not open database at {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("database query failed: {0}")]
    Query(String),
    #[error("database used before init")]
    NotInitialized,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        DatabaseError::Query(e.to_string())
    }
}

/// Snapshot of the readiness flags, served on `/maintenance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DbReadiness {
    pub need_create: bool,
    pub need_upgrade: bool,
}

impl DbReadiness {
    pub fn needs_maintenance(&self) -> bool {
        self.need_create || self.need_upgrade
    }
}

/// Persistent store as seen by the startup sequence.
pub trait Database: Send {
    /// Open the store and compute readiness flags.
    fn init(&mut self) -> Result<(), DatabaseError>;

    /// The schema does not exist yet.
    fn need_create(&self) -> bool;

    /// The schema exists but is older than this build expects.
    fn need_upgrade(&self) -> bool;

    /// Read persisted system configuration.
    fn load_system_config(&self) -> Result<SystemConfig, DatabaseError>;

    fn readiness(&self) -> DbReadiness {
        DbReadiness {
            need_create: self.need_create(),
            need_upgrade: self.need_upgrade(),
        }
    }
}
