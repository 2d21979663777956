//! SQLite-backed store.
//!
//! Settings live in `tp_config(name TEXT PRIMARY KEY, value TEXT)`. The row
//! `db_ver` holds the schema version; `login`, `password`, `session`, `smtp`
//! and `storage` hold JSON objects for the system config sections.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;

use crate::config::SystemConfig;
use crate::db::{Database, DatabaseError};

/// Schema version this build expects.
pub const CURRENT_DB_VERSION: u32 = 7;

pub struct SqliteDatabase {
    path: PathBuf,
    conn: Option<Connection>,
    need_create: bool,
    need_upgrade: bool,
    db_version: Option<u32>,
}

impl SqliteDatabase {
    /// `file` is resolved against `data_path` when relative.
    pub fn new(data_path: &Path, file: &str) -> Self {
        let file = Path::new(file);
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            data_path.join(file)
        };
        Self {
            path,
            conn: None,
            need_create: false,
            need_upgrade: false,
            db_version: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version found in `tp_config`, if any.
    pub fn db_version(&self) -> Option<u32> {
        self.db_version
    }

    fn conn(&self) -> Result<&Connection, DatabaseError> {
        self.conn.as_ref().ok_or(DatabaseError::NotInitialized)
    }

    fn open_err(&self, reason: impl ToString) -> DatabaseError {
        DatabaseError::Open {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn read_value(conn: &Connection, name: &str) -> Result<Option<String>, DatabaseError> {
        let query = "select value from tp_config where name = ?1";
        Ok(conn
            .query_row(query, [name], |r| r.get::<_, String>(0))
            .optional()?)
    }

    /// A missing or unparsable section keeps its defaults.
    fn read_section<T: DeserializeOwned + Default>(
        conn: &Connection,
        name: &str,
    ) -> Result<T, DatabaseError> {
        let Some(raw) = Self::read_value(conn, name)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(section) => Ok(section),
            Err(e) => {
                tracing::warn!(section = name, error = %e, "Corrupt system config section, using defaults");
                Ok(T::default())
            }
        }
    }
}

impl Database for SqliteDatabase {
    fn init(&mut self) -> Result<(), DatabaseError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.open_err(e))?;
        }
        let conn = Connection::open(&self.path).map_err(|e| self.open_err(e))?;

        let query = "select count(*) from sqlite_master where type = 'table' and name = 'tp_config'";
        let tables: i64 = conn.query_row(query, [], |r| r.get(0))?;

        if tables == 0 {
            self.need_create = true;
            self.need_upgrade = false;
            self.db_version = None;
        } else {
            let version = Self::read_value(&conn, "db_ver")?
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(0);
            self.need_create = false;
            self.need_upgrade = version < CURRENT_DB_VERSION;
            self.db_version = Some(version);
        }

        tracing::debug!(
            path = %self.path.display(),
            need_create = self.need_create,
            need_upgrade = self.need_upgrade,
            db_version = ?self.db_version,
            "Database opened"
        );
        self.conn = Some(conn);
        Ok(())
    }

    fn need_create(&self) -> bool {
        self.need_create
    }

    fn need_upgrade(&self) -> bool {
        self.need_upgrade
    }

    fn load_system_config(&self) -> Result<SystemConfig, DatabaseError> {
        let conn = self.conn()?;
        Ok(SystemConfig {
            login: Self::read_section(conn, "login")?,
            password: Self::read_section(conn, "password")?,
            session: Self::read_section(conn, "session")?,
            smtp: Self::read_section(conn, "smtp")?,
            storage: Self::read_section(conn, "storage")?,
        })
    }
}
