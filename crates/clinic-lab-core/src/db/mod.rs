//! SQLite persistence for exams, lab requests and their results.
//!
//! [`Database`] is the concrete [`ResultStore`](crate::store::ResultStore):
//! release transitions are checked in SQL, and the schema's triggers keep a
//! sent result frozen even against writes that bypass this module.

mod exams;
mod requests;
mod results;
mod schema;

pub use schema::SCHEMA;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A status guard in the `UPDATE` matched no row.
    #[error("Cannot {action} result {result_id} from status '{status}'")]
    Transition {
        result_id: String,
        action: &'static str,
        status: String,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Lab store over a single SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the lab store file, creating tables and triggers on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Throwaway store, used by the FFI in-memory mode and the tests.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open whichever store the `[database]` config section names.
    pub fn open_configured(config: &DatabaseConfig) -> DbResult<Self> {
        if config.in_memory {
            Self::open_in_memory()
        } else {
            Self::open(&config.path)
        }
    }

    fn with_connection(conn: Connection) -> DbResult<Self> {
        // Every statement is IF NOT EXISTS, so reopening a file is harmless.
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Underlying connection, for maintenance SQL the typed API does not cover.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
