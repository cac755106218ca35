//!
//! Database connections.
//!
//! A `Database` owns one rusqlite `Connection` behind its own lock. Every
//! driver call on the connection, and on any statement prepared from it,
//! runs under that lock, since connections are opened without SQLite's
//! internal mutex.
//!

use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use crate::config::OpenConfig;
use crate::error::Result;

pub struct Database {
    conn: Mutex<Connection>,
    path: String,
}

impl Database {
    pub fn open(path: &str, config: &OpenConfig) -> Result<Self> {
        let conn = Connection::open_with_flags(path, config.flags())?;
        conn.busy_timeout(config.busy_timeout())?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_string(),
        })
    }

    pub fn open_in_memory(config: &OpenConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(config.busy_timeout())?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: ":memory:".to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run every statement in `sql`, discarding any rows
    pub fn exec(&self, sql: &str) -> Result<()> {
        self.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE
    pub fn changes(&self) -> i64 {
        i64::try_from(self.lock().changes()).unwrap_or(i64::MAX)
    }

    pub fn last_insert_id(&self) -> i64 {
        self.lock().last_insert_rowid()
    }
}
