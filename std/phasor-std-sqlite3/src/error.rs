//!
//! Error types and the per-thread last-error slot.
//!
//! Native functions never raise into the VM. Each failure collapses into the
//! function's sentinel (`null` or `false`); the message is kept per thread so
//! scripts can ask `sqlite_last_error()` what went wrong.
//!

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::str::Utf8Error;

use phasor_std_core::{ArgError, Handle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("{0}")]
    Args(#[from] ArgError),

    #[error("Invalid database handle {0}")]
    InvalidDatabase(Handle),

    #[error("Invalid statement handle {0}")]
    InvalidStatement(Handle),

    #[error("Invalid string handle {0}")]
    InvalidString(Handle),

    #[error("Column index {index} out of range for {count} column(s)")]
    ColumnOutOfRange { index: i64, count: i64 },

    #[error("Statement has no current row")]
    NoRow,

    #[error("SQL text contains no statement")]
    EmptyStatement,

    #[error("Cannot bind {0} values")]
    UnsupportedBind(&'static str),

    #[error("Text is not valid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Panic in native function {0}")]
    Panic(&'static str),
}

pub type Result<T> = std::result::Result<T, SqliteError>;

impl SqliteError {
    /// SQLite's extended result code, -1 when the failure is not SQLite's
    pub fn code(&self) -> i64 {
        match self {
            SqliteError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => i64::from(err.extended_code),
            _ => -1,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub fn set_last_error(message: impl Into<String>) {
    let mut bytes = message.into().into_bytes();
    bytes.retain(|&b| b != 0);
    LAST_ERROR.with(|e| *e.borrow_mut() = CString::new(bytes).ok());
}

pub fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

/// Run `f` on the last error message of this thread.
///
/// The message lives until the next failing or succeeding native call on
/// this thread.
pub fn with_last_error<R>(f: impl FnOnce(Option<&CStr>) -> R) -> R {
    LAST_ERROR.with(|e| f(e.borrow().as_deref()))
}
