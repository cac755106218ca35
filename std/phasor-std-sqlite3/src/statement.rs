//!
//! Prepared statements.
//!
//! A script holds a statement across many native calls, which outlives any
//! borrow of its connection, so statements sit on SQLite's raw handle API
//! (`rusqlite::ffi`) instead of rusqlite's borrowing `Statement`.
//!
//! Each `Statement` holds an `Arc` of its `Database`: closing the connection
//! handle leaves live statements usable, and the connection is physically
//! closed after the last of them is finalized.
//!

use std::ffi::{CStr, CString, c_int};
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use phasor_std_core::Value;
use rusqlite::ffi;

use crate::database::Database;
use crate::error::{Result, SqliteError};

/// A value read from the current row, by storage class
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    /// Raw text bytes up to the first NUL, not checked for UTF-8
    Text(CString),
    Blob(Vec<u8>),
}

pub struct Statement {
    raw: NonNull<ffi::sqlite3_stmt>,
    db: Arc<Database>,
    has_row: AtomicBool,
}

// SAFETY: `raw` is only used while holding the owning connection's lock.
unsafe impl Send for Statement {}
unsafe impl Sync for Statement {}

fn failure(code: c_int, message: Option<String>) -> SqliteError {
    SqliteError::Sqlite(rusqlite::Error::SqliteFailure(ffi::Error::new(code), message))
}

/// Error for `code`, with the connection's current error message
///
/// # Safety
/// `db` must be a live connection handle whose lock the caller holds.
unsafe fn error_from_handle(db: *mut ffi::sqlite3, code: c_int) -> SqliteError {
    let message = unsafe { ffi::sqlite3_errmsg(db) };
    let message = (!message.is_null()).then(|| unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned());
    failure(code, message)
}

impl Statement {
    /// Compile the first statement in `sql`
    pub fn prepare(db: Arc<Database>, sql: &CStr) -> Result<Self> {
        let raw = {
            let conn = db.lock();
            // SAFETY: the handle is used only while `conn` is held
            let handle = unsafe { conn.handle() };
            let mut stmt = ptr::null_mut();
            let rc = unsafe { ffi::sqlite3_prepare_v2(handle, sql.as_ptr(), -1, &mut stmt, ptr::null_mut()) };
            if rc != ffi::SQLITE_OK {
                return Err(unsafe { error_from_handle(handle, rc) });
            }
            // Whitespace or comments only: SQLite succeeds without a statement.
            NonNull::new(stmt).ok_or(SqliteError::EmptyStatement)?
        };
        Ok(Self {
            raw,
            db,
            has_row: AtomicBool::new(false),
        })
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Advance to the next row: `true` if a row is available, `false` when done
    pub fn step(&self) -> Result<bool> {
        let conn = self.db.lock();
        let rc = unsafe { ffi::sqlite3_step(self.raw.as_ptr()) };
        match rc {
            ffi::SQLITE_ROW => {
                self.has_row.store(true, Ordering::Release);
                Ok(true)
            }
            ffi::SQLITE_DONE => {
                self.has_row.store(false, Ordering::Release);
                Ok(false)
            }
            code => {
                self.has_row.store(false, Ordering::Release);
                Err(unsafe { error_from_handle(conn.handle(), code) })
            }
        }
    }

    pub fn has_row(&self) -> bool {
        self.has_row.load(Ordering::Acquire)
    }

    pub fn column_count(&self) -> i64 {
        let _conn = self.db.lock();
        i64::from(unsafe { ffi::sqlite3_column_count(self.raw.as_ptr()) })
    }

    fn column_index(&self, index: i64) -> Result<c_int> {
        let count = i64::from(unsafe { ffi::sqlite3_column_count(self.raw.as_ptr()) });
        match c_int::try_from(index) {
            Ok(col) if (0..count).contains(&index) => Ok(col),
            _ => Err(SqliteError::ColumnOutOfRange { index, count }),
        }
    }

    /// Value of column `index` in the current row, typed by its storage class
    pub fn column(&self, index: i64) -> Result<ColumnValue> {
        let _conn = self.db.lock();
        let col = self.column_index(index)?;
        if !self.has_row() {
            return Err(SqliteError::NoRow);
        }

        let raw = self.raw.as_ptr();
        let value = unsafe {
            match ffi::sqlite3_column_type(raw, col) {
                ffi::SQLITE_INTEGER => ColumnValue::Integer(ffi::sqlite3_column_int64(raw, col)),
                ffi::SQLITE_FLOAT => ColumnValue::Real(ffi::sqlite3_column_double(raw, col)),
                ffi::SQLITE_TEXT => {
                    let text = ffi::sqlite3_column_text(raw, col);
                    if text.is_null() {
                        ColumnValue::Text(CString::default())
                    } else {
                        ColumnValue::Text(CStr::from_ptr(text.cast()).to_owned())
                    }
                }
                ffi::SQLITE_BLOB => {
                    let blob = ffi::sqlite3_column_blob(raw, col);
                    let bytes = column_bytes(blob.cast(), ffi::sqlite3_column_bytes(raw, col));
                    ColumnValue::Blob(bytes.to_vec())
                }
                _ => ColumnValue::Null,
            }
        };
        Ok(value)
    }

    pub fn column_name(&self, index: i64) -> Result<CString> {
        let _conn = self.db.lock();
        let col = self.column_index(index)?;
        let name = unsafe { ffi::sqlite3_column_name(self.raw.as_ptr(), col) };
        if name.is_null() {
            return Err(failure(ffi::SQLITE_NOMEM, None));
        }
        Ok(unsafe { CStr::from_ptr(name) }.to_owned())
    }

    /// Bind `value` to the 1-based parameter `index`
    pub fn bind(&self, index: i64, value: Value<'_>) -> Result<()> {
        let conn = self.db.lock();
        let idx = c_int::try_from(index).map_err(|_| failure(ffi::SQLITE_RANGE, None))?;
        let raw = self.raw.as_ptr();
        let rc = unsafe {
            match value {
                Value::Null => ffi::sqlite3_bind_null(raw, idx),
                Value::Bool(b) => ffi::sqlite3_bind_int64(raw, idx, i64::from(b)),
                Value::Int(i) => ffi::sqlite3_bind_int64(raw, idx, i),
                Value::Float(f) => ffi::sqlite3_bind_double(raw, idx, f),
                Value::Str(s) => {
                    let bytes = s.to_bytes();
                    let len = c_int::try_from(bytes.len()).map_err(|_| failure(ffi::SQLITE_TOOBIG, None))?;
                    ffi::sqlite3_bind_text(raw, idx, bytes.as_ptr().cast(), len, ffi::SQLITE_TRANSIENT())
                }
                Value::Array(_) => return Err(SqliteError::UnsupportedBind("array")),
            }
        };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(unsafe { error_from_handle(conn.handle(), rc) })
        }
    }

    /// Rewind to before the first row and clear all bindings.
    ///
    /// The statement is rewound even when the previous step failed.
    pub fn reset(&self) {
        let _conn = self.db.lock();
        self.has_row.store(false, Ordering::Release);
        unsafe {
            ffi::sqlite3_reset(self.raw.as_ptr());
            ffi::sqlite3_clear_bindings(self.raw.as_ptr());
        }
    }
}

/// # Safety
/// `ptr` must be null or point to `len` readable bytes.
unsafe fn column_bytes<'a>(ptr: *const u8, len: c_int) -> &'a [u8] {
    match usize::try_from(len) {
        Ok(len) if len > 0 && !ptr.is_null() => unsafe { std::slice::from_raw_parts(ptr, len) },
        _ => &[],
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        let _conn = self.db.lock();
        unsafe { ffi::sqlite3_finalize(self.raw.as_ptr()) };
    }
}
