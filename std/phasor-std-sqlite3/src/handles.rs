//!
//! Process-wide handle tables.
//!
//! - DATABASES: handle → open connection
//! - STATEMENTS: handle → prepared statement
//! - STRINGS: handle → interned NUL-terminated text handed to the VM
//!
//! Each table has its own lock (see `HandleRegistry`); none is held across a
//! SQLite call.
//!

use std::cell::Cell;
use std::ffi::CString;
use std::sync::{Arc, LazyLock};

use phasor_std_core::{Handle, HandleRegistry};

use crate::database::Database;
use crate::error::{Result, SqliteError};
use crate::statement::Statement;

pub static DATABASES: LazyLock<HandleRegistry<Database>> = LazyLock::new(HandleRegistry::new);

pub static STATEMENTS: LazyLock<HandleRegistry<Statement>> = LazyLock::new(HandleRegistry::new);

pub static STRINGS: LazyLock<HandleRegistry<CString>> = LazyLock::new(HandleRegistry::new);

thread_local! {
    static LAST_STRING: Cell<Option<Handle>> = const { Cell::new(None) };
}

pub fn database(handle: Handle) -> Result<Arc<Database>> {
    DATABASES.lookup(handle).ok_or(SqliteError::InvalidDatabase(handle))
}

pub fn statement(handle: Handle) -> Result<Arc<Statement>> {
    STATEMENTS.lookup(handle).ok_or(SqliteError::InvalidStatement(handle))
}

pub fn string(handle: Handle) -> Result<Arc<CString>> {
    STRINGS.lookup(handle).ok_or(SqliteError::InvalidString(handle))
}

/// Move `text` into the string table.
///
/// It stays valid until its handle is freed; the handle is also remembered as
/// this thread's most recent one.
pub fn intern(text: CString) -> (Handle, Arc<CString>) {
    let (handle, text) = STRINGS.allocate_shared(text);
    LAST_STRING.with(|last| last.set(Some(handle)));
    (handle, text)
}

/// Handle of the string most recently interned on this thread
pub fn last_string() -> Option<Handle> {
    LAST_STRING.with(Cell::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_free() {
        let (handle, text) = intern(c"hello".to_owned());
        assert!(handle > 0);
        assert_eq!(text.as_c_str(), c"hello");
        assert_eq!(last_string(), Some(handle));
        assert_eq!(string(handle).unwrap().as_c_str(), c"hello");

        assert!(STRINGS.release(handle).is_some());
        assert!(matches!(string(handle), Err(SqliteError::InvalidString(h)) if h == handle));
    }

    #[test]
    fn test_intern_keeps_non_utf8_bytes() {
        let raw = CString::new(vec![0xff, 0xfe, b'x']).unwrap();
        let (handle, text) = intern(raw.clone());
        assert_eq!(*text, raw);
        assert_eq!(string(handle).unwrap().as_bytes(), &[0xff, 0xfe, b'x']);
        STRINGS.release(handle);
    }

    #[test]
    fn test_last_string_is_per_thread() {
        let (handle, _) = intern(c"main".to_owned());
        let other = std::thread::spawn(last_string).join().unwrap();
        assert_eq!(other, None);
        assert_eq!(last_string(), Some(handle));
        STRINGS.release(handle);
    }

    #[test]
    fn test_lookup_of_unknown_handles() {
        assert!(matches!(database(-1), Err(SqliteError::InvalidDatabase(-1))));
        assert!(matches!(statement(0), Err(SqliteError::InvalidStatement(0))));
    }
}
