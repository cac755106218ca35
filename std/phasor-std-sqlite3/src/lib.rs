//!
//! Phasor SQLite3 Plugin
//!
//! Exposes SQLite to Phasor scripts through the VM's native function ABI.
//! The host loads the shared library and calls `phasor_plugin_entry`, which
//! registers every function listed in `FUNCTIONS`. Uses rusqlite with bundled
//! SQLite, so no system library is needed.
//!
//! Architecture:
//! - Connections, prepared statements and interned strings live in
//!   process-wide handle tables (`handles`); scripts only see i64 handles.
//! - Statements use SQLite's raw handle API and keep their connection alive,
//!   so they can be stepped across calls.
//! - Errors never cross into the VM: a failing call returns `null` or
//!   `false` and leaves its message in `sqlite_last_error()`.
//!
//! Functions:
//! - Connection: open, open_memory, close, exec, changes, last_insert_id
//! - Statements: prepare, bind, step, column, column_count, column_name,
//!   reset, finalize
//! - Strings: free_string, last_string, string
//! - Diagnostics: last_error
//!
//! Typical script flow:
//!
//! ```text
//! db = sqlite_open("app.db")
//! st = sqlite_prepare(db, "SELECT name FROM users")
//! while sqlite_step(st) {
//!     print(sqlite_column(st, 0))
//!     sqlite_free_string(sqlite_last_string())
//! }
//! sqlite_finalize(st)
//! sqlite_close(db)
//! ```
//!

pub mod config;
pub mod database;
pub mod error;
pub mod handles;
pub mod logging;
pub mod sqlite;
pub mod statement;

use std::ffi::CStr;

use phasor_std_core::{PhasorAPI, PhasorNativeFunction, PhasorVM, Registrar};
use tracing::{debug, warn};

pub use error::{Result, SqliteError};
pub use sqlite::*;

/// Every native function the plugin registers, by script-visible name
pub const FUNCTIONS: &[(&CStr, PhasorNativeFunction)] = &[
    (c"sqlite_open", sqlite_open),
    (c"sqlite_open_memory", sqlite_open_memory),
    (c"sqlite_close", sqlite_close),
    (c"sqlite_exec", sqlite_exec),
    (c"sqlite_changes", sqlite_changes),
    (c"sqlite_last_insert_id", sqlite_last_insert_id),
    (c"sqlite_prepare", sqlite_prepare),
    (c"sqlite_bind", sqlite_bind),
    (c"sqlite_step", sqlite_step),
    (c"sqlite_column", sqlite_column),
    (c"sqlite_column_count", sqlite_column_count),
    (c"sqlite_column_name", sqlite_column_name),
    (c"sqlite_reset", sqlite_reset),
    (c"sqlite_finalize", sqlite_finalize),
    (c"sqlite_free_string", sqlite_free_string),
    (c"sqlite_last_string", sqlite_last_string),
    (c"sqlite_string", sqlite_string),
    (c"sqlite_last_error", sqlite_last_error),
];

/// Plugin entry point called by the Phasor host after loading the library.
///
/// # Safety
/// `api` must be null or point to a valid `PhasorAPI` for the duration of the
/// call, and `vm` must be the VM pointer the host pairs with it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn phasor_plugin_entry(api: *const PhasorAPI, vm: *mut PhasorVM) {
    let Some(registrar) = (unsafe { Registrar::new(api, vm) }) else {
        return;
    };

    let (config, problem) = config::init();
    logging::init(&config.log);
    if let Some(err) = problem {
        warn!(error = %err, "using default plugin configuration");
    }

    for (name, func) in FUNCTIONS {
        registrar.register(name, *func);
    }
    debug!(count = FUNCTIONS.len(), "registered sqlite functions");
}
