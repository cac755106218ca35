//!
//! SQLite native functions for Phasor.
//!
//! Every function has the VM's native signature `(vm, argc, argv) -> value`.
//! The work happens in a plain Rust function returning `Result`; `dispatch`
//! turns an error (or a panic) into the function's sentinel, records the
//! message for `sqlite_last_error`, and clears it on success.
//!
//! Sentinels: functions returning a handle, a value or a string give `null`;
//! functions returning a success flag give `false`.
//!

use std::ffi::c_int;
use std::panic::{self, AssertUnwindSafe};

use phasor_std_core::{Args, PhasorVM, PhasorValue};
use tracing::{debug, error};

use crate::config;
use crate::database::Database;
use crate::error::{Result, SqliteError, clear_last_error, set_last_error, with_last_error};
use crate::handles::{self, DATABASES, STATEMENTS, STRINGS};
use crate::statement::{ColumnValue, Statement};

fn dispatch(name: &'static str, sentinel: PhasorValue, op: impl FnOnce() -> Result<PhasorValue>) -> PhasorValue {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => {
            clear_last_error();
            value
        }
        Ok(Err(e)) => {
            debug!(function = name, code = e.code(), error = %e, "native call failed");
            set_last_error(e.to_string());
            sentinel
        }
        Err(_) => {
            error!(function = name, "panic in native function");
            set_last_error(SqliteError::Panic(name).to_string());
            sentinel
        }
    }
}

/// Convert a column value for the VM; text is interned so the pointer outlives this call
fn column_to_phasor(value: ColumnValue) -> PhasorValue {
    match value {
        ColumnValue::Integer(i) => PhasorValue::int(i),
        ColumnValue::Real(f) => PhasorValue::float(f),
        ColumnValue::Text(text) => {
            let (_, text) = handles::intern(text);
            PhasorValue::string(&text)
        }
        ColumnValue::Null | ColumnValue::Blob(_) => PhasorValue::null(),
    }
}

// ============================================================================
// Connections
// ============================================================================

fn open(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let path = args.str(0)?.to_str()?;
    let db = Database::open(path, &config::current().open)?;
    let handle = DATABASES.allocate(db);
    debug!(handle, path, "opened database");
    Ok(PhasorValue::int(handle))
}

fn open_memory(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(0)?;
    let db = Database::open_in_memory(&config::current().open)?;
    let handle = DATABASES.allocate(db);
    debug!(handle, "opened in-memory database");
    Ok(PhasorValue::int(handle))
}

fn close(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let handle = args.int(0)?;
    let db = DATABASES.release(handle).ok_or(SqliteError::InvalidDatabase(handle))?;
    debug!(handle, path = db.path(), "closed database");
    Ok(PhasorValue::bool(true))
}

fn exec(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(2)?;
    let db = handles::database(args.int(0)?)?;
    let sql = args.str(1)?.to_str()?;
    db.exec(sql)?;
    Ok(PhasorValue::bool(true))
}

fn changes(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let db = handles::database(args.int(0)?)?;
    Ok(PhasorValue::int(db.changes()))
}

fn last_insert_id(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let db = handles::database(args.int(0)?)?;
    Ok(PhasorValue::int(db.last_insert_id()))
}

// ============================================================================
// Prepared statements
// ============================================================================

fn prepare(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(2)?;
    let db_handle = args.int(0)?;
    let db = handles::database(db_handle)?;
    let stmt = Statement::prepare(db, args.str(1)?)?;
    let handle = STATEMENTS.allocate(stmt);
    debug!(handle, db = db_handle, "prepared statement");
    Ok(PhasorValue::int(handle))
}

fn step(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let stmt = handles::statement(args.int(0)?)?;
    Ok(PhasorValue::bool(stmt.step()?))
}

fn column(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(2)?;
    let stmt = handles::statement(args.int(0)?)?;
    let value = stmt.column(args.int(1)?)?;
    Ok(column_to_phasor(value))
}

fn column_count(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let stmt = handles::statement(args.int(0)?)?;
    Ok(PhasorValue::int(stmt.column_count()))
}

fn column_name(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(2)?;
    let stmt = handles::statement(args.int(0)?)?;
    let name = stmt.column_name(args.int(1)?)?;
    Ok(column_to_phasor(ColumnValue::Text(name)))
}

fn bind(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(3)?;
    let stmt = handles::statement(args.int(0)?)?;
    stmt.bind(args.int(1)?, args.value(2)?)?;
    Ok(PhasorValue::bool(true))
}

fn reset(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let stmt = handles::statement(args.int(0)?)?;
    stmt.reset();
    Ok(PhasorValue::bool(true))
}

fn finalize(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let handle = args.int(0)?;
    STATEMENTS.release(handle).ok_or(SqliteError::InvalidStatement(handle))?;
    debug!(handle, "finalized statement");
    Ok(PhasorValue::bool(true))
}

// ============================================================================
// Interned strings
// ============================================================================

fn free_string(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let handle = args.int(0)?;
    STRINGS.release(handle).ok_or(SqliteError::InvalidString(handle))?;
    Ok(PhasorValue::null())
}

fn last_string(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(0)?;
    Ok(handles::last_string().map_or_else(PhasorValue::null, PhasorValue::int))
}

fn string(args: Args<'_>) -> Result<PhasorValue> {
    args.arity(1)?;
    let text = handles::string(args.int(0)?)?;
    Ok(PhasorValue::string(&text))
}

// ============================================================================
// Exported native functions
// ============================================================================

/// `sqlite_open(path: string) -> int | null`
pub unsafe extern "C" fn sqlite_open(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_open", PhasorValue::null(), || open(args))
}

/// `sqlite_open_memory() -> int | null`
pub unsafe extern "C" fn sqlite_open_memory(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_open_memory", PhasorValue::null(), || open_memory(args))
}

/// `sqlite_close(db: int) -> bool`
pub unsafe extern "C" fn sqlite_close(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_close", PhasorValue::bool(false), || close(args))
}

/// `sqlite_exec(db: int, sql: string) -> bool`
pub unsafe extern "C" fn sqlite_exec(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_exec", PhasorValue::bool(false), || exec(args))
}

/// `sqlite_changes(db: int) -> int | null`
pub unsafe extern "C" fn sqlite_changes(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_changes", PhasorValue::null(), || changes(args))
}

/// `sqlite_last_insert_id(db: int) -> int | null`
pub unsafe extern "C" fn sqlite_last_insert_id(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_last_insert_id", PhasorValue::null(), || last_insert_id(args))
}

/// `sqlite_prepare(db: int, sql: string) -> int | null`
pub unsafe extern "C" fn sqlite_prepare(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_prepare", PhasorValue::null(), || prepare(args))
}

/// `sqlite_step(stmt: int) -> bool | null`
pub unsafe extern "C" fn sqlite_step(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_step", PhasorValue::null(), || step(args))
}

/// `sqlite_column(stmt: int, index: int) -> int | float | string | null`
pub unsafe extern "C" fn sqlite_column(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_column", PhasorValue::null(), || column(args))
}

/// `sqlite_column_count(stmt: int) -> int | null`
pub unsafe extern "C" fn sqlite_column_count(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_column_count", PhasorValue::null(), || column_count(args))
}

/// `sqlite_column_name(stmt: int, index: int) -> string | null`
pub unsafe extern "C" fn sqlite_column_name(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_column_name", PhasorValue::null(), || column_name(args))
}

/// `sqlite_bind(stmt: int, index: int, value) -> bool`
pub unsafe extern "C" fn sqlite_bind(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_bind", PhasorValue::bool(false), || bind(args))
}

/// `sqlite_reset(stmt: int) -> bool`
pub unsafe extern "C" fn sqlite_reset(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_reset", PhasorValue::bool(false), || reset(args))
}

/// `sqlite_finalize(stmt: int) -> bool`
pub unsafe extern "C" fn sqlite_finalize(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_finalize", PhasorValue::bool(false), || finalize(args))
}

/// `sqlite_free_string(handle: int) -> null`
pub unsafe extern "C" fn sqlite_free_string(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_free_string", PhasorValue::null(), || free_string(args))
}

/// `sqlite_last_string() -> int | null`
pub unsafe extern "C" fn sqlite_last_string(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_last_string", PhasorValue::null(), || last_string(args))
}

/// `sqlite_string(handle: int) -> string | null`
pub unsafe extern "C" fn sqlite_string(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
    let args = unsafe { Args::from_raw(argc, argv) };
    dispatch("sqlite_string", PhasorValue::null(), || string(args))
}

/// `sqlite_last_error() -> string | null`
///
/// Reads the slot without clearing it. The returned string stays valid until
/// the next native call on this thread.
pub unsafe extern "C" fn sqlite_last_error(_vm: *mut PhasorVM, _argc: c_int, _argv: *const PhasorValue) -> PhasorValue {
    with_last_error(|e| e.map_or_else(PhasorValue::null, PhasorValue::string))
}
