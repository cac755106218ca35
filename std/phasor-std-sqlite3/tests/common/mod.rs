//!
//! Test harness: loads the plugin into an in-process host exactly as the
//! Phasor VM would, and wraps the registered functions with typed helpers.
//!

use std::ffi::{CStr, CString};
use std::path::Path;

use phasor_std_core::{Host, PhasorValue};
use phasor_std_sqlite3::phasor_plugin_entry;

pub struct Plugin {
    host: Host,
}

#[allow(dead_code)]
impl Plugin {
    pub fn load() -> Self {
        let mut host = Host::new();
        unsafe { host.load(phasor_plugin_entry) };
        Self { host }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn call(&self, name: &str, args: &[PhasorValue]) -> PhasorValue {
        unsafe { self.host.call(name, args) }.unwrap_or_else(|| panic!("{} is not registered", name))
    }

    pub fn open(&self, path: &Path) -> PhasorValue {
        let path = CString::new(path.to_str().unwrap()).unwrap();
        self.call("sqlite_open", &[PhasorValue::string(&path)])
    }

    pub fn open_memory(&self) -> i64 {
        self.call("sqlite_open_memory", &[]).as_int().expect("in-memory open failed")
    }

    pub fn close(&self, db: i64) -> bool {
        self.call("sqlite_close", &[PhasorValue::int(db)]).as_bool().unwrap()
    }

    pub fn exec(&self, db: i64, sql: &str) -> bool {
        let sql = CString::new(sql).unwrap();
        self.call("sqlite_exec", &[PhasorValue::int(db), PhasorValue::string(&sql)])
            .as_bool()
            .unwrap()
    }

    pub fn prepare(&self, db: i64, sql: &str) -> PhasorValue {
        let sql = CString::new(sql).unwrap();
        self.call("sqlite_prepare", &[PhasorValue::int(db), PhasorValue::string(&sql)])
    }

    pub fn step(&self, stmt: i64) -> PhasorValue {
        self.call("sqlite_step", &[PhasorValue::int(stmt)])
    }

    pub fn column(&self, stmt: i64, index: i64) -> PhasorValue {
        self.call("sqlite_column", &[PhasorValue::int(stmt), PhasorValue::int(index)])
    }

    pub fn finalize(&self, stmt: i64) -> bool {
        self.call("sqlite_finalize", &[PhasorValue::int(stmt)]).as_bool().unwrap()
    }

    pub fn last_error(&self) -> Option<String> {
        let v = self.call("sqlite_last_error", &[]);
        unsafe { v.as_str() }.map(|s: &CStr| s.to_string_lossy().into_owned())
    }
}

/// Read a string result; the plugin keeps the bytes alive until freed
#[allow(dead_code)]
pub fn text(value: PhasorValue) -> String {
    let s: &CStr = unsafe { value.as_str() }.expect("expected a string value");
    s.to_str().unwrap().to_owned()
}

#[allow(dead_code)]
pub fn bytes(value: PhasorValue) -> Vec<u8> {
    let s: &CStr = unsafe { value.as_str() }.expect("expected a string value");
    s.to_bytes().to_vec()
}
