//!
//! In-process Host
//!
//! A small Rust implementation of the host side of the plugin ABI. It hands
//! itself to a plugin entry point as the VM pointer, records every function
//! the plugin registers, and calls them by name.
//!
//! Used by plugin test suites and by Rust programs that want to drive a
//! plugin without the Phasor VM.
//!

use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_int};

use tracing::debug;

use crate::abi::{PhasorAPI, PhasorNativeFunction, PhasorPluginEntry, PhasorVM};
use crate::value::PhasorValue;

#[derive(Default)]
pub struct Host {
    functions: HashMap<String, PhasorNativeFunction>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a plugin entry point against this host.
    ///
    /// # Safety
    /// `entry` must follow the plugin ABI: it may only use the API table and
    /// VM pointer for the duration of the call.
    pub unsafe fn load(&mut self, entry: PhasorPluginEntry) {
        let api = PhasorAPI {
            register_function: Some(register_into_host),
        };
        let vm = (self as *mut Host).cast::<PhasorVM>();
        unsafe { entry(&api, vm) };
    }

    pub fn get(&self, name: &str) -> Option<PhasorNativeFunction> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call a registered function, `None` if no function has that name.
    ///
    /// # Safety
    /// String and array payloads in `args` must be live for the call.
    pub unsafe fn call(&self, name: &str, args: &[PhasorValue]) -> Option<PhasorValue> {
        let func = self.get(name)?;
        let argc = c_int::try_from(args.len()).ok()?;
        let vm = (self as *const Host).cast_mut().cast::<PhasorVM>();
        Some(unsafe { func(vm, argc, args.as_ptr()) })
    }
}

unsafe extern "C" fn register_into_host(vm: *mut PhasorVM, name: *const c_char, func: PhasorNativeFunction) {
    if vm.is_null() || name.is_null() {
        return;
    }
    // SAFETY: `Host::load` passes itself as the VM pointer
    let host = unsafe { &mut *vm.cast::<Host>() };
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    debug!(name = %name, "registered native function");
    host.functions.insert(name, func);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Registrar;
    use crate::args::Args;

    unsafe extern "C" fn add(_vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue {
        let args = unsafe { Args::from_raw(argc, argv) };
        match (args.int(0), args.int(1)) {
            (Ok(a), Ok(b)) => PhasorValue::int(a + b),
            _ => PhasorValue::null(),
        }
    }

    unsafe extern "C" fn argc_of(_vm: *mut PhasorVM, argc: c_int, _argv: *const PhasorValue) -> PhasorValue {
        PhasorValue::int(i64::from(argc))
    }

    unsafe extern "C" fn entry(api: *const PhasorAPI, vm: *mut PhasorVM) {
        if let Some(registrar) = unsafe { Registrar::new(api, vm) } {
            registrar.register(c"add", add);
            registrar.register(c"argc", argc_of);
        }
    }

    #[test]
    fn test_load_records_functions() {
        let mut host = Host::new();
        unsafe { host.load(entry) };
        assert_eq!(host.names(), vec!["add", "argc"]);
        assert!(host.contains("add"));
        assert!(!host.contains("sub"));
    }

    #[test]
    fn test_call_by_name() {
        let mut host = Host::new();
        unsafe { host.load(entry) };

        let sum = unsafe { host.call("add", &[PhasorValue::int(2), PhasorValue::int(40)]) };
        assert_eq!(sum, Some(PhasorValue::int(42)));

        let bad = unsafe { host.call("add", &[PhasorValue::int(2)]) };
        assert_eq!(bad, Some(PhasorValue::null()));

        let count = unsafe { host.call("argc", &[]) };
        assert_eq!(count, Some(PhasorValue::int(0)));

        assert!(unsafe { host.call("missing", &[]) }.is_none());
    }
}
