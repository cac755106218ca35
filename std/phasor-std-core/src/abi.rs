//!
//! Plugin ABI
//!
//! The host hands a plugin a `PhasorAPI` table and an opaque VM pointer when it
//! calls the plugin's `phasor_plugin_entry`. The plugin registers native
//! functions by name; the VM later calls them with `(vm, argc, argv)` and
//! takes back a `PhasorValue`.
//!

use std::ffi::{CStr, c_char, c_int};

use crate::value::PhasorValue;

/// Opaque pointer to the Phasor virtual machine
#[repr(C)]
pub struct PhasorVM {
    _private: [u8; 0],
}

/// Signature of a native function callable from Phasor code
pub type PhasorNativeFunction =
    unsafe extern "C" fn(vm: *mut PhasorVM, argc: c_int, argv: *const PhasorValue) -> PhasorValue;

/// Host callback registering a native function under a name
pub type PhasorRegisterFunction =
    unsafe extern "C" fn(vm: *mut PhasorVM, name: *const c_char, func: PhasorNativeFunction);

/// Host API table passed to the plugin entry point
#[repr(C)]
pub struct PhasorAPI {
    pub register_function: Option<PhasorRegisterFunction>,
}

/// Signature of the `phasor_plugin_entry` symbol every plugin exports
pub type PhasorPluginEntry = unsafe extern "C" fn(api: *const PhasorAPI, vm: *mut PhasorVM);

/// Registers native functions through a host API table
#[derive(Clone, Copy)]
pub struct Registrar {
    register: PhasorRegisterFunction,
    vm: *mut PhasorVM,
}

impl Registrar {
    /// Wrap the arguments of `phasor_plugin_entry`.
    ///
    /// Returns `None` when `api` is null or carries no register callback.
    ///
    /// # Safety
    /// `api` must be null or point to a valid `PhasorAPI`, and `vm` must be the
    /// VM pointer passed alongside it.
    pub unsafe fn new(api: *const PhasorAPI, vm: *mut PhasorVM) -> Option<Self> {
        let api = unsafe { api.as_ref() }?;
        Some(Self {
            register: api.register_function?,
            vm,
        })
    }

    pub fn register(&self, name: &CStr, func: PhasorNativeFunction) {
        // SAFETY: callback and vm were vouched for in `new`
        unsafe { (self.register)(self.vm, name.as_ptr(), func) }
    }
}
