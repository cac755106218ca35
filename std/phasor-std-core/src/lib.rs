//!
//! phasor-std-core - Phasor ABI Types
//!
//! This crate provides the types shared by Phasor native plugins:
//!
//! - `PhasorValue` and `PhasorValueType`, the tagged union crossing the VM boundary
//! - `Value`, a borrowed enum view over a `PhasorValue`
//! - `PhasorVM`, `PhasorAPI` and the native function signatures
//! - `Args` for decoding `(argc, argv)` and `Registrar` for registering functions
//! - `HandleRegistry`, the handle table plugins use to expose native resources
//! - `Host`, an in-process implementation of the host side of the ABI
//!
//! The layout of every `#[repr(C)]` type matches the Phasor FFI header, so a
//! plugin built on this crate loads into any Phasor VM without glue.
//!

pub mod abi;
pub mod args;
pub mod host;
pub mod registry;
pub mod value;

pub use abi::*;
pub use args::*;
pub use host::*;
pub use registry::*;
pub use value::*;
