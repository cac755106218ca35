//!
//! Native Function Arguments
//!
//! Decodes the `(argc, argv)` pair a native function receives into a
//! bounds-checked list with typed getters. Getters are strict: an `int`
//! parameter only accepts INT values, a string parameter only STRING values.
//!

use std::ffi::{CStr, c_int};

use thiserror::Error;

use crate::value::{PhasorValue, PhasorValueType, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: usize, got: usize },

    #[error("missing argument {index}")]
    Missing { index: usize },

    #[error("argument {index} must be {expected}, got {found}")]
    Type {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
}

/// Arguments of one native call
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [PhasorValue],
}

impl<'a> Args<'a> {
    /// Wrap the raw arguments of a native call.
    ///
    /// A negative `argc` or a null `argv` yields an empty list.
    ///
    /// # Safety
    /// `argv` must point to `argc` values whose string and array payloads stay
    /// valid for `'a`.
    pub unsafe fn from_raw(argc: c_int, argv: *const PhasorValue) -> Self {
        let values = match usize::try_from(argc) {
            Ok(len) if len > 0 && !argv.is_null() => unsafe { std::slice::from_raw_parts(argv, len) },
            _ => &[],
        };
        Self { values }
    }

    /// # Safety
    /// Payload pointers inside `values` must stay valid for `'a`.
    pub unsafe fn from_slice(values: &'a [PhasorValue]) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn arity(&self, expected: usize) -> Result<(), ArgError> {
        if self.values.len() == expected {
            Ok(())
        } else {
            Err(ArgError::Arity {
                expected,
                got: self.values.len(),
            })
        }
    }

    pub fn raw(&self, index: usize) -> Result<&'a PhasorValue, ArgError> {
        self.values.get(index).ok_or(ArgError::Missing { index })
    }

    pub fn int(&self, index: usize) -> Result<i64, ArgError> {
        let value = self.raw(index)?;
        value.as_int().ok_or_else(|| type_error(index, PhasorValueType::Int, value))
    }

    pub fn str(&self, index: usize) -> Result<&'a CStr, ArgError> {
        let value = self.raw(index)?;
        // SAFETY: payload validity is the constructor's contract
        unsafe { value.as_str() }.ok_or_else(|| type_error(index, PhasorValueType::String, value))
    }

    pub fn value(&self, index: usize) -> Result<Value<'a>, ArgError> {
        let value = self.raw(index)?;
        // SAFETY: payload validity is the constructor's contract
        unsafe { value.view() }.ok_or(ArgError::Type {
            index,
            expected: "a well-formed value",
            found: kind_name(value),
        })
    }
}

fn kind_name(value: &PhasorValue) -> &'static str {
    value.kind().map_or("an unknown type", PhasorValueType::name)
}

fn type_error(index: usize, expected: PhasorValueType, found: &PhasorValue) -> ArgError {
    ArgError::Type {
        index,
        expected: expected.name(),
        found: kind_name(found),
    }
}
