//!
//! Boundary Value Representation
//!
//! Every argument and return value crossing the Phasor VM boundary is a
//! `PhasorValue`: a C `int` type tag followed by a union wide enough for an
//! `int64_t`, a `double`, a string pointer, or an `(elements, count)` array
//! reference. The layout mirrors `PhasorFFI.hpp` exactly.
//!
//! Fields are private so a value built on the Rust side always carries the
//! union member its tag names. Values that arrive from the VM are only
//! reachable through `Args`, whose constructor carries that obligation.
//!
//! Strings and arrays are borrowed pointers: the VM copies strings handed to
//! it, and strings handed to a plugin stay valid for the duration of the call.
//!

use std::ffi::{CStr, c_char, c_int};
use std::fmt;

/// Type tags, numbered as in the C header
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhasorValueType {
    Null = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Array = 5,
}

impl PhasorValueType {
    /// Decode a raw tag, `None` for tags this ABI version does not define
    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            0 => Some(Self::Null),
            1 => Some(Self::Bool),
            2 => Some(Self::Int),
            3 => Some(Self::Float),
            4 => Some(Self::String),
            5 => Some(Self::Array),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
        }
    }
}

/// Array payload: a borrowed run of `count` values
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PhasorArray {
    pub elements: *const PhasorValue,
    pub count: usize,
}

#[repr(C)]
#[derive(Clone, Copy)]
union PhasorValueData {
    b: bool,
    i: i64,
    f: f64,
    s: *const c_char,
    a: PhasorArray,
}

/// A value in the Phasor VM
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PhasorValue {
    kind: c_int,
    data: PhasorValueData,
}

impl PhasorValue {
    pub fn null() -> Self {
        Self {
            kind: PhasorValueType::Null as c_int,
            data: PhasorValueData { i: 0 },
        }
    }

    pub fn bool(b: bool) -> Self {
        Self {
            kind: PhasorValueType::Bool as c_int,
            data: PhasorValueData { b },
        }
    }

    pub fn int(i: i64) -> Self {
        Self {
            kind: PhasorValueType::Int as c_int,
            data: PhasorValueData { i },
        }
    }

    pub fn float(f: f64) -> Self {
        Self {
            kind: PhasorValueType::Float as c_int,
            data: PhasorValueData { f },
        }
    }

    /// A string value pointing at `s`.
    ///
    /// The value does not own the bytes; `s` must outlive every read of the
    /// returned value.
    pub fn string(s: &CStr) -> Self {
        Self {
            kind: PhasorValueType::String as c_int,
            data: PhasorValueData { s: s.as_ptr() },
        }
    }

    /// An array value borrowing `elements`, under the same lifetime rule as `string`
    pub fn array(elements: &[PhasorValue]) -> Self {
        Self {
            kind: PhasorValueType::Array as c_int,
            data: PhasorValueData {
                a: PhasorArray {
                    elements: elements.as_ptr(),
                    count: elements.len(),
                },
            },
        }
    }

    /// Raw C tag as stored in the value
    pub fn raw_kind(&self) -> c_int {
        self.kind
    }

    pub fn kind(&self) -> Option<PhasorValueType> {
        PhasorValueType::from_raw(self.kind)
    }

    pub fn is_null(&self) -> bool {
        self.kind == PhasorValueType::Null as c_int
    }

    pub fn is_bool(&self) -> bool {
        self.kind == PhasorValueType::Bool as c_int
    }

    pub fn is_int(&self) -> bool {
        self.kind == PhasorValueType::Int as c_int
    }

    pub fn is_float(&self) -> bool {
        self.kind == PhasorValueType::Float as c_int
    }

    pub fn is_string(&self) -> bool {
        self.kind == PhasorValueType::String as c_int
    }

    pub fn is_array(&self) -> bool {
        self.kind == PhasorValueType::Array as c_int
    }

    pub fn is_number(&self) -> bool {
        self.is_int() || self.is_float()
    }

    pub fn as_bool(&self) -> Option<bool> {
        // SAFETY: the tag names the initialized member
        self.is_bool().then(|| unsafe { self.data.b })
    }

    pub fn as_int(&self) -> Option<i64> {
        // SAFETY: the tag names the initialized member
        self.is_int().then(|| unsafe { self.data.i })
    }

    /// Float payload; ints widen the way `phasor_to_float` does
    pub fn as_float(&self) -> Option<f64> {
        match self.kind() {
            // SAFETY: the tag names the initialized member
            Some(PhasorValueType::Float) => Some(unsafe { self.data.f }),
            Some(PhasorValueType::Int) => Some(unsafe { self.data.i } as f64),
            _ => None,
        }
    }

    /// Borrow the string payload.
    ///
    /// # Safety
    /// The pointer stored in the value must still reference a live,
    /// NUL-terminated string for the chosen lifetime `'a`.
    pub unsafe fn as_str<'a>(&self) -> Option<&'a CStr> {
        if !self.is_string() {
            return None;
        }
        let ptr = unsafe { self.data.s };
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(ptr) })
    }

    /// Borrow the array payload.
    ///
    /// # Safety
    /// The element pointer must still reference `count` live values for `'a`.
    pub unsafe fn as_array<'a>(&self) -> Option<&'a [PhasorValue]> {
        if !self.is_array() {
            return None;
        }
        let PhasorArray { elements, count } = unsafe { self.data.a };
        if count == 0 {
            return Some(&[]);
        }
        if elements.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(elements, count) })
    }

    /// Safe enum view of the value, `None` for unknown tags or null payload pointers.
    ///
    /// # Safety
    /// Same contract as `as_str` and `as_array`.
    pub unsafe fn view<'a>(&self) -> Option<Value<'a>> {
        let value = match self.kind()? {
            PhasorValueType::Null => Value::Null,
            PhasorValueType::Bool => Value::Bool(self.as_bool()?),
            PhasorValueType::Int => Value::Int(self.as_int()?),
            PhasorValueType::Float => Value::Float(self.as_float()?),
            PhasorValueType::String => Value::Str(unsafe { self.as_str()? }),
            PhasorValueType::Array => Value::Array(unsafe { self.as_array()? }),
        };
        Some(value)
    }
}

impl Default for PhasorValue {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for PhasorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("PhasorValue");
        match self.kind() {
            Some(kind) => out.field("kind", &kind),
            None => out.field("kind", &self.kind),
        };
        if let Some(b) = self.as_bool() {
            out.field("b", &b);
        } else if let Some(i) = self.as_int() {
            out.field("i", &i);
        } else if let Some(x) = self.as_float() {
            out.field("f", &x);
        } else if self.is_string() {
            // SAFETY: the tag names the initialized member; the pointer is not dereferenced
            out.field("s", &unsafe { self.data.s });
        } else if self.is_array() {
            // SAFETY: as above
            out.field("a", &unsafe { self.data.a });
        }
        out.finish()
    }
}

/// Borrowed enum view of a `PhasorValue`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a CStr),
    Array(&'a [PhasorValue]),
}

impl Value<'_> {
    pub fn kind(&self) -> PhasorValueType {
        match self {
            Value::Null => PhasorValueType::Null,
            Value::Bool(_) => PhasorValueType::Bool,
            Value::Int(_) => PhasorValueType::Int,
            Value::Float(_) => PhasorValueType::Float,
            Value::Str(_) => PhasorValueType::String,
            Value::Array(_) => PhasorValueType::Array,
        }
    }

    /// Re-encode as a boundary value borrowing the same payload
    pub fn to_phasor(&self) -> PhasorValue {
        match *self {
            Value::Null => PhasorValue::null(),
            Value::Bool(b) => PhasorValue::bool(b),
            Value::Int(i) => PhasorValue::int(i),
            Value::Float(f) => PhasorValue::float(f),
            Value::Str(s) => PhasorValue::string(s),
            Value::Array(a) => PhasorValue::array(a),
        }
    }
}

impl PartialEq for PhasorValue {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind() {
            Some(PhasorValueType::Null) => true,
            Some(PhasorValueType::Bool) => self.as_bool() == other.as_bool(),
            Some(PhasorValueType::Int) => self.as_int() == other.as_int(),
            Some(PhasorValueType::Float) => self.as_float() == other.as_float(),
            // SAFETY: the tag names the initialized member; pointers are compared, not read
            Some(PhasorValueType::String) => unsafe { self.data.s == other.data.s },
            Some(PhasorValueType::Array) => unsafe {
                self.data.a.elements == other.data.a.elements
                    && self.data.a.count == other.data.a.count
            },
            None => false,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s.to_string_lossy()),
            Value::Array(a) => write!(f, "[array of {}]", a.len()),
        }
    }
}
