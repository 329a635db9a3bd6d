//! Tagged values crossing the message-send boundary.
//!
//! Method implementations never see a [`Value`]: they receive one raw
//! argument slot per declared parameter and one raw return slot, and must
//! read and write those according to the method's type encoding. `Value` is
//! how callers of [`msg_send`](crate::msg_send) describe arguments and
//! receive results, and how code on either side of an `Imp` moves between
//! typed data and slots.

#![allow(clippy::cast_ptr_alignment)]

use crate::encoding::TypeCode;
use crate::object::Id;
use crate::selector::Sel;
use std::ffi::{c_char, c_void};

/// Storage for one argument or return value.
///
/// Sixteen bytes, eight-byte aligned; large enough for every type the
/// encoding grammar admits.
pub type Slot = [u64; 2];

/// A value tagged with its encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// `v`
    Void,
    /// `@`
    Object(Id),
    /// `#`, carried as the class object
    Class(Id),
    /// `:`
    Selector(Sel),
    /// `B`
    Bool(bool),
    /// `c`
    Char(i8),
    /// `C`
    UChar(u8),
    /// `s`
    Short(i16),
    /// `S`
    UShort(u16),
    /// `i`
    Int(i32),
    /// `I`
    UInt(u32),
    /// `l`
    Long(i64),
    /// `L`
    ULong(u64),
    /// `q`
    LongLong(i64),
    /// `Q`
    ULongLong(u64),
    /// `f`
    Float(f32),
    /// `d`
    Double(f64),
    /// `*`
    CString(*const c_char),
    /// `^`
    Pointer(*mut c_void),
}

impl Value {
    /// Returns the encoding of this value.
    #[must_use]
    pub const fn type_code(&self) -> TypeCode {
        match self {
            Value::Void => TypeCode::Void,
            Value::Object(_) => TypeCode::Object,
            Value::Class(_) => TypeCode::Class,
            Value::Selector(_) => TypeCode::Selector,
            Value::Bool(_) => TypeCode::Bool,
            Value::Char(_) => TypeCode::Char,
            Value::UChar(_) => TypeCode::UChar,
            Value::Short(_) => TypeCode::Short,
            Value::UShort(_) => TypeCode::UShort,
            Value::Int(_) => TypeCode::Int,
            Value::UInt(_) => TypeCode::UInt,
            Value::Long(_) => TypeCode::Long,
            Value::ULong(_) => TypeCode::ULong,
            Value::LongLong(_) => TypeCode::LongLong,
            Value::ULongLong(_) => TypeCode::ULongLong,
            Value::Float(_) => TypeCode::Float,
            Value::Double(_) => TypeCode::Double,
            Value::CString(_) => TypeCode::CString,
            Value::Pointer(_) => TypeCode::Pointer,
        }
    }

    /// Whether this value may be passed where `code` is declared.
    ///
    /// Exact matches always fit. A class is an object, so `#` values also
    /// fit `@` parameters.
    #[must_use]
    pub fn fits(&self, code: TypeCode) -> bool {
        let own = self.type_code();
        own == code || (own == TypeCode::Class && code == TypeCode::Object)
    }

    /// Returns the object carried by an `@` or `#` value.
    #[must_use]
    pub const fn as_object(&self) -> Option<Id> {
        match self {
            Value::Object(id) | Value::Class(id) => Some(*id),
            _ => None,
        }
    }

    /// Writes this value into a slot.
    ///
    /// `Void` writes nothing.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `self.type_code().size()` bytes.
    pub unsafe fn write_to(self, dst: *mut u8) {
        // SAFETY: caller guarantees dst is writable for the value's size
        unsafe {
            match self {
                Value::Void => {}
                Value::Object(id) | Value::Class(id) => {
                    dst.cast::<*mut c_void>().write_unaligned(id.as_ptr());
                }
                Value::Selector(sel) => {
                    dst.cast::<*mut c_void>().write_unaligned(sel.as_ptr());
                }
                Value::Bool(v) => dst.cast::<bool>().write_unaligned(v),
                Value::Char(v) => dst.cast::<i8>().write_unaligned(v),
                Value::UChar(v) => dst.write_unaligned(v),
                Value::Short(v) => dst.cast::<i16>().write_unaligned(v),
                Value::UShort(v) => dst.cast::<u16>().write_unaligned(v),
                Value::Int(v) => dst.cast::<i32>().write_unaligned(v),
                Value::UInt(v) => dst.cast::<u32>().write_unaligned(v),
                Value::Long(v) | Value::LongLong(v) => {
                    dst.cast::<i64>().write_unaligned(v);
                }
                Value::ULong(v) | Value::ULongLong(v) => {
                    dst.cast::<u64>().write_unaligned(v);
                }
                Value::Float(v) => dst.cast::<f32>().write_unaligned(v),
                Value::Double(v) => dst.cast::<f64>().write_unaligned(v),
                Value::CString(p) => {
                    dst.cast::<*const c_char>().write_unaligned(p);
                }
                Value::Pointer(p) => {
                    dst.cast::<*mut c_void>().write_unaligned(p);
                }
            }
        }
    }

    /// Reads a value of type `code` from a slot.
    ///
    /// A null selector slot reads as `Void`, since no selector is null.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `code.size()` bytes and hold a value
    /// written for `code` (for `:` it must hold a selector pointer). A bool
    /// slot must hold `0` or `1`.
    #[must_use]
    pub unsafe fn read_from(code: TypeCode, src: *const u8) -> Value {
        // SAFETY: caller guarantees src holds a value of type `code`
        unsafe {
            match code {
                TypeCode::Void => Value::Void,
                TypeCode::Object => Value::Object(Id::from_ptr(
                    src.cast::<*mut c_void>().read_unaligned(),
                )),
                TypeCode::Class => Value::Class(Id::from_ptr(
                    src.cast::<*mut c_void>().read_unaligned(),
                )),
                TypeCode::Selector => {
                    match Sel::from_ptr(src.cast::<*mut c_void>().read_unaligned()) {
                        Some(sel) => Value::Selector(sel),
                        None => Value::Void,
                    }
                }
                TypeCode::Bool => Value::Bool(src.cast::<bool>().read_unaligned()),
                TypeCode::Char => Value::Char(src.cast::<i8>().read_unaligned()),
                TypeCode::UChar => Value::UChar(src.read_unaligned()),
                TypeCode::Short => Value::Short(src.cast::<i16>().read_unaligned()),
                TypeCode::UShort => Value::UShort(src.cast::<u16>().read_unaligned()),
                TypeCode::Int => Value::Int(src.cast::<i32>().read_unaligned()),
                TypeCode::UInt => Value::UInt(src.cast::<u32>().read_unaligned()),
                TypeCode::Long => Value::Long(src.cast::<i64>().read_unaligned()),
                TypeCode::ULong => Value::ULong(src.cast::<u64>().read_unaligned()),
                TypeCode::LongLong => {
                    Value::LongLong(src.cast::<i64>().read_unaligned())
                }
                TypeCode::ULongLong => {
                    Value::ULongLong(src.cast::<u64>().read_unaligned())
                }
                TypeCode::Float => Value::Float(src.cast::<f32>().read_unaligned()),
                TypeCode::Double => Value::Double(src.cast::<f64>().read_unaligned()),
                TypeCode::CString => {
                    Value::CString(src.cast::<*const c_char>().read_unaligned())
                }
                TypeCode::Pointer => {
                    Value::Pointer(src.cast::<*mut c_void>().read_unaligned())
                }
            }
        }
    }
}
