//! Method signature encoding.
//!
//! Host method types are described by [`Shape`]s. A primitive shape maps 1:1
//! onto a runtime [`TypeCode`]; a compound shape (a struct passed by value)
//! has no encoding in the runtime's grammar and is rejected rather than
//! truncated.
//!
//! Encoded signatures follow the runtime layout
//! `<return>@:<param1><param2>...`, where `@` and `:` are the hidden receiver
//! and selector every method takes.
//!
//! ```rust
//! use oxbridge::{MethodSignature, NativeType};
//!
//! let sig = MethodSignature::new(i32::SHAPE, vec![i32::SHAPE, f64::SHAPE]);
//! assert_eq!(sig.encode().unwrap(), "i@:id");
//! assert_eq!(MethodSignature::parse("i@:id").unwrap(), sig);
//! ```

use crate::error::{Error, Result};
use crate::handle::{Class, Handle, Object, Selector};
use oxrt::{TypeCode, Value};
use std::ffi::{c_char, c_void};
use std::fmt;

/// The native shape of a host type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A type with a native encoding.
    Primitive(TypeCode),
    /// A by-value aggregate, named for diagnostics.
    Compound(&'static str),
}

impl Shape {
    /// Whether values of this shape are native objects (`@` or `#`).
    #[must_use]
    pub const fn is_object(self) -> bool {
        matches!(self, Shape::Primitive(code) if code.is_object())
    }

    /// Encoding of a primitive shape.
    #[must_use]
    pub const fn type_code(self) -> Option<TypeCode> {
        match self {
            Shape::Primitive(code) => Some(code),
            Shape::Compound(_) => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Primitive(code) => write!(f, "{}", code.as_char()),
            Shape::Compound(name) => write!(f, "{{{name}}}"),
        }
    }
}

/// A host type that can cross the native boundary.
///
/// Implemented for the unit type, `bool`, the fixed-width integers, `isize`,
/// `usize`, floats, [`Handle`], [`Class`], [`Selector`], C strings and raw
/// pointers.
pub trait NativeType: Sized + 'static {
    /// Native shape of the type.
    const SHAPE: Shape;

    /// Converts into a tagged runtime value.
    fn into_value(self) -> Value;

    /// Converts from a tagged runtime value, `None` on a shape mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_native_type {
    ($($ty:ty => $code:ident, $variant:ident;)*) => {
        $(
            impl NativeType for $ty {
                const SHAPE: Shape = Shape::Primitive(TypeCode::$code);

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_native_type! {
    bool => Bool, Bool;
    i8 => Char, Char;
    u8 => UChar, UChar;
    i16 => Short, Short;
    u16 => UShort, UShort;
    i32 => Int, Int;
    u32 => UInt, UInt;
    i64 => LongLong, LongLong;
    u64 => ULongLong, ULongLong;
    f32 => Float, Float;
    f64 => Double, Double;
    *const c_char => CString, CString;
    *mut c_void => Pointer, Pointer;
}

impl NativeType for () {
    const SHAPE: Shape = Shape::Primitive(TypeCode::Void);

    fn into_value(self) -> Value {
        Value::Void
    }

    fn from_value(value: Value) -> Option<Self> {
        matches!(value, Value::Void).then_some(())
    }
}

impl NativeType for isize {
    const SHAPE: Shape = Shape::Primitive(TypeCode::LongLong);

    #[allow(clippy::cast_possible_truncation)]
    fn into_value(self) -> Value {
        Value::LongLong(self as i64)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::LongLong(v) => Some(v as isize),
            _ => None,
        }
    }
}

impl NativeType for usize {
    const SHAPE: Shape = Shape::Primitive(TypeCode::ULongLong);

    #[allow(clippy::cast_possible_truncation)]
    fn into_value(self) -> Value {
        Value::ULongLong(self as u64)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::ULongLong(v) => Some(v as usize),
            _ => None,
        }
    }
}

impl NativeType for Handle {
    const SHAPE: Shape = Shape::Primitive(TypeCode::Object);

    fn into_value(self) -> Value {
        Value::Object(self.id())
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_object().map(Handle::from_id)
    }
}

impl NativeType for Class {
    const SHAPE: Shape = Shape::Primitive(TypeCode::Class);

    fn into_value(self) -> Value {
        Value::Class(self.handle().id())
    }

    fn from_value(value: Value) -> Option<Self> {
        // Classes arrive as `@` when passed where an object is declared
        let id = value.as_object()?;
        if id.is_nil() {
            return Some(Class::NIL);
        }
        // SAFETY: values crossing the boundary refer to live objects
        unsafe { oxrt::ClassRef::from_id(id) }.map(Class::from_class_ref)
    }
}

impl NativeType for Selector {
    const SHAPE: Shape = Shape::Primitive(TypeCode::Selector);

    fn into_value(self) -> Value {
        Value::Selector(self.sel())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Selector(sel) => Some(Selector::from_sel(sel)),
            _ => None,
        }
    }
}

/// Return and parameter shapes of a host method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    ret: Shape,
    params: Vec<Shape>,
}

impl MethodSignature {
    /// Creates a signature from declared shapes (hidden parameters excluded).
    #[must_use]
    pub fn new(ret: Shape, params: Vec<Shape>) -> Self {
        MethodSignature { ret, params }
    }

    /// Return shape.
    #[must_use]
    pub fn ret(&self) -> Shape {
        self.ret
    }

    /// Declared parameter shapes.
    #[must_use]
    pub fn params(&self) -> &[Shape] {
        &self.params
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Encodes as `<return>@:<params>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedShape`] for the first compound shape, with
    /// position 0 for the return value and `n` for the n-th parameter.
    pub fn encode(&self) -> Result<String> {
        let code = |position: usize, shape: Shape| {
            shape
                .type_code()
                .map(TypeCode::as_char)
                .ok_or(Error::UnsupportedShape { position, shape })
        };

        let mut encoded = String::with_capacity(self.params.len() + 3);
        encoded.push(code(0, self.ret)?);
        encoded.push(TypeCode::Object.as_char());
        encoded.push(TypeCode::Selector.as_char());
        for (index, shape) in self.params.iter().enumerate() {
            encoded.push(code(index + 1, *shape)?);
        }
        Ok(encoded)
    }

    /// Parses an encoding produced by [`MethodSignature::encode`] (or any
    /// valid runtime method encoding).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if the runtime rejects the encoding.
    pub fn parse(encoded: &str) -> Result<Self> {
        let (ret, args) =
            oxrt::encoding::parse_signature(encoded).map_err(|_| Error::InvalidSignature {
                encoding: encoded.to_string(),
            })?;

        Ok(MethodSignature {
            ret: Shape::Primitive(ret),
            params: args[2..].iter().copied().map(Shape::Primitive).collect(),
        })
    }

    /// Reads one value per declared parameter from a native argument array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedShape`] if a parameter is compound.
    ///
    /// # Safety
    ///
    /// `args` must point to at least [`MethodSignature::arity`] argument
    /// pointers, each pointing at a slot holding a value of the declared
    /// encoding.
    pub unsafe fn decode_args(&self, args: *const *mut u8) -> Result<Vec<Value>> {
        self.params
            .iter()
            .enumerate()
            .map(|(index, shape)| {
                let code = shape.type_code().ok_or(Error::UnsupportedShape {
                    position: index + 1,
                    shape: *shape,
                })?;
                // SAFETY: the caller guarantees one valid slot per parameter
                Ok(unsafe { Value::read_from(code, *args.add(index)) })
            })
            .collect()
    }

    /// Writes `value` into a native return slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueShapeMismatch`] (index 0) if `value` does not fit
    /// the return shape.
    ///
    /// # Safety
    ///
    /// `ret` must be valid for writes of the return type's size.
    pub unsafe fn encode_return(&self, value: Value, ret: *mut u8) -> Result<()> {
        let fits = self.ret.type_code().is_some_and(|code| value.fits(code));
        if !fits {
            return Err(Error::ValueShapeMismatch {
                index: 0,
                expected: self.ret,
                got: Some(value.type_code().as_char()),
            });
        }
        // SAFETY: forwarded to caller
        unsafe { value.write_to(ret) };
        Ok(())
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@:", self.ret)?;
        for shape in &self.params {
            write!(f, "{shape}")?;
        }
        Ok(())
    }
}
