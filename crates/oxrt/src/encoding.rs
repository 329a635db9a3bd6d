//! Type encoding for method signatures.
//!
//! The runtime describes every method with an `@encode()`-style string: one
//! character per type, return type first, then the two hidden parameters
//! every method receives (`@` self, `:` _cmd), then the declared parameters.
//!
//! | code | type | size |
//! |---|---|---|
//! | `v` | void | 0 |
//! | `@` | object (`Id`) | 8 |
//! | `#` | class | 8 |
//! | `:` | selector (`Sel`) | 8 |
//! | `B` | bool | 1 |
//! | `c` / `C` | i8 / u8 | 1 |
//! | `s` / `S` | i16 / u16 | 2 |
//! | `i` / `I` | i32 / u32 | 4 |
//! | `l` / `L` | long / unsigned long (64-bit) | 8 |
//! | `q` / `Q` | long long / unsigned long long | 8 |
//! | `f` / `d` | f32 / f64 | 4 / 8 |
//! | `*` | C string | 8 |
//! | `^` | untyped pointer | 8 |
//!
//! Example encodings:
//! - `"v@:"` - void return, no declared parameters
//! - `"i@:i"` - int return, one int parameter
//! - `"v@:@*"` - void return, an object and a C string

use crate::error::{Error, Result};
use std::fmt;

/// Encoding strings for the types the runtime itself installs.
pub mod types {
    /// Void type encoding
    pub const VOID: &str = "v";

    /// Object (id) type encoding
    pub const OBJECT: &str = "@";

    /// Class type encoding
    pub const CLASS: &str = "#";

    /// Selector (SEL) type encoding
    pub const SELECTOR: &str = ":";

    /// Bool type encoding
    pub const BOOL: &str = "B";

    /// Int (i32) type encoding
    pub const INT: &str = "i";

    /// Unsigned long long (u64) type encoding
    pub const UNSIGNED_LONG_LONG: &str = "Q";

    /// C string (char*) type encoding
    pub const C_STRING: &str = "*";
}

/// A single-character type code of the encoding grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// `v`
    Void,
    /// `@`
    Object,
    /// `#`
    Class,
    /// `:`
    Selector,
    /// `B`
    Bool,
    /// `c`
    Char,
    /// `C`
    UChar,
    /// `s`
    Short,
    /// `S`
    UShort,
    /// `i`
    Int,
    /// `I`
    UInt,
    /// `l`
    Long,
    /// `L`
    ULong,
    /// `q`
    LongLong,
    /// `Q`
    ULongLong,
    /// `f`
    Float,
    /// `d`
    Double,
    /// `*`
    CString,
    /// `^`
    Pointer,
}

impl TypeCode {
    /// Every code of the grammar, in table order.
    pub const ALL: [TypeCode; 19] = [
        TypeCode::Void,
        TypeCode::Object,
        TypeCode::Class,
        TypeCode::Selector,
        TypeCode::Bool,
        TypeCode::Char,
        TypeCode::UChar,
        TypeCode::Short,
        TypeCode::UShort,
        TypeCode::Int,
        TypeCode::UInt,
        TypeCode::Long,
        TypeCode::ULong,
        TypeCode::LongLong,
        TypeCode::ULongLong,
        TypeCode::Float,
        TypeCode::Double,
        TypeCode::CString,
        TypeCode::Pointer,
    ];

    /// Returns the encoding character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            TypeCode::Void => 'v',
            TypeCode::Object => '@',
            TypeCode::Class => '#',
            TypeCode::Selector => ':',
            TypeCode::Bool => 'B',
            TypeCode::Char => 'c',
            TypeCode::UChar => 'C',
            TypeCode::Short => 's',
            TypeCode::UShort => 'S',
            TypeCode::Int => 'i',
            TypeCode::UInt => 'I',
            TypeCode::Long => 'l',
            TypeCode::ULong => 'L',
            TypeCode::LongLong => 'q',
            TypeCode::ULongLong => 'Q',
            TypeCode::Float => 'f',
            TypeCode::Double => 'd',
            TypeCode::CString => '*',
            TypeCode::Pointer => '^',
        }
    }

    /// Parses an encoding character.
    ///
    /// ```
    /// use oxrt::TypeCode;
    ///
    /// assert_eq!(TypeCode::from_char('i'), Some(TypeCode::Int));
    /// assert_eq!(TypeCode::from_char('{'), None);
    /// ```
    #[must_use]
    pub const fn from_char(ch: char) -> Option<Self> {
        let code = match ch {
            'v' => TypeCode::Void,
            '@' => TypeCode::Object,
            '#' => TypeCode::Class,
            ':' => TypeCode::Selector,
            'B' => TypeCode::Bool,
            'c' => TypeCode::Char,
            'C' => TypeCode::UChar,
            's' => TypeCode::Short,
            'S' => TypeCode::UShort,
            'i' => TypeCode::Int,
            'I' => TypeCode::UInt,
            'l' => TypeCode::Long,
            'L' => TypeCode::ULong,
            'q' => TypeCode::LongLong,
            'Q' => TypeCode::ULongLong,
            'f' => TypeCode::Float,
            'd' => TypeCode::Double,
            '*' => TypeCode::CString,
            '^' => TypeCode::Pointer,
            _ => return None,
        };
        Some(code)
    }

    /// Returns the size in bytes of a value of this type.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn size(self) -> usize {
        match self {
            TypeCode::Void => 0,
            TypeCode::Bool | TypeCode::Char | TypeCode::UChar => 1,
            TypeCode::Short | TypeCode::UShort => 2,
            TypeCode::Int | TypeCode::UInt | TypeCode::Float => 4,
            TypeCode::Long | TypeCode::ULong => 8,
            TypeCode::LongLong | TypeCode::ULongLong | TypeCode::Double => 8,
            TypeCode::Object
            | TypeCode::Class
            | TypeCode::Selector
            | TypeCode::CString
            | TypeCode::Pointer => 8,
        }
    }

    /// Returns `true` for `@` and `#`, the codes that carry an object.
    #[must_use]
    pub const fn is_object(self) -> bool {
        matches!(self, TypeCode::Object | TypeCode::Class)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Validates a type encoding string for a method signature.
///
/// A method signature must have a return type followed by the hidden self
/// (`@`) and _cmd (`:`) parameters.
///
/// ```
/// use oxrt::encoding::validate_encoding;
///
/// assert!(validate_encoding("v@:").is_ok());
/// assert!(validate_encoding("i@:i").is_ok());
/// assert!(validate_encoding("v@:{CGRect=dddd}").is_err());
/// assert!(validate_encoding("@").is_err());
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] if the string is empty, contains a
/// character outside the grammar, or lacks the hidden parameters.
pub fn validate_encoding(encoding: &str) -> Result<()> {
    parse_signature(encoding).map(|_| ())
}

/// Parses a method signature encoding into return type and argument types.
///
/// The returned argument list still contains the hidden self and _cmd codes.
///
/// ```
/// use oxrt::{TypeCode, encoding::parse_signature};
///
/// let (ret, args) = parse_signature("i@:if").unwrap();
/// assert_eq!(ret, TypeCode::Int);
/// assert_eq!(
///     args,
///     vec![TypeCode::Object, TypeCode::Selector, TypeCode::Int, TypeCode::Float]
/// );
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] under the same conditions as
/// [`validate_encoding`].
pub fn parse_signature(encoding: &str) -> Result<(TypeCode, Vec<TypeCode>)> {
    let invalid = || Error::InvalidEncoding {
        encoding: encoding.to_string(),
    };

    let mut codes = encoding.chars().map(TypeCode::from_char);
    let return_type = codes.next().flatten().ok_or_else(invalid)?;
    let arg_types = codes.collect::<Option<Vec<_>>>().ok_or_else(invalid)?;

    // All methods receive self and _cmd
    if arg_types.len() < 2
        || arg_types[0] != TypeCode::Object
        || arg_types[1] != TypeCode::Selector
    {
        return Err(invalid());
    }

    if arg_types.iter().any(|code| *code == TypeCode::Void) {
        return Err(invalid());
    }

    Ok((return_type, arg_types))
}
