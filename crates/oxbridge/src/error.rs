//! Recoverable bridge errors.
//!
//! These cover conditions a caller can inspect and handle: a signature that
//! cannot be encoded, an encoding that cannot be parsed, a registry lookup on
//! an undefined class. Conditions that cannot be recovered from (a message
//! reaching the trampoline without a handler, say) are
//! [`BridgeFault`](crate::fault::BridgeFault)s instead.

use crate::signature::Shape;
use std::fmt;

/// Errors reported by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The native runtime rejected an operation.
    Runtime(oxrt::Error),

    /// A shape with no native encoding appears in a method signature.
    UnsupportedShape {
        /// 0 for the return value, `n` for the n-th declared parameter.
        position: usize,
        /// The offending shape.
        shape: Shape,
    },

    /// An encoding string does not describe a method signature.
    InvalidSignature {
        /// The rejected encoding.
        encoding: String,
    },

    /// The class was never defined in the registry.
    ClassNotDefined {
        /// Class name.
        name: String,
    },

    /// A native value does not have the shape the host side declared.
    ValueShapeMismatch {
        /// Parameter index (declared parameters only).
        index: usize,
        /// Declared shape.
        expected: Shape,
        /// Encoding of the value actually received, if any.
        got: Option<char>,
    },

    /// A method entry runs on a different host struct than its class binds.
    HostTypeMismatch {
        /// Class name.
        class: String,
        /// Host type the class binds.
        expected: &'static str,
        /// Host type the entry was built for.
        got: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Runtime(err) => write!(f, "Native runtime error: {err}"),
            Error::UnsupportedShape { position: 0, shape } => {
                write!(f, "Unsupported return shape {shape}")
            }
            Error::UnsupportedShape { position, shape } => {
                write!(f, "Unsupported shape {shape} for parameter {position}")
            }
            Error::InvalidSignature { encoding } => {
                write!(f, "Invalid method signature encoding: {encoding:?}")
            }
            Error::ClassNotDefined { name } => {
                write!(f, "Class '{name}' is not defined in the bridge registry")
            }
            Error::ValueShapeMismatch {
                index,
                expected,
                got: Some(got),
            } => write!(
                f,
                "Argument {index}: expected shape {expected}, got '{got}'"
            ),
            Error::ValueShapeMismatch {
                index,
                expected,
                got: None,
            } => write!(f, "Argument {index}: expected shape {expected}, got nothing"),
            Error::HostTypeMismatch {
                class,
                expected,
                got,
            } => write!(f, "Class '{class}' binds {expected}, not {got}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Runtime(err) => Some(err),
            _ => None,
        }
    }
}

impl From<oxrt::Error> for Error {
    fn from(err: oxrt::Error) -> Self {
        Error::Runtime(err)
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use oxrt::TypeCode;
    use std::error::Error as _;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::UnsupportedShape {
                position: 0,
                shape: Shape::Compound("CGRect"),
            }
            .to_string(),
            "Unsupported return shape {CGRect}"
        );
        assert_eq!(
            Error::ValueShapeMismatch {
                index: 1,
                expected: Shape::Primitive(TypeCode::Int),
                got: Some('d'),
            }
            .to_string(),
            "Argument 1: expected shape i, got 'd'"
        );
        assert_eq!(
            Error::HostTypeMismatch {
                class: "Meter".into(),
                expected: "Gauge",
                got: "Dial",
            }
            .to_string(),
            "Class 'Meter' binds Gauge, not Dial"
        );
    }

    #[test]
    fn test_runtime_source() {
        let err = Error::from(oxrt::Error::InvalidClassName);
        assert!(err.source().is_some());
        assert!(Error::ClassNotDefined { name: "X".into() }.source().is_none());
    }
}
