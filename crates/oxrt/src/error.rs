//! Error types for the `OxideC` native runtime.
//!
//! Every fallible runtime primitive (class pair allocation, method
//! installation, message send) reports through [`Error`]. Nothing in this
//! crate aborts; deciding whether a failure is fatal is left to the caller.

use std::fmt;

/// Errors that can occur in the native runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Class name already exists (registered or pending registration).
    ClassAlreadyExists {
        /// The requested class name.
        name: String,
    },

    /// Class names must be non-empty and free of NUL bytes.
    InvalidClassName,

    /// Superclass is not a registered class.
    InvalidSuperclass {
        /// Name of the superclass that was rejected.
        name: String,
    },

    /// Class pair was already registered.
    ClassAlreadyRegistered {
        /// The class name.
        name: String,
    },

    /// Instances can only be allocated from registered classes.
    ClassNotRegistered {
        /// The class name.
        name: String,
    },

    /// Invalid type encoding string.
    InvalidEncoding {
        /// The rejected encoding.
        encoding: String,
    },

    /// Selector not found in class or inheritance chain.
    SelectorNotFound {
        /// Class of the receiver.
        class: String,
        /// The selector that was sent.
        selector: String,
    },

    /// Message sent to nil.
    NilReceiver {
        /// The selector that was sent.
        selector: String,
    },

    /// Argument count mismatch for method signature.
    ArgumentCountMismatch {
        /// Expected number of arguments (hidden self and _cmd excluded).
        expected: usize,
        /// Actual number of arguments provided.
        got: usize,
    },

    /// Argument type mismatch for method signature.
    ArgumentTypeMismatch {
        /// Expected type encoding.
        expected: char,
        /// Actual type encoding.
        got: char,
        /// Argument index (hidden self and _cmd excluded).
        index: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ClassAlreadyExists { name } => {
                write!(f, "Class '{name}' already exists")
            }
            Error::InvalidClassName => write!(f, "Invalid class name"),
            Error::InvalidSuperclass { name } => {
                write!(f, "Superclass '{name}' is not a registered class")
            }
            Error::ClassAlreadyRegistered { name } => {
                write!(f, "Class '{name}' is already registered")
            }
            Error::ClassNotRegistered { name } => {
                write!(f, "Class '{name}' is not registered")
            }
            Error::InvalidEncoding { encoding } => {
                write!(f, "Invalid type encoding string: {encoding:?}")
            }
            Error::SelectorNotFound { class, selector } => {
                write!(f, "-[{class} {selector}]: unrecognized selector")
            }
            Error::NilReceiver { selector } => {
                write!(f, "Message '{selector}' sent to nil")
            }
            Error::ArgumentCountMismatch { expected, got } => {
                write!(
                    f,
                    "Argument count mismatch: expected {expected}, got {got}"
                )
            }
            Error::ArgumentTypeMismatch {
                expected,
                got,
                index,
            } => {
                write!(
                    f,
                    "Argument type mismatch at index {index}: expected '{expected}', got '{got}'"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for native runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::SelectorNotFound {
                class: "Widget".into(),
                selector: "frobnicate".into(),
            }
            .to_string(),
            "-[Widget frobnicate]: unrecognized selector"
        );
        assert_eq!(
            Error::ArgumentTypeMismatch {
                expected: 'i',
                got: 'd',
                index: 1,
            }
            .to_string(),
            "Argument type mismatch at index 1: expected 'i', got 'd'"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::InvalidClassName, Error::InvalidClassName);
        assert_ne!(
            Error::ArgumentCountMismatch {
                expected: 1,
                got: 2
            },
            Error::ArgumentCountMismatch {
                expected: 2,
                got: 2
            }
        );
    }
}
