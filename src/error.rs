//! Error types for midibus.
//!
//! All errors are strongly typed using thiserror, grouped by family:
//! structural problems with raw bytes, bad arguments to constructors,
//! and values outside their valid bit ranges. Handler failures raised
//! during dispatch are carried through unchanged.
//!
//! Unclassifiable input is not an error; it becomes an `Unknown` message.

use thiserror::Error;

/// Raw byte windows that cannot form a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("Message data cannot be empty")]
    Empty,

    #[error("Message data has {actual} bytes, at most 3 are allowed")]
    TooLong {
        actual: usize,
    },

    #[error("{kind} requires at least {expected} bytes, got {actual}")]
    TooShort {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Invalid argument combinations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Subscription requires a handler")]
    MissingHandler,

    #[error("Subscription was given more than one handler")]
    ConflictingHandlers,

    #[error("{kind} takes at most {max} field bytes, got {actual}")]
    TooManyFields {
        kind: &'static str,
        max: usize,
        actual: usize,
    },
}

/// Values with bits outside their valid range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("Status {value:#04x} has bits outside the status mask 0xF0")]
    Status {
        value: u8,
    },

    #[error("Channel {value} is out of range [0, 16)")]
    Channel {
        value: u8,
    },

    #[error("Number {value} is out of range [0, 128)")]
    Number {
        value: u8,
    },

    #[error("Pitch bend value {value} is not a finite number")]
    PitchBend {
        value: f64,
    },
}

/// Top-level error type for midibus.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Argument error: {0}")]
    Argument(#[from] ArgumentError),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl InputError {
    /// Wraps a failure raised inside a subscriber handler.
    #[must_use]
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns true if this is a structural error.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }

    /// Returns true if this is an argument error.
    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    /// Returns true if this is a range error.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }

    /// Returns true if a handler raised this error.
    #[must_use]
    pub const fn is_handler(&self) -> bool {
        matches!(self, Self::Handler(_))
    }
}

/// Result type alias for midibus operations.
pub type InputResult<T> = Result<T, InputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_too_short() {
        let err = StructuralError::TooShort {
            kind: "Note",
            expected: 3,
            actual: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Note"));
        assert!(msg.contains("at least 3"));
    }

    #[test]
    fn test_range_error_status_is_hex() {
        let err = RangeError::Status { value: 0x11 };
        assert!(format!("{err}").contains("0x11"));
    }

    #[test]
    fn test_argument_error_too_many_fields() {
        let err = ArgumentError::TooManyFields {
            kind: "ProgramChange",
            max: 1,
            actual: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("ProgramChange"));
        assert!(msg.contains("at most 1"));
    }

    #[test]
    fn test_input_error_from_families() {
        let err: InputError = StructuralError::Empty.into();
        assert!(err.is_structural());
        assert!(!err.is_range());

        let err: InputError = ArgumentError::MissingHandler.into();
        assert!(err.is_argument());

        let err: InputError = RangeError::Channel { value: 16 }.into();
        assert!(err.is_range());
        assert!(format!("{err}").contains("Channel 16"));
    }

    #[test]
    fn test_input_error_handler() {
        let err = InputError::handler("display offline");
        assert!(err.is_handler());
        assert!(format!("{err}").contains("display offline"));
    }
}
