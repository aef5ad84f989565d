//! Error types shared across the crate

use thiserror::Error;

use crate::codec::TypeTag;

/// A byte slice could not be interpreted as the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes were available than the type requires.
    #[error("{tag} needs {needed} bytes, only {available} available")]
    InsufficientBytes {
        tag: TypeTag,
        needed: usize,
        available: usize,
    },

    /// No LEB128 terminating byte within the 10-byte cap.
    #[error("unterminated LEB128 sequence")]
    Leb128Unterminated,

    /// Lead byte or continuation bytes do not form valid UTF-8.
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,

    /// Packed date/time fields or an epoch offset outside the valid range.
    #[error("bytes do not form a valid {tag}")]
    InvalidTimestamp { tag: TypeTag },

    /// This tag has no byte-level decoding without extra descriptor context.
    #[error("{0} is not decodable as a plain scalar")]
    UnsupportedTag(TypeTag),
}

/// A textual value could not be converted back into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Text does not match the grammar the type expects.
    #[error("cannot parse {text:?} as {tag}")]
    InvalidFormat { tag: TypeTag, text: String },

    /// Parsed fine but falls outside the representable range of the type.
    #[error("value {text:?} is out of range for {tag}")]
    OutOfRange { tag: TypeTag, text: String },

    /// The encoded form does not fit the annotated byte length.
    #[error("{tag} encodes to {got} bytes but the range holds {expected}")]
    LengthMismatch {
        tag: TypeTag,
        expected: usize,
        got: usize,
    },

    /// Encoding is not defined for this tag (e.g. decode-only timestamps).
    #[error("{0} values cannot be edited")]
    Unsupported(TypeTag),
}

/// A range update was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range start {start:#X} is not below end {end:#X}")]
    StartNotBelowEnd { start: usize, end: usize },

    #[error("range end {end:#X} exceeds buffer length {len:#X}")]
    OutOfBounds { end: usize, len: usize },
}
