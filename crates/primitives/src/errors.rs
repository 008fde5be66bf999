//! Errors during parsing/handling/conversion of primitives.

use thiserror::Error;

/// Errors that can occur decoding or encoding the fixed-width records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The buffer length does not match the record size.
    #[error("invalid record length (expected {expected}, got {got})")]
    InvalidLength { expected: usize, got: usize },

    /// A packed buffer is not a whole multiple of the record size.
    #[error("buffer of {len} bytes is not a multiple of the {record} byte record")]
    NotRecordAligned { len: usize, record: usize },

    /// An account index does not fit into 48 bits.
    #[error("account index {0} exceeds 48 bits")]
    IdxOverflow(u64),

    /// A packed bucket parameter does not fit its field.
    #[error("bucket field {0} overflows its packed width")]
    BucketFieldOverflow(&'static str),
}

/// Errors converting amounts to the float16 representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FloatError {
    /// Value too large to be represented.
    #[error("amount exceeds the float16 range")]
    Overflow,

    /// Value can't be represented without loss.
    #[error("amount is not exactly representable as float16")]
    NotExact,
}
