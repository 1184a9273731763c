//! Error types for the matcher and the store interface it consumes.
//!
//! Propagation policy: I/O and corruption terminate the iterator that hit
//! them (subsequent `next()` returns false, the terminal error stays
//! retrievable, `close()` remains safe). Type mismatches during constraint
//! evaluation are not errors at all - a mismatching value simply fails the
//! constraint. Cancellation is reported once.

use thiserror::Error;

use crate::keyword::Keyword;
use crate::value::ValueType;

/// A key that cannot be decoded back into a datom.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    #[error("key does not begin with a known index tag: {0:#04x}")]
    UnknownIndexTag(u8),
    #[error("unknown value type tag {0:#04x}")]
    UnknownValueTag(u8),
    #[error("key truncated while decoding {0}")]
    Truncated(&'static str),
    #[error("trailing bytes after decoding key")]
    TrailingBytes,
    #[error("invalid utf-8 in encoded {0}")]
    InvalidUtf8(&'static str),
    #[error("malformed {0} component")]
    Malformed(&'static str),
    #[error("misplaced key part: index expects {expected} here, got {got}")]
    PartMismatch { expected: &'static str, got: &'static str },
    #[error("prefix has more parts than the index has components")]
    TooManyParts,
}

/// Error surface of `match_pattern` and the iterators it returns.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchError {
    #[error("corrupt key: {0}")]
    CorruptKey(#[from] CodecError),
    #[error("i/o failure: {0}")]
    Io(String),
    #[error("type mismatch on {attribute}: attribute stores {expected:?}, pattern has {got:?}")]
    TypeMismatch { attribute: Keyword, expected: ValueType, got: ValueType },
    #[error("unknown attribute {0}")]
    UnknownAttribute(Keyword),
    #[error("cancelled")]
    Cancelled,
    #[error("iterator closed")]
    ClosedIterator,
}

/// Error surface of the write path (`assert`, `retract`, `StoreTx`).
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("storage: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("attribute {attribute} stores {expected:?}, datom has {got:?}")]
    TypeMismatch { attribute: Keyword, expected: ValueType, got: ValueType },
    #[error("transaction id {got} is not monotonic (last committed {last})")]
    NonMonotonicTx { got: u64, last: u64 },
}
