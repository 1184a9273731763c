use std::fmt;

use chrono::{DateTime, Utc};

use crate::identity::Identity;
use crate::keyword::Keyword;

/// A primitive datom value.
///
/// Every variant carries a single-byte type tag in its encoded form (see
/// `indexing::codec`), and intra-type byte order reproduces the natural
/// order of the variant. Cross-type comparisons are only meaningful where an
/// attribute pins one type for its value position.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Absolute timestamp: nanoseconds since the Unix epoch, UTC.
    Instant(i64),
    /// Reference to another entity.
    Ref(Identity),
    Keyword(Keyword),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn value_type(&self) -> ValueType { ValueType::of(self) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
    Instant,
    Ref,
    Keyword,
    Bytes,
}

impl ValueType {
    pub fn of(v: &Value) -> Self {
        match v {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::Str,
            Value::Instant(_) => ValueType::Instant,
            Value::Ref(_) => ValueType::Ref,
            Value::Keyword(_) => ValueType::Keyword,
            Value::Bytes(_) => ValueType::Bytes,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{:?}", b),
            Value::Int(i) => write!(f, "{:?}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Instant(nanos) => write!(f, "#inst {}", nanos),
            Value::Ref(id) => write!(f, "{}", id),
            Value::Keyword(k) => write!(f, "{}", k),
            Value::Bytes(b) => write!(f, "#bytes[{}]", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Value::Float(x) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Str(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Str(s) }
}

impl From<Identity> for Value {
    fn from(id: Identity) -> Self { Value::Ref(id) }
}

impl From<Keyword> for Value {
    fn from(k: Keyword) -> Self { Value::Keyword(k) }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        // Instants outside the representable nanosecond range saturate; the
        // codec only needs a total order, not unbounded range.
        Value::Instant(dt.timestamp_nanos_opt().unwrap_or(i64::MAX))
    }
}
