//! Row-level predicates pushed down from the planner into the scan loop.
//!
//! Constraints are pure: no I/O, no hidden state, so a future planner may
//! reorder them freely. They are AND-combined in caller order. A value whose
//! type disagrees with the constraint is not an error; it evaluates false,
//! because mismatching values cannot be equal or in range.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;

use crate::datom::{Datom, Pos};
use crate::value::Value;

/// The extractable components of an instant, evaluated in a wall-clock zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    /// Day of week, Sunday = 0 through Saturday = 6.
    Dow,
    /// Minutes since local midnight.
    MinuteOfDay,
}

/// A predicate over a single datom. A closed enum rather than a trait
/// object: `evaluate` is inside the hottest loop in the system and must not
/// pay for virtual dispatch or allocation.
#[derive(Debug, Clone)]
pub enum Constraint {
    Equality { pos: Pos, value: Value },
    /// Inclusive on both ends.
    Range { pos: Pos, lo: Value, hi: Value },
    TimeComponent { pos: Pos, field: TimeField, expected: i64, zone: Tz },
}

impl Constraint {
    pub fn equality(pos: Pos, value: Value) -> Self { Constraint::Equality { pos, value } }

    pub fn range(pos: Pos, lo: Value, hi: Value) -> Self { Constraint::Range { pos, lo, hi } }

    pub fn time_component(pos: Pos, field: TimeField, expected: i64, zone: Tz) -> Self {
        Constraint::TimeComponent { pos, field, expected, zone }
    }

    #[inline]
    pub fn evaluate(&self, datom: &Datom) -> bool {
        match self {
            Constraint::Equality { pos, value } => component_eq(datom, *pos, value),
            Constraint::Range { pos, lo, hi } => {
                component_cmp(datom, *pos, lo).is_some_and(|ord| ord != Ordering::Less)
                    && component_cmp(datom, *pos, hi).is_some_and(|ord| ord != Ordering::Greater)
            }
            Constraint::TimeComponent { pos, field, expected, zone } => {
                let nanos = match pos {
                    Pos::V => match &datom.v {
                        Value::Instant(nanos) => *nanos,
                        _ => return false,
                    },
                    _ => return false,
                };
                extract_time_field(nanos, *field, *zone) == *expected
            }
        }
    }
}

/// Equality between a datom component and a constraint value, with direct
/// typed comparisons on the common cases and deep value equality as the
/// fallback. Type tags never coerce: an Int never equals a Float.
#[inline]
pub(crate) fn component_eq(datom: &Datom, pos: Pos, value: &Value) -> bool {
    match pos {
        Pos::E => matches!(value, Value::Ref(id) if *id == datom.e),
        Pos::A => matches!(value, Value::Keyword(k) if *k == datom.a),
        Pos::Tx => matches!(value, Value::Int(i) if *i >= 0 && *i as u64 == datom.tx),
        Pos::V => match (&datom.v, value) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (a, b) => a == b,
        },
    }
}

/// Ordering between a datom component and a value of the same type; None on
/// any type mismatch (which makes range constraints evaluate false).
#[inline]
fn component_cmp(datom: &Datom, pos: Pos, value: &Value) -> Option<Ordering> {
    match pos {
        Pos::E => match value {
            Value::Ref(id) => Some(datom.e.as_bytes().cmp(id.as_bytes())),
            _ => None,
        },
        Pos::A => match value {
            Value::Keyword(k) => Some(datom.a.cmp(k)),
            _ => None,
        },
        Pos::Tx => match value {
            Value::Int(i) => Some((datom.tx as i128).cmp(&(*i as i128))),
            _ => None,
        },
        Pos::V => match (&datom.v, value) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Instant(a), Value::Instant(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Ref(a), Value::Ref(b)) => Some(a.cmp(b)),
            (Value::Keyword(a), Value::Keyword(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

fn extract_time_field(nanos: i64, field: TimeField, zone: Tz) -> i64 {
    let local = DateTime::from_timestamp_nanos(nanos).with_timezone(&zone);
    match field {
        TimeField::Year => local.year() as i64,
        TimeField::Month => local.month() as i64,
        TimeField::Day => local.day() as i64,
        TimeField::Hour => local.hour() as i64,
        TimeField::Minute => local.minute() as i64,
        TimeField::Dow => local.weekday().num_days_from_sunday() as i64,
        TimeField::MinuteOfDay => (local.hour() * 60 + local.minute()) as i64,
    }
}

/// Visibility plus constraints, short-circuiting. This runs once per
/// candidate datom on every strategy's scan loop; keep it allocation-free.
///
/// A datom is visible iff `tx_ceiling == 0` (latest) or
/// `datom.tx <= tx_ceiling`.
#[inline]
pub fn validate(datom: &Datom, tx_ceiling: u64, constraints: &[Constraint]) -> bool {
    if tx_ceiling != 0 && datom.tx > tx_ceiling {
        return false;
    }
    constraints.iter().all(|c| c.evaluate(datom))
}
