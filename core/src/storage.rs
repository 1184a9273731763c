//! The capability set the matcher consumes from a storage engine.
//!
//! Anything satisfying `Store` is pluggable: the matcher needs only
//! prefix-range scans in index-key order, point gets, the write entry
//! points, and a schema view answering which value type an attribute pins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::datom::Datom;
use crate::error::{CommitError, MatchError};
use crate::identity::Identity;
use crate::indexing::IndexType;
use crate::keyword::Keyword;
use crate::value::{Value, ValueType};

/// A cooperative cancellation signal shared between a caller and any number
/// of scans. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed) }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// Forward cursor over decoded datoms in `[start, end)` of one index.
///
/// Discipline: `datom()` is valid only after `next()` returned true;
/// `seek(key)` repositions so the following `next()` yields the first key at
/// or after `key` (seeking backwards is a no-op); `close()` is idempotent
/// and after it every operation reports the terminal state. After an I/O or
/// corruption error `next()` returns false and the error stays retrievable
/// through `error()`.
pub trait DatomIter: Send {
    fn next(&mut self) -> bool;

    /// The datom under the cursor. In keys-only mode this decodes on demand.
    fn datom(&mut self) -> Result<Datom, MatchError>;

    /// Raw key bytes under the cursor, if positioned.
    fn key(&self) -> Option<&[u8]>;

    fn seek(&mut self, key: &[u8]);

    fn close(&mut self) -> Result<(), MatchError>;

    /// Terminal error, if the iterator stopped on one.
    fn error(&self) -> Option<&MatchError>;
}

/// A batch of writes stamped with one freshly allocated transaction id.
pub trait StoreTx {
    fn tx_id(&self) -> u64;

    fn assert(&mut self, e: Identity, a: Keyword, v: Value) -> Result<(), CommitError>;

    fn retract(&mut self, e: Identity, a: Keyword, v: Value) -> Result<(), CommitError>;

    /// Write the batch: each datom fans out to all five indices atomically.
    /// Returns the transaction id.
    fn commit(self: Box<Self>) -> Result<u64, CommitError>;
}

/// An ordered datom store: five index keyspaces over one KV engine.
pub trait Store: Send + Sync {
    /// Write pre-stamped datoms (polarity `added == true` expected).
    /// Transaction ids must not regress below the last committed id.
    fn assert(&self, datoms: &[Datom]) -> Result<(), CommitError>;

    /// Write pre-stamped retraction datoms.
    fn retract(&self, datoms: &[Datom]) -> Result<(), CommitError>;

    /// Forward scan over `[start, end)` in index-key order, decoding each
    /// entry as it is yielded.
    fn scan(&self, index: IndexType, start: &[u8], end: &[u8]) -> Result<Box<dyn DatomIter>, MatchError>;

    /// Like `scan`, but decoding and the value-slot read are deferred until
    /// `datom()` is called: keys the caller skips past never pay for either,
    /// while a key that is decoded still reports its true polarity.
    fn scan_keys_only(&self, index: IndexType, start: &[u8], end: &[u8]) -> Result<Box<dyn DatomIter>, MatchError>;

    /// Point lookup of one exact key.
    fn get(&self, index: IndexType, key: &[u8]) -> Result<Option<Datom>, MatchError>;

    fn begin_tx(&self) -> Result<Box<dyn StoreTx + '_>, CommitError>;

    /// The value type this attribute pins at the V position, learned from
    /// writes. None for attributes the store has never seen.
    fn attribute_type(&self, attribute: &Keyword) -> Result<Option<ValueType>, MatchError>;

    fn close(&self) -> Result<(), MatchError>;
}
