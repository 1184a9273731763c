//! Datalith core: the storage-layer pattern matcher of an immutable fact
//! database.
//!
//! Facts are datoms, five-tuples of (entity, attribute, value, transaction,
//! polarity), fanned out under five total key orderings (EAVT, AEVT, AVET,
//! VAET, TAEV) so any pattern of constants and variables can be answered by
//! a prefix scan of some index. This crate owns the order-preserving key
//! codec, the per-pattern analyzer that picks an index and scan range, the
//! pushed-down constraint algebra, the three join strategies used when a
//! binding relation is present, and the streaming relation plumbing that
//! feeds the query executor. Storage engines implement the `storage::Store`
//! capability set; see the companion sled crate for the default engine.

pub mod config;
pub mod constraint;
pub mod datom;
pub mod error;
pub mod identity;
pub mod indexing;
pub mod keyword;
pub mod matcher;
pub mod pattern;
pub mod relation;
pub mod storage;
pub mod tuple;
pub mod value;

pub use config::MatcherConfig;
pub use constraint::{validate, Constraint, TimeField};
pub use datom::{Datom, Pos};
pub use error::{CodecError, CommitError, MatchError};
pub use identity::Identity;
pub use indexing::IndexType;
pub use keyword::Keyword;
pub use matcher::{JoinStrategy, Matcher};
pub use pattern::{analyze, Analysis, Pattern, PositionClass, Slot, Var};
pub use relation::{MaterializedRelation, Relation, RelationIter, StreamingRelation};
pub use storage::{CancelToken, DatomIter, Store, StoreTx};
pub use tuple::{Tuple, TupleBuilder};
pub use value::{Value, ValueType};
