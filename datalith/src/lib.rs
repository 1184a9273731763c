//! # Datalith
//!
//! An immutable fact database core. Facts are datoms - (entity, attribute,
//! value, transaction, polarity) five-tuples - stored under five covering
//! key orderings so that any pattern of constants and variables is a prefix
//! scan away. This facade re-exports the core model and matcher together
//! with the default sled storage engine.
//!
//! ```no_run
//! use std::sync::Arc;
//! use datalith::{Identity, Keyword, Matcher, Pattern, SledStore, Slot, Store, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SledStore::new_test()?);
//!
//! let mut tx = store.begin_tx()?;
//! tx.assert(Identity::from_label("alice"), Keyword::parse(":user/name")?, Value::from("Alice"))?;
//! tx.commit()?;
//!
//! let matcher = Matcher::new(store);
//! let pattern = Pattern::new(Slot::var("?e"), Slot::Const(Keyword::parse(":user/name")?), Slot::var("?name"));
//! for tuple in matcher.match_pattern(&pattern, None)? {
//!     println!("{:?}", tuple?);
//! }
//! # Ok(())
//! # }
//! ```

pub use datalith_core::{
    analyze, validate, Analysis, CancelToken, CodecError, CommitError, Constraint, Datom, DatomIter, Identity,
    IndexType, JoinStrategy, Keyword, MatchError, Matcher, MatcherConfig, MaterializedRelation, Pattern, Pos,
    PositionClass, Relation, RelationIter, Slot, Store, StoreTx, StreamingRelation, TimeField, Tuple, TupleBuilder,
    Value, ValueType, Var,
};

pub use datalith_core::{
    config, constraint, datom, error, identity, indexing, keyword, matcher, pattern, relation, storage, tuple, value,
};

pub use datalith_storage_sled::{ScanMetrics, SledStore, SledStoreError};
