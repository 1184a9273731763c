//! Column-named row sets: the matcher's output and its binding input.

use crate::error::MatchError;
use crate::pattern::Var;
use crate::tuple::Tuple;

/// A fully buffered relation: restartable, cheap to introspect.
#[derive(Debug, Clone, Default)]
pub struct MaterializedRelation {
    columns: Vec<Var>,
    rows: Vec<Tuple>,
}

impl MaterializedRelation {
    pub fn new(columns: Vec<Var>, rows: Vec<Tuple>) -> Self { Self { columns, rows } }

    pub fn columns(&self) -> &[Var] { &self.columns }

    pub fn rows(&self) -> &[Tuple] { &self.rows }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn into_rows(self) -> Vec<Tuple> { self.rows }
}

impl From<MaterializedRelation> for Relation {
    fn from(rel: MaterializedRelation) -> Self { Relation::Materialized(rel) }
}

/// A single-pass producer of tuples. Possibly unbounded; introspection
/// (emptiness, size) is unsupported because it would consume the first
/// tuple.
pub struct StreamingRelation {
    columns: Vec<Var>,
    iter: Box<dyn Iterator<Item = Result<Tuple, MatchError>> + Send>,
}

impl StreamingRelation {
    pub fn new(columns: Vec<Var>, iter: Box<dyn Iterator<Item = Result<Tuple, MatchError>> + Send>) -> Self {
        Self { columns, iter }
    }
}

/// A relation is either materialized storage or a streaming producer.
pub enum Relation {
    Materialized(MaterializedRelation),
    Streaming(StreamingRelation),
}

impl Relation {
    pub fn materialized(columns: Vec<Var>, rows: Vec<Tuple>) -> Self {
        Relation::Materialized(MaterializedRelation::new(columns, rows))
    }

    pub fn streaming(columns: Vec<Var>, iter: Box<dyn Iterator<Item = Result<Tuple, MatchError>> + Send>) -> Self {
        Relation::Streaming(StreamingRelation::new(columns, iter))
    }

    pub fn columns(&self) -> &[Var] {
        match self {
            Relation::Materialized(rel) => rel.columns(),
            Relation::Streaming(rel) => &rel.columns,
        }
    }

    /// Row count; None for streaming relations, whose size is unknown until
    /// drained.
    pub fn size(&self) -> Option<usize> {
        match self {
            Relation::Materialized(rel) => Some(rel.len()),
            Relation::Streaming(_) => None,
        }
    }

    /// Emptiness, legal only for materialized relations. For a streaming
    /// relation this returns None rather than peeking: introspection must
    /// never consume the first tuple.
    pub fn is_empty(&self) -> Option<bool> {
        match self {
            Relation::Materialized(rel) => Some(rel.is_empty()),
            Relation::Streaming(_) => None,
        }
    }

    pub fn is_streaming(&self) -> bool { matches!(self, Relation::Streaming(_)) }

    /// Drain into materialized storage. Already-materialized relations pass
    /// through unchanged; a streaming relation is consumed.
    pub fn materialize(self) -> Result<MaterializedRelation, MatchError> {
        match self {
            Relation::Materialized(rel) => Ok(rel),
            Relation::Streaming(rel) => {
                let mut rows = Vec::new();
                for row in rel.iter {
                    rows.push(row?);
                }
                Ok(MaterializedRelation::new(rel.columns, rows))
            }
        }
    }
}

impl IntoIterator for Relation {
    type Item = Result<Tuple, MatchError>;
    type IntoIter = RelationIter;

    fn into_iter(self) -> RelationIter {
        match self {
            Relation::Materialized(rel) => RelationIter::Materialized(rel.rows.into_iter()),
            Relation::Streaming(rel) => RelationIter::Streaming(rel.iter),
        }
    }
}

pub enum RelationIter {
    Materialized(std::vec::IntoIter<Tuple>),
    Streaming(Box<dyn Iterator<Item = Result<Tuple, MatchError>> + Send>),
}

impl Iterator for RelationIter {
    type Item = Result<Tuple, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RelationIter::Materialized(rows) => rows.next().map(Ok),
            RelationIter::Streaming(iter) => iter.next(),
        }
    }
}
