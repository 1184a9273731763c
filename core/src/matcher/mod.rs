//! The per-pattern matcher: index selection, join-strategy selection, and
//! the streaming iterators that execute a match against the store.

mod hash_join;
mod nested_loop;
mod reuse;
mod scan;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::MatcherConfig;
use crate::constraint::{component_eq, validate, Constraint};
use crate::datom::{Datom, Pos};
use crate::error::MatchError;
use crate::indexing::codec;
use crate::pattern::{analyze, Analysis, BoundPos, Pattern};
use crate::relation::Relation;
use crate::storage::{CancelToken, Store};
use crate::tuple::{Tuple, TupleBuilder};
use crate::value::Value;

/// The three ways a binding relation joins against an index scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// One narrow scan per binding tuple. O(|B| log N + output); wins for
    /// small binding sets.
    IndexNestedLoop,
    /// One scan of the implied range plus a hash probe per candidate datom.
    HashJoinScan,
    /// One open cursor, seeking between sorted binding prefixes.
    IteratorReuse,
}

/// Storage-layer pattern matcher. Holds a store handle, an optional
/// transaction-time ceiling, and tuning configuration; each `match_*` call
/// returns a lazily produced relation.
pub struct Matcher {
    store: Arc<dyn Store>,
    tx_ceiling: u64,
    config: MatcherConfig,
    cancel: CancelToken,
    forced: Option<JoinStrategy>,
}

impl Matcher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, tx_ceiling: 0, config: MatcherConfig::default(), cancel: CancelToken::new(), forced: None }
    }

    /// Only datoms with `tx <= ceiling` are visible. 0 means latest.
    pub fn as_of(mut self, tx_ceiling: u64) -> Self {
        self.tx_ceiling = tx_ceiling;
        self
    }

    pub fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pin a join strategy for benchmarking. Forcing iterator reuse on a
    /// pattern it cannot serve falls back to hash-join with a warning;
    /// forcing never changes result sets.
    pub fn force_join_strategy(&mut self, strategy: JoinStrategy) { self.forced = Some(strategy) }

    pub fn match_pattern(&self, pattern: &Pattern, bindings: Option<Relation>) -> Result<Relation, MatchError> {
        self.match_with_constraints(pattern, bindings, Vec::new())
    }

    pub fn match_with_constraints(
        &self,
        pattern: &Pattern,
        bindings: Option<Relation>,
        constraints: Vec<Constraint>,
    ) -> Result<Relation, MatchError> {
        self.check_schema(pattern)?;

        let Some(bindings) = bindings else {
            let analysis = analyze(pattern, &[]);
            debug!(index = %analysis.index, "pattern match without bindings");
            let ctx = self.context(pattern, analysis, &[], constraints);
            let columns = ctx.builder.columns().to_vec();
            return Ok(Relation::streaming(columns, Box::new(scan::ScanMatch::new(ctx))));
        };

        let bindings = if bindings.is_streaming() && !self.config.enable_streaming_joins {
            Relation::Materialized(bindings.materialize()?)
        } else {
            bindings
        };

        let binding_columns = bindings.columns().to_vec();
        let analysis = analyze(pattern, &binding_columns);
        let ctx = self.context(pattern, analysis, &binding_columns, constraints);
        let columns = ctx.builder.columns().to_vec();

        let strategy = self.select_strategy(&ctx.analysis, &bindings);
        debug!(index = %ctx.analysis.index, ?strategy, "join strategy selected");

        let iter: Box<dyn Iterator<Item = Result<Tuple, MatchError>> + Send> = match strategy {
            JoinStrategy::IndexNestedLoop => Box::new(nested_loop::NestedLoopJoin::new(ctx, bindings.into_iter())),
            JoinStrategy::HashJoinScan => {
                let rows = bindings.materialize()?.into_rows();
                Box::new(hash_join::HashJoinScan::new(ctx, rows, self.config.default_hash_table_size))
            }
            JoinStrategy::IteratorReuse => {
                let rows = bindings.materialize()?.into_rows();
                match reuse::plan(&ctx, &rows) {
                    Some(plan) if self.density_acceptable(plan.density, rows.len()) => {
                        Box::new(reuse::ReuseJoin::new(ctx, rows, plan))
                    }
                    _ => {
                        debug!("iterator reuse fell back to hash-join (sparse bindings)");
                        Box::new(hash_join::HashJoinScan::new(ctx, rows, self.config.default_hash_table_size))
                    }
                }
            }
        };
        Ok(Relation::streaming(columns, iter))
    }

    fn context(
        &self,
        pattern: &Pattern,
        analysis: Analysis,
        binding_columns: &[crate::pattern::Var],
        constraints: Vec<Constraint>,
    ) -> MatchContext {
        // Constants the scan range may not pin (a constant sitting after a
        // free or bound component in the index's order) still have to hold;
        // accepts() re-checks all of them, which is cheap and uniform.
        let const_checks: Vec<(Pos, Value)> =
            [Pos::E, Pos::A, Pos::V, Pos::Tx].iter().filter_map(|pos| pattern.const_value(*pos).map(|v| (*pos, v))).collect();
        MatchContext {
            store: self.store.clone(),
            builder: TupleBuilder::new(pattern, binding_columns),
            pattern: pattern.clone(),
            analysis,
            constraints,
            const_checks,
            tx_ceiling: self.tx_ceiling,
            cancel: self.cancel.clone(),
            // History patterns address transaction time explicitly and see
            // both polarities; plain matches skip retraction datoms.
            emit_retracted: pattern.tx.is_some(),
        }
    }

    /// Pattern/schema agreement: a constant attribute must be known to the
    /// store, and a constant value must carry the attribute's pinned type.
    fn check_schema(&self, pattern: &Pattern) -> Result<(), MatchError> {
        let Some(attribute) = pattern.a.as_const() else { return Ok(()) };
        let Some(expected) = self.store.attribute_type(attribute)? else {
            return Err(MatchError::UnknownAttribute(attribute.clone()));
        };
        if let Some(value) = pattern.v.as_const() {
            let got = value.value_type();
            if got != expected {
                return Err(MatchError::TypeMismatch { attribute: attribute.clone(), expected, got });
            }
        }
        Ok(())
    }

    fn select_strategy(&self, analysis: &Analysis, bindings: &Relation) -> JoinStrategy {
        let eligible = reuse_eligible(analysis);
        if let Some(forced) = self.forced {
            if forced == JoinStrategy::IteratorReuse && !eligible {
                warn!("forced iterator reuse is not eligible for this pattern; using hash-join scan");
                return JoinStrategy::HashJoinScan;
            }
            return forced;
        }

        // No shared variables: every binding row pairs with every match, a
        // degenerate cross join the hash path handles with an empty probe
        // key and a single scan.
        if analysis.bound.is_empty() {
            return JoinStrategy::HashJoinScan;
        }

        match bindings.size() {
            Some(n) => {
                let threshold = self.config.index_nested_loop_threshold;
                if threshold > 0 && n <= threshold {
                    JoinStrategy::IndexNestedLoop
                } else if eligible {
                    JoinStrategy::IteratorReuse
                } else {
                    JoinStrategy::HashJoinScan
                }
            }
            // Unknown size: a streaming relation. Nested loop consumes it in
            // one pass; hash-join may drain it when the configuration allows.
            None => {
                if self.config.enable_symmetric_hash_join {
                    JoinStrategy::HashJoinScan
                } else {
                    JoinStrategy::IndexNestedLoop
                }
            }
        }
    }

    fn density_acceptable(&self, density: f64, bindings: usize) -> bool {
        let threshold = self.config.reuse_density_threshold;
        if threshold <= 0.0 {
            return true;
        }
        let ok = density >= threshold;
        if !ok {
            debug!(density, bindings, threshold, "binding density below reuse threshold");
        }
        ok
    }
}

/// Iterator reuse needs exactly one join-bound position, sitting directly
/// after the constant prefix in the chosen index's component order (the
/// index primary when there is no constant prefix, or cases like E after a
/// constant A on AEVT). Then each binding owns one contiguous key range and
/// a single cursor can seek between them in sorted order.
fn reuse_eligible(analysis: &Analysis) -> bool {
    let [bound] = analysis.bound.as_slice() else { return false };
    analysis.index.components().get(analysis.const_prefix_len) == Some(&bound.pos)
}

/// Everything a strategy iterator needs to run its scan loop.
pub(crate) struct MatchContext {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) pattern: Pattern,
    pub(crate) analysis: Analysis,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) const_checks: Vec<(Pos, Value)>,
    pub(crate) tx_ceiling: u64,
    pub(crate) cancel: CancelToken,
    pub(crate) builder: TupleBuilder,
    pub(crate) emit_retracted: bool,
}

impl MatchContext {
    /// Polarity, pattern constants, repeated-variable filters, then
    /// visibility and constraints. Runs once per candidate datom;
    /// allocation-free.
    #[inline]
    pub(crate) fn accepts(&self, datom: &Datom) -> bool {
        if !datom.added && !self.emit_retracted {
            return false;
        }
        for (pos, value) in &self.const_checks {
            if !component_eq(datom, *pos, value) {
                return false;
            }
        }
        for (first, second) in &self.analysis.same_value {
            if !components_equal(datom, *first, *second) {
                return false;
            }
        }
        validate(datom, self.tx_ceiling, &self.constraints)
    }

    /// Residual equality between a datom and the binding row for bound
    /// positions the scan range did not already pin.
    #[inline]
    pub(crate) fn residual_ok(&self, datom: &Datom, row: &Tuple, residual: &[BoundPos]) -> bool {
        residual.iter().all(|b| component_eq(datom, b.pos, &row[b.column]))
    }

    /// The tightest `[start, end)` for one binding row: constants and bound
    /// values extend the prefix until the first free component. Returns the
    /// bound positions the prefix did not consume (they stay residual
    /// filters), or None when a bound value cannot occupy its position, in
    /// which case the row matches nothing.
    pub(crate) fn range_for_row(&self, row: &Tuple) -> Option<(Vec<u8>, Vec<u8>, Vec<BoundPos>)> {
        let mut start = vec![self.analysis.index.tag()];
        let mut residual: Vec<BoundPos> = self.analysis.bound.clone();
        for pos in self.analysis.index.components() {
            if let Some(value) = self.pattern.const_value(pos) {
                match codec::encode_component_value(pos, &value) {
                    Some(bytes) => {
                        start.extend_from_slice(&bytes);
                        continue;
                    }
                    None => return None,
                }
            }
            if let Some(column) = self.analysis.bound_column(pos) {
                match codec::encode_component_value(pos, &row[column]) {
                    Some(bytes) => {
                        start.extend_from_slice(&bytes);
                        residual.retain(|b| b.pos != pos);
                        continue;
                    }
                    None => return None,
                }
            }
            break;
        }
        let end = codec::prefix_end(&start);
        Some((start, end, residual))
    }

    /// Concatenated byte form of the bound components of a binding row, the
    /// hash-join build key. None when a value cannot occupy its position.
    pub(crate) fn probe_key_for_row(&self, row: &Tuple) -> Option<Vec<u8>> {
        let mut key = Vec::new();
        for b in &self.analysis.bound {
            key.extend_from_slice(&codec::encode_component_value(b.pos, &row[b.column])?);
        }
        Some(key)
    }

    /// The matching probe key projected from a datom.
    pub(crate) fn probe_key_for_datom(&self, datom: &Datom) -> Vec<u8> {
        let mut key = Vec::new();
        for b in &self.analysis.bound {
            key.extend_from_slice(&codec::encode_datom_component(datom, b.pos));
        }
        key
    }
}

/// Do two components of one datom hold the same value? Components of
/// different kinds (an entity and a keyword, say) never do.
#[inline]
fn components_equal(datom: &Datom, first: Pos, second: Pos) -> bool {
    match (first, second) {
        (Pos::E, Pos::V) | (Pos::V, Pos::E) => matches!(&datom.v, Value::Ref(id) if *id == datom.e),
        (Pos::A, Pos::V) | (Pos::V, Pos::A) => matches!(&datom.v, Value::Keyword(k) if *k == datom.a),
        (Pos::Tx, Pos::V) | (Pos::V, Pos::Tx) => {
            matches!(&datom.v, Value::Int(i) if *i >= 0 && *i as u64 == datom.tx)
        }
        (a, b) if a == b => true,
        _ => false,
    }
}
