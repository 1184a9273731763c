//! Hash-join scan: one pass over the implied range, probing a table built
//! from the binding rows.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::error::MatchError;
use crate::indexing::codec;
use crate::storage::DatomIter;
use crate::tuple::Tuple;

use super::MatchContext;

enum State {
    Init,
    Scanning(Box<dyn DatomIter>),
    Closed,
}

/// Scan once, probe per datom. The build side is the binding relation: rows
/// are grouped by the byte form of their bound components, so probing is an
/// exact-equality lookup with no residual re-check. Duplicate binding rows
/// keep their multiplicity.
///
/// The implied scan range incorporates every bound component that extends
/// the constant prefix: a single distinct bound value extends the prefix
/// outright, several distinct values narrow the range to
/// `[prefix + min, succ(prefix + max))`. Scanning the whole constant-prefix
/// range when one symbol is bound was a measured bug class; the range must
/// consult the bindings, not the constants alone.
pub(crate) struct HashJoinScan {
    ctx: MatchContext,
    rows: Vec<Tuple>,
    table: HashMap<Vec<u8>, Vec<usize>>,
    start: Vec<u8>,
    end: Vec<u8>,
    pending: VecDeque<Tuple>,
    state: State,
}

impl HashJoinScan {
    pub(crate) fn new(ctx: MatchContext, rows: Vec<Tuple>, default_table_size: usize) -> Self {
        let mut table: HashMap<Vec<u8>, Vec<usize>> = HashMap::with_capacity(default_table_size.max(rows.len()));
        for (i, row) in rows.iter().enumerate() {
            // Rows whose bound values cannot occupy their positions match
            // nothing and stay out of the table.
            if let Some(key) = ctx.probe_key_for_row(row) {
                table.entry(key).or_default().push(i);
            }
        }
        let (start, end) = implied_range(&ctx, &rows);
        Self { ctx, rows, table, start, end, pending: VecDeque::new(), state: State::Init }
    }
}

impl Iterator for HashJoinScan {
    type Item = Result<Tuple, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(tuple) = self.pending.pop_front() {
            return Some(Ok(tuple));
        }
        loop {
            match std::mem::replace(&mut self.state, State::Closed) {
                State::Init => {
                    if self.ctx.cancel.is_cancelled() {
                        return Some(Err(MatchError::Cancelled));
                    }
                    if self.table.is_empty() || self.start >= self.end {
                        return None;
                    }
                    match self.ctx.store.scan(self.ctx.analysis.index, &self.start, &self.end) {
                        Ok(cursor) => self.state = State::Scanning(cursor),
                        Err(e) => return Some(Err(e)),
                    }
                }
                State::Scanning(mut cursor) => loop {
                    if self.ctx.cancel.is_cancelled() {
                        let _ = cursor.close();
                        return Some(Err(MatchError::Cancelled));
                    }
                    if !cursor.next() {
                        let err = cursor.error().cloned();
                        let closed = cursor.close();
                        return match (err, closed) {
                            (Some(e), _) => Some(Err(e)),
                            (None, Err(e)) => Some(Err(e)),
                            (None, Ok(())) => None,
                        };
                    }
                    let datom = match cursor.datom() {
                        Ok(d) => d,
                        Err(e) => {
                            let _ = cursor.close();
                            return Some(Err(e));
                        }
                    };
                    if !self.ctx.accepts(&datom) {
                        continue;
                    }
                    let indices = match self.table.get(&self.ctx.probe_key_for_datom(&datom)) {
                        Some(indices) => indices.clone(),
                        None => continue,
                    };
                    for i in indices {
                        let tuple = self.ctx.builder.build(Some(&self.rows[i]), &datom);
                        self.pending.push_back(tuple);
                    }
                    if let Some(tuple) = self.pending.pop_front() {
                        self.state = State::Scanning(cursor);
                        return Some(Ok(tuple));
                    }
                },
                State::Closed => return None,
            }
        }
    }
}

/// The scan range implied by constants plus bound components. Walks the
/// index's component order: constants extend the prefix; the first bound
/// component with several distinct values narrows to its min/max span and
/// stops; a bound component with one distinct value extends the prefix like
/// a constant.
fn implied_range(ctx: &MatchContext, rows: &[Tuple]) -> (Vec<u8>, Vec<u8>) {
    let mut start = vec![ctx.analysis.index.tag()];
    for pos in ctx.analysis.index.components() {
        if let Some(value) = ctx.pattern.const_value(pos) {
            match codec::encode_component_value(pos, &value) {
                Some(bytes) => {
                    start.extend_from_slice(&bytes);
                    continue;
                }
                None => break,
            }
        }
        let Some(column) = ctx.analysis.bound_column(pos) else { break };
        let encoded: BTreeSet<Vec<u8>> =
            rows.iter().filter_map(|row| codec::encode_component_value(pos, &row[column])).collect();
        match encoded.len() {
            // No binding value can occupy the position: empty range.
            0 => return (start.clone(), start),
            1 => {
                start.extend_from_slice(encoded.first().map(Vec::as_slice).unwrap_or_default());
                continue;
            }
            _ => {
                let min = encoded.first().map(Vec::as_slice).unwrap_or_default();
                let max = encoded.last().map(Vec::as_slice).unwrap_or_default();
                let mut upper = start.clone();
                upper.extend_from_slice(max);
                let end = codec::prefix_end(&upper);
                start.extend_from_slice(min);
                return (start, end);
            }
        }
    }
    let end = codec::prefix_end(&start);
    (start, end)
}
