//! Index nested loop: one narrow scan per binding tuple.

use crate::error::MatchError;
use crate::pattern::BoundPos;
use crate::relation::RelationIter;
use crate::storage::DatomIter;
use crate::tuple::Tuple;

use super::MatchContext;

enum State {
    NextBinding,
    Scanning { row: Tuple, residual: Vec<BoundPos>, cursor: Box<dyn DatomIter> },
    Closed,
}

/// For each binding row: compute the most selective range the row allows,
/// open a fresh cursor, emit its matches, move on. The binding relation is
/// consumed in one pass, so streaming bindings work unmaterialized.
pub(crate) struct NestedLoopJoin {
    ctx: MatchContext,
    bindings: RelationIter,
    state: State,
}

impl NestedLoopJoin {
    pub(crate) fn new(ctx: MatchContext, bindings: RelationIter) -> Self {
        Self { ctx, bindings, state: State::NextBinding }
    }
}

impl Iterator for NestedLoopJoin {
    type Item = Result<Tuple, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.ctx.cancel.is_cancelled() {
                return match std::mem::replace(&mut self.state, State::Closed) {
                    State::Closed => None,
                    State::Scanning { mut cursor, .. } => {
                        let _ = cursor.close();
                        Some(Err(MatchError::Cancelled))
                    }
                    State::NextBinding => Some(Err(MatchError::Cancelled)),
                };
            }
            match std::mem::replace(&mut self.state, State::Closed) {
                State::NextBinding => match self.bindings.next() {
                    None => return None,
                    Some(Err(e)) => return Some(Err(e)),
                    Some(Ok(row)) => {
                        // None: a bound value that cannot occupy its
                        // position; the row matches nothing.
                        let Some((start, end, residual)) = self.ctx.range_for_row(&row) else {
                            self.state = State::NextBinding;
                            continue;
                        };
                        match self.ctx.store.scan(self.ctx.analysis.index, &start, &end) {
                            Ok(cursor) => self.state = State::Scanning { row, residual, cursor },
                            Err(e) => return Some(Err(e)),
                        }
                    }
                },
                State::Scanning { row, residual, mut cursor } => {
                    loop {
                        if self.ctx.cancel.is_cancelled() {
                            let _ = cursor.close();
                            return Some(Err(MatchError::Cancelled));
                        }
                        if !cursor.next() {
                            let err = cursor.error().cloned();
                            let closed = cursor.close();
                            match (err, closed) {
                                (Some(e), _) => return Some(Err(e)),
                                (None, Err(e)) => return Some(Err(e)),
                                (None, Ok(())) => break,
                            }
                        }
                        let datom = match cursor.datom() {
                            Ok(d) => d,
                            Err(e) => {
                                let _ = cursor.close();
                                return Some(Err(e));
                            }
                        };
                        if self.ctx.accepts(&datom) && self.ctx.residual_ok(&datom, &row, &residual) {
                            let tuple = self.ctx.builder.build(Some(&row), &datom);
                            self.state = State::Scanning { row, residual, cursor };
                            return Some(Ok(tuple));
                        }
                    }
                    self.state = State::NextBinding;
                }
                State::Closed => return None,
            }
        }
    }
}
