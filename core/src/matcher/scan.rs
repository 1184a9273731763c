//! The bindings-free match: one scan of the analyzed range.

use crate::error::MatchError;
use crate::storage::DatomIter;
use crate::tuple::Tuple;

use super::MatchContext;

enum State {
    Init,
    Scanning(Box<dyn DatomIter>),
    Closed,
}

/// Iterator over the tuples of a pattern match without a binding relation.
///
/// States: `Init` until the first pull opens the cursor, `Scanning` while
/// positioned inside the range (emitting is the returned item), `Closed`
/// once the cursor is drained, errored or cancelled.
pub(crate) struct ScanMatch {
    ctx: MatchContext,
    state: State,
}

impl ScanMatch {
    pub(crate) fn new(ctx: MatchContext) -> Self { Self { ctx, state: State::Init } }
}

impl Iterator for ScanMatch {
    type Item = Result<Tuple, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Closed) {
                State::Init => {
                    if self.ctx.cancel.is_cancelled() {
                        return Some(Err(MatchError::Cancelled));
                    }
                    let analysis = &self.ctx.analysis;
                    match self.ctx.store.scan(analysis.index, &analysis.start, &analysis.end) {
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
                    if self.ctx.accepts(&datom) {
                        let tuple = self.ctx.builder.build(None, &datom);
                        self.state = State::Scanning(cursor);
                        return Some(Ok(tuple));
                    }
                },
                State::Closed => return None,
            }
        }
    }
}
