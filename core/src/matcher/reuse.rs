//! Iterator reuse: a single cursor seeking between sorted binding prefixes.

use std::collections::VecDeque;

use crate::error::MatchError;
use crate::indexing::codec;
use crate::storage::DatomIter;
use crate::tuple::Tuple;

use super::MatchContext;

/// One binding's contiguous key range: the constant prefix extended with
/// the binding's encoded component. Rows lists every binding row sharing
/// the value, so duplicate bindings keep their multiplicity.
pub(crate) struct Group {
    pub(crate) start: Vec<u8>,
    pub(crate) end: Vec<u8>,
    pub(crate) rows: Vec<usize>,
}

pub(crate) struct ReusePlan {
    pub(crate) groups: Vec<Group>,
    /// Bindings per unit of encoded key space between the first and last
    /// seek prefix; the selector falls back to hash-join below the
    /// configured threshold.
    pub(crate) density: f64,
}

/// Sort the bindings by encoded seek prefix and group equal values. None
/// when the pattern has no single reusable bound position (the selector
/// checks eligibility first; this guards the invariant).
pub(crate) fn plan(ctx: &MatchContext, rows: &[Tuple]) -> Option<ReusePlan> {
    let [bound] = ctx.analysis.bound.as_slice() else { return None };

    let mut seeks: Vec<(Vec<u8>, usize)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            codec::encode_component_value(bound.pos, &row[bound.column]).map(|encoded| {
                let mut start = ctx.analysis.start.clone();
                start.extend_from_slice(&encoded);
                (start, i)
            })
        })
        .collect();
    seeks.sort();

    let mut groups: Vec<Group> = Vec::new();
    for (start, row) in seeks {
        match groups.last_mut() {
            Some(group) if group.start == start => group.rows.push(row),
            _ => {
                let end = codec::prefix_end(&start);
                groups.push(Group { start, end, rows: vec![row] });
            }
        }
    }

    let density = binding_density(&groups, ctx.analysis.start.len());
    Some(ReusePlan { groups, density })
}

/// Bindings per unit of key space: the count divided by the big-endian
/// distance between the first and last seek prefix (first eight bytes past
/// the shared constant prefix). Dense, clustered bindings score high;
/// bindings scattered across a hashed keyspace score near zero.
fn binding_density(groups: &[Group], shared_prefix_len: usize) -> f64 {
    let (Some(first), Some(last)) = (groups.first(), groups.last()) else { return f64::INFINITY };
    let span = prefix_ordinal(&last.start, shared_prefix_len) - prefix_ordinal(&first.start, shared_prefix_len);
    groups.len() as f64 / (span + 1.0)
}

fn prefix_ordinal(key: &[u8], skip: usize) -> f64 {
    let mut raw = [0u8; 8];
    for (i, b) in key.iter().skip(skip).take(8).enumerate() {
        raw[i] = *b;
    }
    u64::from_be_bytes(raw) as f64
}

enum State {
    Init,
    Scanning { cursor: Box<dyn DatomIter>, group: usize },
    Closed,
}

enum Step {
    /// The key belongs to this group; decode and test the datom.
    InGroup(usize),
    /// Moved past the current group; reposition to this group's start.
    SeekTo(usize),
    /// Moved past the last group.
    Done,
}

/// One keys-only cursor over `[first group start, last group end)`. Between
/// groups the cursor seeks forward instead of decoding; the "moved past"
/// test compares raw key bytes against the current group's end, so skipped
/// regions never pay for decoding.
pub(crate) struct ReuseJoin {
    ctx: MatchContext,
    rows: Vec<Tuple>,
    groups: Vec<Group>,
    pending: VecDeque<Tuple>,
    state: State,
}

impl ReuseJoin {
    pub(crate) fn new(ctx: MatchContext, rows: Vec<Tuple>, plan: ReusePlan) -> Self {
        Self { ctx, rows, groups: plan.groups, pending: VecDeque::new(), state: State::Init }
    }
}

impl Iterator for ReuseJoin {
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
                    let (Some(first), Some(last)) = (self.groups.first(), self.groups.last()) else {
                        return None;
                    };
                    match self.ctx.store.scan_keys_only(self.ctx.analysis.index, &first.start, &last.end) {
                        Ok(cursor) => self.state = State::Scanning { cursor, group: 0 },
                        Err(e) => return Some(Err(e)),
                    }
                }
                State::Scanning { mut cursor, mut group } => loop {
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

                    let step = match cursor.key() {
                        None => continue,
                        Some(key) => {
                            let mut g = group;
                            loop {
                                if key >= self.groups[g].end.as_slice() {
                                    g += 1;
                                    if g == self.groups.len() {
                                        break Step::Done;
                                    }
                                    continue;
                                }
                                if key < self.groups[g].start.as_slice() {
                                    break Step::SeekTo(g);
                                }
                                break Step::InGroup(g);
                            }
                        }
                    };

                    match step {
                        Step::Done => {
                            let _ = cursor.close();
                            return None;
                        }
                        Step::SeekTo(g) => {
                            group = g;
                            cursor.seek(&self.groups[g].start);
                        }
                        Step::InGroup(g) => {
                            group = g;
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
                            for &i in &self.groups[g].rows {
                                let tuple = self.ctx.builder.build(Some(&self.rows[i]), &datom);
                                self.pending.push_back(tuple);
                            }
                            if let Some(tuple) = self.pending.pop_front() {
                                self.state = State::Scanning { cursor, group };
                                return Some(Ok(tuple));
                            }
                        }
                    }
                },
                State::Closed => return None,
            }
        }
    }
}
