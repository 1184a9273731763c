//! Data patterns and the per-pattern analysis that picks an index and a
//! scan range.

use std::fmt;

use tracing::warn;

use crate::datom::Pos;
use crate::identity::Identity;
use crate::indexing::{codec, IndexType};
use crate::keyword::Keyword;
use crate::value::Value;

/// A named query variable, `?e` style. Relations are column-named by `Var`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }

    pub fn name(&self) -> &str { &self.0 }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self { Var::new(name) }
}

/// One pattern position: a constant or a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Const(T),
    Var(Var),
}

impl<T> Slot<T> {
    pub fn var(name: &str) -> Self { Slot::Var(Var::new(name)) }

    pub fn as_const(&self) -> Option<&T> {
        match self {
            Slot::Const(v) => Some(v),
            Slot::Var(_) => None,
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Slot::Const(_) => None,
            Slot::Var(v) => Some(v),
        }
    }
}

/// A datom template: three positions, optionally four when the pattern
/// addresses transaction time.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub e: Slot<Identity>,
    pub a: Slot<Keyword>,
    pub v: Slot<Value>,
    pub tx: Option<Slot<u64>>,
}

impl Pattern {
    pub fn new(e: Slot<Identity>, a: Slot<Keyword>, v: Slot<Value>) -> Self { Self { e, a, v, tx: None } }

    pub fn with_tx(mut self, tx: Slot<u64>) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Positions this pattern has, in datom order.
    pub fn positions(&self) -> &'static [Pos] {
        if self.tx.is_some() {
            &[Pos::E, Pos::A, Pos::V, Pos::Tx]
        } else {
            &[Pos::E, Pos::A, Pos::V]
        }
    }

    pub fn var_at(&self, pos: Pos) -> Option<&Var> {
        match pos {
            Pos::E => self.e.as_var(),
            Pos::A => self.a.as_var(),
            Pos::V => self.v.as_var(),
            Pos::Tx => self.tx.as_ref().and_then(|slot| slot.as_var()),
        }
    }

    /// The constant at `pos`, lifted into the value space so it can be
    /// encoded with the same component codec bound values use.
    pub fn const_value(&self, pos: Pos) -> Option<Value> {
        match pos {
            Pos::E => self.e.as_const().map(|id| Value::Ref(*id)),
            Pos::A => self.a.as_const().map(|k| Value::Keyword(k.clone())),
            Pos::V => self.v.as_const().cloned(),
            Pos::Tx => self.tx.as_ref().and_then(|slot| slot.as_const()).map(|tx| Value::Int(*tx as i64)),
        }
    }

    /// The pattern's variables in E, A, V, Tx order, first occurrence only.
    pub fn vars(&self) -> Vec<Var> {
        let mut vars: Vec<Var> = Vec::new();
        for pos in self.positions() {
            if let Some(var) = self.var_at(*pos) {
                if !vars.contains(var) {
                    vars.push(var.clone());
                }
            }
        }
        vars
    }
}

/// How the analyzer classified one pattern position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionClass {
    Const,
    /// A variable the binding relation supplies values for.
    Bound,
    Free,
}

/// A position bound through the join, with its binding-relation column.
#[derive(Debug, Clone, Copy)]
pub struct BoundPos {
    pub pos: Pos,
    pub column: usize,
}

/// The analyzer's verdict: chosen index, the tightest range expressible
/// from constants alone, and the per-position classification. Bound
/// positions tighten further per join strategy.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub index: IndexType,
    pub start: Vec<u8>,
    pub end: Vec<u8>,
    pub e: PositionClass,
    pub a: PositionClass,
    pub v: PositionClass,
    pub tx: PositionClass,
    /// Positions bound via the binding relation, in index component order.
    pub bound: Vec<BoundPos>,
    /// Position pairs that must carry the same value because the pattern
    /// repeats a variable.
    pub same_value: Vec<(Pos, Pos)>,
    /// How many leading index components the constant prefix covers.
    pub const_prefix_len: usize,
    pub full_scan: bool,
}

impl Analysis {
    pub fn class(&self, pos: Pos) -> PositionClass {
        match pos {
            Pos::E => self.e,
            Pos::A => self.a,
            Pos::V => self.v,
            Pos::Tx => self.tx,
        }
    }

    pub fn bound_column(&self, pos: Pos) -> Option<usize> {
        self.bound.iter().find(|b| b.pos == pos).map(|b| b.column)
    }
}

/// Classify the pattern against the binding relation's columns, pick the
/// index, and compute the constant-prefix scan range.
///
/// Index choice, first match wins ("known" means constant or bound):
/// E+A -> EAVT; A+V -> AVET; A -> AEVT; V -> VAET; Tx -> TAEV; E -> EAVT;
/// otherwise a full EAVT scan.
pub fn analyze(pattern: &Pattern, binding_columns: &[Var]) -> Analysis {
    let classify = |pos: Pos| -> PositionClass {
        if pattern.const_value(pos).is_some() {
            PositionClass::Const
        } else if pattern.var_at(pos).is_some_and(|var| binding_columns.contains(var)) {
            PositionClass::Bound
        } else {
            PositionClass::Free
        }
    };

    let e = classify(Pos::E);
    let a = classify(Pos::A);
    let v = classify(Pos::V);
    let tx = if pattern.tx.is_some() { classify(Pos::Tx) } else { PositionClass::Free };

    let known = |class: PositionClass| class != PositionClass::Free;

    let mut full_scan = false;
    let index = if known(e) && known(a) {
        IndexType::Eavt
    } else if known(a) && known(v) {
        IndexType::Avet
    } else if known(a) {
        IndexType::Aevt
    } else if known(v) {
        IndexType::Vaet
    } else if known(tx) {
        IndexType::Taev
    } else if known(e) {
        IndexType::Eavt
    } else {
        full_scan = true;
        IndexType::Eavt
    };

    if full_scan {
        warn!("pattern binds no position; falling back to a full EAVT scan");
    }

    let class = |pos: Pos| match pos {
        Pos::E => e,
        Pos::A => a,
        Pos::V => v,
        Pos::Tx => tx,
    };

    // Constant prefix: leading index components that are constants encode
    // directly into the range. The first non-constant component ends it.
    let mut start = vec![index.tag()];
    let mut const_prefix_len = 0;
    for pos in index.components() {
        match pattern.const_value(pos).and_then(|value| codec::encode_component_value(pos, &value)) {
            Some(bytes) => {
                start.extend_from_slice(&bytes);
                const_prefix_len += 1;
            }
            None => break,
        }
    }
    let end = codec::prefix_end(&start);

    // Bound positions in index component order, so strategies can extend
    // the prefix in the order the key concatenates.
    let mut bound = Vec::new();
    for pos in index.components() {
        if class(pos) == PositionClass::Bound {
            if let Some(var) = pattern.var_at(pos) {
                if let Some(column) = binding_columns.iter().position(|c| c == var) {
                    bound.push(BoundPos { pos, column });
                }
            }
        }
    }

    // Repeated variables induce a same-value filter between positions.
    let mut same_value = Vec::new();
    let positions = pattern.positions();
    for (i, first) in positions.iter().enumerate() {
        for later in &positions[i + 1..] {
            if let (Some(x), Some(y)) = (pattern.var_at(*first), pattern.var_at(*later)) {
                if x == y {
                    same_value.push((*first, *later));
                }
            }
        }
    }

    Analysis { index, start, end, e, a, v, tx, bound, same_value, const_prefix_len, full_scan }
}
