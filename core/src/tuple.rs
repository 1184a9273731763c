//! Output rows and the builder that projects datoms into them.

use std::collections::HashSet;
use std::ops::Index;

use crate::datom::{Datom, Pos};
use crate::keyword::Keyword;
use crate::pattern::{Pattern, Var};
use crate::value::Value;

/// A fixed-arity row of values; arity equals the relation's column count.
///
/// Tuples handed to the executor are independently owned: mutating or
/// dropping one never affects another. The only aliasing surface is
/// `TupleBuilder::build_into`, which exists for inner loops and says so.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self { Self(values) }

    pub fn values(&self) -> &[Value] { &self.0 }

    pub fn get(&self, i: usize) -> Option<&Value> { self.0.get(i) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn into_values(self) -> Vec<Value> { self.0 }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self { Self(values) }
}

impl Index<usize> for Tuple {
    type Output = Value;

    fn index(&self, i: usize) -> &Value { &self.0[i] }
}

#[derive(Debug, Clone, Copy)]
enum ColumnSource {
    /// Passed through from the binding row.
    Binding(usize),
    /// Projected from the datom.
    Component(Pos),
}

/// Projects (binding row, datom) pairs into output tuples.
///
/// Construction precomputes, per output column, which datom component or
/// binding column supplies it; `build` then fills a fresh tuple in one pass.
/// Keywords are interned: every occurrence of the same attribute or keyword
/// value across all built tuples shares one allocation. Identities are plain
/// 20-byte copies and need no interning.
pub struct TupleBuilder {
    columns: Vec<Var>,
    sources: Vec<ColumnSource>,
    interned: HashSet<Keyword>,
}

impl TupleBuilder {
    /// Output columns are the binding columns followed by the pattern's
    /// fresh variables in E, A, V, Tx order.
    pub fn new(pattern: &Pattern, binding_columns: &[Var]) -> Self {
        let mut columns: Vec<Var> = binding_columns.to_vec();
        let mut sources: Vec<ColumnSource> = (0..binding_columns.len()).map(ColumnSource::Binding).collect();
        for pos in pattern.positions() {
            if let Some(var) = pattern.var_at(*pos) {
                if !columns.contains(var) {
                    columns.push(var.clone());
                    sources.push(ColumnSource::Component(*pos));
                }
            }
        }
        Self { columns, sources, interned: HashSet::new() }
    }

    pub fn columns(&self) -> &[Var] { &self.columns }

    /// Build an independently owned tuple.
    pub fn build(&mut self, binding: Option<&Tuple>, datom: &Datom) -> Tuple {
        let mut out = Tuple(Vec::with_capacity(self.sources.len()));
        self.fill(binding, datom, &mut out.0);
        out
    }

    /// Fill a caller-owned workspace tuple, reusing its allocation.
    ///
    /// The workspace is overwritten on every call: a caller that retains the
    /// tuple (or anything borrowed from it) across the producer's next
    /// advance must copy it first. Use `build` wherever a tuple outlives the
    /// loop iteration.
    pub fn build_into(&mut self, binding: Option<&Tuple>, datom: &Datom, out: &mut Tuple) {
        let mut values = std::mem::take(&mut out.0);
        values.clear();
        self.fill(binding, datom, &mut values);
        out.0 = values;
    }

    fn fill(&mut self, binding: Option<&Tuple>, datom: &Datom, out: &mut Vec<Value>) {
        for source in &self.sources {
            let value = match source {
                ColumnSource::Binding(i) => match binding {
                    Some(row) => row[*i].clone(),
                    None => continue,
                },
                ColumnSource::Component(pos) => datom.component(*pos),
            };
            out.push(intern_keyword(&mut self.interned, value));
        }
    }
}

fn intern_keyword(interned: &mut HashSet<Keyword>, value: Value) -> Value {
    match value {
        Value::Keyword(k) => {
            if let Some(existing) = interned.get(&k) {
                Value::Keyword(existing.clone())
            } else {
                interned.insert(k.clone());
                Value::Keyword(k)
            }
        }
        other => other,
    }
}
