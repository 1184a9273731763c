#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use datalith::{Datom, Identity, Keyword, Matcher, MatchError, Pattern, Relation, SledStore, Slot, Store, Tuple, Value};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn kw(lit: &str) -> Keyword { Keyword::parse(lit).unwrap() }

pub fn id(label: &str) -> Identity { Identity::from_label(label) }

pub fn test_store() -> Result<Arc<SledStore>> { Ok(Arc::new(SledStore::new_test()?)) }

pub fn collect(rel: Relation) -> Result<Vec<Tuple>, MatchError> { rel.into_iter().collect() }

/// Multiset view of a tuple list, for strategy-equivalence comparisons.
pub fn as_multiset(tuples: &[Tuple]) -> Vec<String> {
    let mut out: Vec<String> = tuples.iter().map(|t| format!("{t:?}")).collect();
    out.sort();
    out
}

/// Three symbols with tickers and ten price bars each: thirty
/// (:price/symbol, :price/open) pairs in total.
pub fn seed_price_bars(store: &SledStore) -> Result<()> {
    let mut tx = 0;
    for (s, ticker) in ["AAA", "BBB", "CCC"].iter().enumerate() {
        let sym = id(ticker);
        tx += 1;
        store.assert(&[Datom::new(sym, kw(":symbol/ticker"), Value::from(*ticker), tx)])?;
        for b in 0..10 {
            let bar = id(&format!("{ticker}-bar-{b}"));
            tx += 1;
            store.assert(&[
                Datom::new(bar, kw(":price/symbol"), Value::Ref(sym), tx),
                Datom::new(bar, kw(":price/open"), Value::Float(100.0 + (s * 10 + b) as f64), tx),
            ])?;
        }
    }
    Ok(())
}

/// The `[?s :symbol/ticker ?t]` relation over a seeded store, materialized.
pub fn ticker_bindings(store: &Arc<SledStore>) -> Result<Relation> {
    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::var("?s"), Slot::Const(kw(":symbol/ticker")), Slot::var("?t"));
    Ok(Relation::Materialized(matcher.match_pattern(&pattern, None)?.materialize()?))
}
