mod common;

use std::sync::Arc;

use anyhow::Result;
use common::*;
use datalith::{CancelToken, Datom, MatchError, Matcher, Pattern, Slot, Store, Value};

fn seed_large(store: &datalith::SledStore) -> Result<()> {
    let datoms: Vec<Datom> =
        (0..5000).map(|i| Datom::new(id(&format!("row-{i}")), kw(":big/value"), Value::Int(i), 1)).collect();
    store.assert(&datoms)?;
    Ok(())
}

#[test]
fn cancel_mid_scan_reports_once_then_ends() -> Result<()> {
    let store = test_store()?;
    seed_large(&store)?;

    let cancel = CancelToken::new();
    let matcher = Matcher::new(store.clone() as Arc<dyn Store>).with_cancel(cancel.clone());
    let pattern = Pattern::new(Slot::var("?e"), Slot::Const(kw(":big/value")), Slot::var("?v"));
    let mut iter = matcher.match_pattern(&pattern, None)?.into_iter();

    for _ in 0..10 {
        assert!(matches!(iter.next(), Some(Ok(_))));
    }
    cancel.cancel();
    assert!(matches!(iter.next(), Some(Err(MatchError::Cancelled))));
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
    Ok(())
}

#[test]
fn cancel_before_the_first_pull() -> Result<()> {
    let store = test_store()?;
    seed_large(&store)?;

    let cancel = CancelToken::new();
    cancel.cancel();
    // Cancelling is idempotent.
    cancel.cancel();

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>).with_cancel(cancel);
    let pattern = Pattern::new(Slot::var("?e"), Slot::Const(kw(":big/value")), Slot::var("?v"));
    let mut iter = matcher.match_pattern(&pattern, None)?.into_iter();
    assert!(matches!(iter.next(), Some(Err(MatchError::Cancelled))));
    assert!(iter.next().is_none());
    Ok(())
}

#[test]
fn cancel_inside_a_join_releases_the_cursor() -> Result<()> {
    let store = test_store()?;
    seed_price_bars(&store)?;

    let cancel = CancelToken::new();
    let matcher = Matcher::new(store.clone() as Arc<dyn Store>).with_cancel(cancel.clone());
    let bindings = ticker_bindings(&store)?;
    let bars = Pattern::new(Slot::var("?b"), Slot::Const(kw(":price/symbol")), Slot::var("?s"));
    let mut iter = matcher.match_pattern(&bars, Some(bindings))?.into_iter();

    assert!(matches!(iter.next(), Some(Ok(_))));
    cancel.cancel();
    assert!(matches!(iter.next(), Some(Err(MatchError::Cancelled))));
    assert!(iter.next().is_none());

    // The store stays fully usable afterwards.
    let fresh = Matcher::new(store.clone() as Arc<dyn Store>);
    assert_eq!(collect(fresh.match_pattern(&bars, None)?)?.len(), 30);
    Ok(())
}
