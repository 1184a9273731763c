mod common;

use std::sync::Arc;

use anyhow::Result;
use common::*;
use datalith::{Datom, Matcher, Pattern, Slot, Store, Value};

#[test]
fn tx_ceiling_hides_everything_later() -> Result<()> {
    let store = test_store()?;
    for i in 1..=100u64 {
        let mut tx = store.begin_tx()?;
        tx.assert(id(&format!("event-{i}")), kw(":log/line"), Value::Int(i as i64))?;
        assert_eq!(tx.commit()?, i);
    }

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>).as_of(50);
    let pattern =
        Pattern::new(Slot::var("?e"), Slot::Const(kw(":log/line")), Slot::var("?v")).with_tx(Slot::var("?tx"));
    let tuples = collect(matcher.match_pattern(&pattern, None)?)?;

    assert_eq!(tuples.len(), 50);
    for t in &tuples {
        match &t[2] {
            Value::Int(tx) => assert!(*tx <= 50, "datom from tx {tx} leaked past the ceiling"),
            other => panic!("expected a tx value, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn ceiling_zero_means_latest() -> Result<()> {
    let store = test_store()?;
    for i in 1..=10u64 {
        store.assert(&[Datom::new(id(&format!("event-{i}")), kw(":log/line"), Value::Int(i as i64), i)])?;
    }
    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::var("?e"), Slot::Const(kw(":log/line")), Slot::var("?v"));
    assert_eq!(collect(matcher.match_pattern(&pattern, None)?)?.len(), 10);
    Ok(())
}

#[test]
fn retractions_are_invisible_to_plain_matches() -> Result<()> {
    let store = test_store()?;
    let alice = id("alice");
    store.assert(&[Datom::new(alice, kw(":user/name"), Value::from("Alice"), 1)])?;
    store.retract(&[Datom::retraction(alice, kw(":user/name"), Value::from("Alice"), 2)])?;

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let plain = Pattern::new(Slot::var("?e"), Slot::Const(kw(":user/name")), Slot::var("?v"));
    assert_eq!(collect(matcher.match_pattern(&plain, None)?)?.len(), 1);

    // History access through the tx position sees both polarities.
    let history = plain.clone().with_tx(Slot::var("?tx"));
    assert_eq!(collect(matcher.match_pattern(&history, None)?)?.len(), 2);
    Ok(())
}

#[test]
fn history_scan_by_transaction_uses_taev() -> Result<()> {
    let store = test_store()?;
    seed_price_bars(&store)?;

    // Everything written by transaction 2: one bar's two datoms.
    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern =
        Pattern::new(Slot::var("?e"), Slot::var("?a"), Slot::var("?v")).with_tx(Slot::Const(2));
    let tuples = collect(matcher.match_pattern(&pattern, None)?)?;
    assert_eq!(tuples.len(), 2);
    Ok(())
}
