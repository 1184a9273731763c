mod common;

use std::sync::Arc;

use anyhow::Result;
use common::*;
use datalith::{Datom, Matcher, Pattern, Slot, Store, Tuple, Value, Var};

#[test]
fn insert_and_match_round_trips() -> Result<()> {
    let store = test_store()?;
    let alice = id("alice");
    store.assert(&[Datom::new(alice, kw(":user/name"), Value::from("Alice"), 1)])?;

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::var("?e"), Slot::Const(kw(":user/name")), Slot::var("?v"));
    let rel = matcher.match_pattern(&pattern, None)?;
    assert_eq!(rel.columns(), &[Var::new("?e"), Var::new("?v")]);

    let tuples = collect(rel)?;
    assert_eq!(tuples, vec![Tuple::new(vec![Value::Ref(alice), Value::from("Alice")])]);
    Ok(())
}

#[test]
fn every_value_type_round_trips_through_the_store() -> Result<()> {
    let store = test_store()?;
    let e = id("kitchen-sink");
    let instant = chrono::DateTime::parse_from_rfc3339("2025-06-05T10:00:00Z")?.to_utc();
    let datoms = vec![
        Datom::new(e, kw(":t/bool"), Value::Bool(true), 1),
        Datom::new(e, kw(":t/int"), Value::Int(-42), 1),
        Datom::new(e, kw(":t/float"), Value::Float(2.5), 1),
        Datom::new(e, kw(":t/str"), Value::from("hello \u{0} world"), 1),
        Datom::new(e, kw(":t/instant"), Value::from(instant), 1),
        Datom::new(e, kw(":t/ref"), Value::Ref(id("other")), 1),
        Datom::new(e, kw(":t/kw"), Value::Keyword(kw(":enum/variant")), 1),
        Datom::new(e, kw(":t/bytes"), Value::Bytes(vec![0, 1, 2, 0xFF, 0]), 1),
    ];
    store.assert(&datoms)?;

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    for datom in &datoms {
        let pattern = Pattern::new(Slot::Const(e), Slot::Const(datom.a.clone()), Slot::var("?v"));
        let tuples = collect(matcher.match_pattern(&pattern, None)?)?;
        assert_eq!(tuples, vec![Tuple::new(vec![datom.v.clone()])], "{}", datom.a);
    }
    Ok(())
}

#[test]
fn entity_centric_read_uses_the_entity_prefix() -> Result<()> {
    let store = test_store()?;
    seed_price_bars(&store)?;

    // One bar entity has exactly its two attributes.
    let bar = id("AAA-bar-3");
    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::Const(bar), Slot::var("?a"), Slot::var("?v"));

    let metrics = store.metrics();
    metrics.reset();
    let tuples = collect(matcher.match_pattern(&pattern, None)?)?;
    assert_eq!(tuples.len(), 2);
    // The scan touched that entity's keys, not the whole database.
    assert_eq!(metrics.keys_scanned(), 2);
    Ok(())
}
