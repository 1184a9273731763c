mod common;

use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use common::*;
use datalith::{Constraint, Datom, Matcher, Pattern, Pos, Slot, Store, TimeField, Value};

/// Ten daily bars at 10:00 UTC, one per day of June 2025.
fn seed_daily_prices(store: &datalith::SledStore) -> Result<()> {
    for i in 1..=10u32 {
        let bar = id(&format!("bar-{i}"));
        let at = Utc.with_ymd_and_hms(2025, 6, i, 10, 0, 0).unwrap();
        store.assert(&[Datom::new(bar, kw(":price/time"), Value::from(at), (i + 1) as u64)])?;
    }
    Ok(())
}

#[test]
fn time_component_push_down_selects_one_day() -> Result<()> {
    let store = test_store()?;
    seed_daily_prices(&store)?;

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::var("?b"), Slot::Const(kw(":price/time")), Slot::var("?t"));
    let constraints = vec![Constraint::time_component(Pos::V, TimeField::Day, 5, chrono_tz::UTC)];
    let tuples = collect(matcher.match_with_constraints(&pattern, None, constraints)?)?;

    assert_eq!(tuples.len(), 1);
    let expected = Utc.with_ymd_and_hms(2025, 6, 5, 10, 0, 0).unwrap();
    assert_eq!(tuples[0][0], Value::Ref(id("bar-5")));
    assert_eq!(tuples[0][1], Value::from(expected));
    Ok(())
}

#[test]
fn constraints_apply_in_caller_order_and_conjoin() -> Result<()> {
    let store = test_store()?;
    seed_daily_prices(&store)?;

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::var("?b"), Slot::Const(kw(":price/time")), Slot::var("?t"));
    let lo = Value::from(Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap());
    let hi = Value::from(Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap());
    let constraints = vec![
        Constraint::range(Pos::V, lo, hi),
        Constraint::time_component(Pos::V, TimeField::Dow, 4, chrono_tz::UTC),
    ];
    // June 3rd through 7th 2025, Thursdays only: the 5th.
    let tuples = collect(matcher.match_with_constraints(&pattern, None, constraints)?)?;
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0][0], Value::Ref(id("bar-5")));
    Ok(())
}

#[test]
fn mismatched_constraint_types_filter_everything() -> Result<()> {
    let store = test_store()?;
    seed_daily_prices(&store)?;

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::var("?b"), Slot::Const(kw(":price/time")), Slot::var("?t"));
    // An int constraint over instants: not an error, just no matches.
    let constraints = vec![Constraint::equality(Pos::V, Value::Int(5))];
    let tuples = collect(matcher.match_with_constraints(&pattern, None, constraints)?)?;
    assert!(tuples.is_empty());
    Ok(())
}

#[test]
fn equality_constraint_on_the_entity_position() -> Result<()> {
    let store = test_store()?;
    seed_daily_prices(&store)?;

    let matcher = Matcher::new(store.clone() as Arc<dyn Store>);
    let pattern = Pattern::new(Slot::var("?b"), Slot::Const(kw(":price/time")), Slot::var("?t"));
    let constraints = vec![Constraint::equality(Pos::E, Value::Ref(id("bar-7")))];
    let tuples = collect(matcher.match_with_constraints(&pattern, None, constraints)?)?;
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0][0], Value::Ref(id("bar-7")));
    Ok(())
}
