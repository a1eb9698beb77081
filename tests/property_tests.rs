//! Property-based tests for spendwise
//!
//! These tests verify invariants that must hold for all inputs:
//! - Compiled filters bind exactly one parameter per placeholder
//! - Filter parsing and date normalization never panic
//! - Compiled filters are valid SQL against a real table
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;
use serde_json::{json, Value};

fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1.0e9f64..1.0e9).prop_map(|f| json!(f)),
        "[a-zA-Z0-9 %_^$']{0,8}".prop_map(Value::String),
    ]
}

fn predicate() -> impl Strategy<Value = spendwise::storage::Predicate> {
    use spendwise::storage::Predicate;

    let leaf = prop_oneof![
        leaf_value().prop_map(Predicate::Eq),
        leaf_value().prop_map(Predicate::Ne),
        leaf_value().prop_map(Predicate::Gt),
        leaf_value().prop_map(Predicate::Gte),
        leaf_value().prop_map(Predicate::Lt),
        leaf_value().prop_map(Predicate::Lte),
        prop::collection::vec(leaf_value(), 0..5).prop_map(Predicate::In),
        prop::collection::vec(leaf_value(), 0..5).prop_map(Predicate::NotIn),
        "[a-z^$%]{0,6}".prop_map(Predicate::Pattern),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Predicate::Or),
            prop::collection::vec(inner, 0..4).prop_map(Predicate::And),
        ]
    })
}

fn filter() -> impl Strategy<Value = spendwise::Filter> {
    let field = prop::sample::select(vec!["name", "price", "status", "createdAt"]);
    prop::collection::vec((field, predicate()), 0..5).prop_map(|clauses| {
        clauses
            .into_iter()
            .fold(spendwise::Filter::new(), |f, (field, p)| f.and(field, p))
    })
}

// ============================================================================
// FILTER COMPILER TESTS
// ============================================================================

mod filter_tests {
    use super::*;
    use spendwise::storage::parse_filter;

    proptest! {
        /// Invariant: one bound parameter per `?`, always
        #[test]
        fn placeholder_param_parity(f in filter()) {
            let condition = f.compile().unwrap();
            let placeholders = condition.clause.matches('?').count();
            prop_assert_eq!(placeholders, condition.params.len());
        }

        /// Invariant: a filter whose every predicate is empty compiles to nothing
        #[test]
        fn empty_filters_compile_to_nothing(f in filter()) {
            let condition = f.compile().unwrap();
            prop_assert_eq!(f.is_empty(), condition.is_empty());
            if condition.is_empty() {
                prop_assert_eq!(condition.where_clause(), "");
                prop_assert!(condition.params.is_empty());
            }
        }

        /// Invariant: fields that are not identifiers are rejected
        #[test]
        fn unsafe_field_names_rejected(field in "[a-z]{1,5}[ ;'()-][a-z]{0,5}") {
            let f = spendwise::Filter::new().eq(field, 1);
            prop_assert!(f.compile().is_err());
        }

        /// Invariant: parse_filter never panics on arbitrary JSON text
        #[test]
        fn parse_never_panics(s in "\\PC{0,80}") {
            if let Ok(value) = serde_json::from_str::<Value>(&s) {
                let _ = parse_filter(&value);
            }
        }

        /// Invariant: parsed operator objects keep placeholder parity
        #[test]
        fn parsed_filters_keep_parity(
            gt in any::<i64>(),
            values in prop::collection::vec("[a-z]{0,4}", 0..6),
            pattern in "\\^?[a-z]{0,4}\\$?",
        ) {
            let f = parse_filter(&json!({
                "price": {"$gt": gt},
                "status": {"nin": values},
                "name": {"$or": [{"$regex": pattern}, "x"]},
            }))
            .unwrap();
            let condition = f.compile().unwrap();
            prop_assert_eq!(condition.clause.matches('?').count(), condition.params.len());
        }
    }
}

// ============================================================================
// SQL VALIDITY TESTS
// ============================================================================

mod sql_tests {
    use super::*;
    use std::sync::Arc;

    use spendwise::schema::ColumnDescriptor;
    use spendwise::{EntitySchema, EntityStore, Migrator, SqlEngine, SqliteEngine};

    fn store() -> EntityStore {
        let engine: Arc<dyn SqlEngine> = Arc::new(SqliteEngine::open_in_memory().unwrap());
        let schema = EntitySchema::builder("Item", "Item")
            .column(ColumnDescriptor::text("_id").required().primary_key())
            .column(ColumnDescriptor::text("name"))
            .column(ColumnDescriptor::real("price"))
            .column(ColumnDescriptor::text("status"))
            .column(ColumnDescriptor::timestamp("createdAt"))
            .build()
            .unwrap();
        Migrator::new(engine.clone()).migrate(&schema).unwrap();
        EntityStore::new(engine, Arc::new(schema))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Invariant: every compiled filter runs against a matching table
        #[test]
        fn compiled_filters_execute(f in filter()) {
            let store = store();
            prop_assert!(store.find(&f).is_ok());
            prop_assert!(store.count(&f).is_ok());
        }
    }
}

// ============================================================================
// DATE NORMALIZATION TESTS
// ============================================================================

mod date_tests {
    use super::*;
    use spendwise::sync::fix_date;

    proptest! {
        /// Invariant: fix_date never panics
        #[test]
        fn never_panics(s in "\\PC{0,40}") {
            let _ = fix_date(&json!(s));
        }

        /// Invariant: normalized output is a fixed point
        #[test]
        fn normalization_is_idempotent(
            y in 1971i32..2100,
            m in 1u32..=12,
            d in 1u32..=28,
            h in 0u32..24,
            min in 0u32..60,
        ) {
            let input = format!("{:04}-{:02}-{:02} {:02}:{:02}:00", y, m, d, h, min);
            let once = fix_date(&json!(input)).unwrap();
            prop_assert!(once.ends_with(".000Z"));
            prop_assert_eq!(fix_date(&json!(once.clone())), Some(once));
        }

        /// Invariant: day-first and ISO date forms agree
        #[test]
        fn day_first_matches_iso(y in 1971i32..2100, m in 1u32..=12, d in 1u32..=28) {
            let iso = fix_date(&json!(format!("{:04}-{:02}-{:02}", y, m, d)));
            let day_first = fix_date(&json!(format!("{:02}/{:02}/{:04}", d, m, y)));
            prop_assert!(iso.is_some());
            prop_assert_eq!(iso, day_first);
        }
    }
}
