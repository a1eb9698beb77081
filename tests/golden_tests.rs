//! Golden tests - fixture-based tests that lock expected behavior
//!
//! These tests use JSON fixtures to verify that filter compilation and date
//! normalization produce expected outputs. Any change in behavior will cause
//! these tests to fail, signaling a potential breaking change.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use serde_json::Value;
use std::fs;

fn read_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
}

// ============================================================================
// FILTER COMPILATION GOLDEN TESTS
// ============================================================================

mod filter_golden {
    use super::*;
    use spendwise::storage::parse_filter;
    use spendwise::{Result, SpendwiseError};

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        filter: Value,
        expected: Expected,
    }

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum Expected {
        Ok { ok: Compiled },
        Err { err: String },
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Compiled {
        clause: String,
        params: Vec<Value>,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    fn compile(filter: &Value) -> Result<Compiled> {
        let condition = parse_filter(filter)?.compile()?;
        Ok(Compiled {
            clause: condition.clause,
            params: condition.params.into_iter().map(|p| p.into_json()).collect(),
        })
    }

    #[test]
    fn test_filter_compilation_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("filter_compilation.json"))
            .expect("Failed to parse fixture JSON");
        assert!(!fixture.test_cases.is_empty());

        for case in fixture.test_cases {
            let result = compile(&case.filter);
            match case.expected {
                Expected::Ok { ok } => match result {
                    Ok(compiled) => {
                        assert_eq!(compiled, ok, "Case '{}': compiled output mismatch", case.name)
                    }
                    Err(e) => panic!("Case '{}': expected Ok, got Err({})", case.name, e),
                },
                Expected::Err { err } => {
                    let actual = match result {
                        Ok(compiled) => {
                            panic!("Case '{}': expected Err({}), got {:?}", case.name, err, compiled)
                        }
                        Err(SpendwiseError::InvalidInput(_)) => "InvalidInput",
                        Err(other) => panic!("Case '{}': unexpected error {:?}", case.name, other),
                    };
                    assert_eq!(actual, err, "Case '{}': error type mismatch", case.name);
                }
            }
        }
    }
}

// ============================================================================
// DATE NORMALIZATION GOLDEN TESTS
// ============================================================================

mod date_golden {
    use super::*;
    use spendwise::sync::fix_date;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: Value,
        expected: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_date_normalization_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("date_normalization.json"))
            .expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let result = fix_date(&case.input);
            assert_eq!(
                result, case.expected,
                "Case '{}': input={}, expected={:?}, got={:?}",
                case.name, case.input, case.expected, result
            );
        }
    }
}

// ============================================================================
// BUILT-IN SCHEMA DDL GOLDEN TESTS
// ============================================================================

mod ddl_golden {
    use spendwise::schema::ddl::{build_create_indexes, build_create_table};
    use spendwise::schema::{Income, Model, Note, SpendItem};

    #[test]
    fn test_spend_item_ddl() {
        let schema = SpendItem::schema().unwrap();
        let sql = build_create_table(&schema);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS SpendItem (_id TEXT NOT NULL PRIMARY KEY"));
        assert!(sql.contains("listId TEXT NOT NULL"));
        assert!(sql.contains("date TEXT NOT NULL"));
        assert!(sql.ends_with("_v INTEGER NOT NULL DEFAULT '0')"));
        assert!(build_create_indexes(&schema)
            .contains(&"CREATE INDEX IF NOT EXISTS idx_SpendItem_date ON SpendItem(date)".to_string()));
    }

    #[test]
    fn test_note_and_income_have_bookkeeping() {
        for schema in [Note::schema().unwrap(), Income::schema().unwrap()] {
            let sql = build_create_table(&schema);
            assert!(sql.contains("createdAt TEXT"), "{}", sql);
            assert!(sql.contains("updatedAt TEXT"), "{}", sql);
            assert!(
                sql.contains("status TEXT CHECK(status IN ('Active', 'Inactive')) DEFAULT 'Active'"),
                "{}",
                sql
            );
        }
    }
}
