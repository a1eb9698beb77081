//! Query filters and their compilation to parameterized SQL
//!
//! A filter is an ordered list of `(field, predicate)` pairs joined with
//! `AND`. The JSON form follows the familiar document-store grammar:
//!
//! ```json
//! {
//!   "status": "Active",
//!   "price": {"$gt": 10000, "$lte": 50000},
//!   "name": {"$regex": "^Co"},
//!   "listId": {"$in": ["a", "b"]},
//!   "details": {"$or": ["lunch", "dinner"]}
//! }
//! ```
//!
//! `$regex` is an anchoring shorthand, not a regular expression: `^x$` is an
//! exact match, `^x` a prefix, `x$` a suffix and anything else a substring.
//! LIKE wildcards inside the pattern are passed through unescaped.
//!
//! Empty values (`null`, `""`, empty lists) are skipped, so an empty filter
//! matches every row. Equality also skips the other falsy values, `0` and
//! `false`; comparison operators keep them (`{"price": {"$gt": 0}}`).

use serde_json::Value;

use super::value::SqlValue;
use crate::error::{Result, SpendwiseError};
use crate::schema::column::is_identifier;

/// Condition on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Anchoring shorthand compiled to `=` or `LIKE`
    Pattern(String),
    /// Any inner predicate holds for the same field
    Or(Vec<Predicate>),
    /// Every inner predicate holds for the same field
    And(Vec<Predicate>),
}

impl Predicate {
    /// Whether this predicate contributes nothing to the WHERE clause
    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::Eq(v) => is_falsy(v),
            Predicate::Ne(v)
            | Predicate::Gt(v)
            | Predicate::Gte(v)
            | Predicate::Lt(v)
            | Predicate::Lte(v) => is_empty_value(v),
            Predicate::In(values) | Predicate::NotIn(values) => values.is_empty(),
            Predicate::Pattern(p) => p.is_empty(),
            Predicate::Or(inner) | Predicate::And(inner) => inner.iter().all(Predicate::is_empty),
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        other => is_empty_value(other),
    }
}

/// Ordered field predicates, joined with `AND`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Predicate)>,
}

impl Filter {
    /// Empty filter; matches every row
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(field: impl Into<String>, predicate: Predicate) -> Self {
        Self::new().and(field, predicate)
    }

    pub fn and(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.clauses.push((field.into(), predicate));
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Predicate::Eq(value.into()))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Predicate::Ne(value.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Predicate::Gt(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Predicate::Gte(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Predicate::Lt(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Predicate::Lte(value.into()))
    }

    pub fn pattern(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.and(field, Predicate::Pattern(pattern.into()))
    }

    pub fn clauses(&self) -> &[(String, Predicate)] {
        &self.clauses
    }

    /// True when compiling would produce no condition at all
    pub fn is_empty(&self) -> bool {
        self.clauses.iter().all(|(_, p)| p.is_empty())
    }

    pub fn compile(&self) -> Result<Condition> {
        let mut builder = SqlBuilder::new();
        let mut parts = Vec::new();
        for (field, predicate) in &self.clauses {
            if !is_identifier(field) {
                return Err(SpendwiseError::InvalidInput(format!(
                    "Invalid field name '{}' in filter",
                    field
                )));
            }
            if let Some(sql) = builder.build_predicate(field, predicate) {
                parts.push(sql);
            }
        }
        Ok(Condition {
            clause: parts.join(" AND "),
            params: builder.take_params(),
        })
    }
}

/// A compiled filter: clause text without the `WHERE` keyword, plus the
/// values bound to its `?` placeholders in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    pub clause: String,
    pub params: Vec<SqlValue>,
}

impl Condition {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    /// `WHERE <clause>`, or an empty string for an empty condition
    pub fn where_clause(&self) -> String {
        if self.clause.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clause)
        }
    }
}

/// Parameter accumulator used while compiling one filter
struct SqlBuilder {
    params: Vec<SqlValue>,
}

impl SqlBuilder {
    fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// SQL for one predicate, or `None` when it is skipped
    fn build_predicate(&mut self, field: &str, predicate: &Predicate) -> Option<String> {
        if predicate.is_empty() {
            return None;
        }

        let sql = match predicate {
            Predicate::Eq(v) => self.comparison(field, "=", v),
            Predicate::Ne(v) => self.comparison(field, "!=", v),
            Predicate::Gt(v) => self.comparison(field, ">", v),
            Predicate::Gte(v) => self.comparison(field, ">=", v),
            Predicate::Lt(v) => self.comparison(field, "<", v),
            Predicate::Lte(v) => self.comparison(field, "<=", v),
            Predicate::In(values) => self.membership(field, "IN", values),
            Predicate::NotIn(values) => self.membership(field, "NOT IN", values),
            Predicate::Pattern(pattern) => self.pattern(field, pattern),
            Predicate::Or(inner) => self.group(field, " OR ", inner),
            Predicate::And(inner) => self.group(field, " AND ", inner),
        };
        Some(sql)
    }

    fn comparison(&mut self, field: &str, op: &str, value: &Value) -> String {
        self.params.push(SqlValue::from_json(value));
        format!("{} {} ?", field, op)
    }

    fn membership(&mut self, field: &str, op: &str, values: &[Value]) -> String {
        self.params.extend(values.iter().map(SqlValue::from_json));
        let placeholders = vec!["?"; values.len()].join(", ");
        format!("{} {} ({})", field, op, placeholders)
    }

    fn pattern(&mut self, field: &str, pattern: &str) -> String {
        let anchored_start = pattern.strip_prefix('^');
        let (op, value) = match anchored_start {
            Some(rest) => match rest.strip_suffix('$') {
                Some(exact) => ("=", exact.to_string()),
                None => ("LIKE", format!("{}%", rest)),
            },
            None => match pattern.strip_suffix('$') {
                Some(suffix) => ("LIKE", format!("%{}", suffix)),
                None => ("LIKE", format!("%{}%", pattern)),
            },
        };
        self.params.push(SqlValue::Text(value));
        format!("{} {} ?", field, op)
    }

    fn group(&mut self, field: &str, joiner: &str, inner: &[Predicate]) -> String {
        let parts: Vec<String> = inner
            .iter()
            .filter_map(|p| self.build_predicate(field, p))
            .collect();
        format!("({})", parts.join(joiner))
    }

    fn take_params(&mut self) -> Vec<SqlValue> {
        std::mem::take(&mut self.params)
    }
}

/// Parse a filter from its JSON form
pub fn parse_filter(json: &Value) -> Result<Filter> {
    let obj = match json {
        Value::Null => return Ok(Filter::new()),
        Value::Object(obj) => obj,
        other => {
            return Err(SpendwiseError::InvalidInput(format!(
                "Filter must be a JSON object, got {}",
                other
            )))
        }
    };

    let mut filter = Filter::new();
    for (field, value) in obj {
        for predicate in parse_field(value)? {
            filter = filter.and(field.clone(), predicate);
        }
    }
    Ok(filter)
}

/// Predicates for one field value; an operator object may yield several
fn parse_field(value: &Value) -> Result<Vec<Predicate>> {
    match value {
        Value::Object(ops) => ops
            .iter()
            .map(|(op, operand)| parse_operator(op, operand))
            .collect(),
        Value::Array(items) => Ok(vec![Predicate::In(items.clone())]),
        other => Ok(vec![Predicate::Eq(other.clone())]),
    }
}

/// One element of an `$or`/`$and` list
fn parse_nested(value: &Value) -> Result<Predicate> {
    let mut predicates = parse_field(value)?;
    if predicates.len() == 1 {
        Ok(predicates.remove(0))
    } else {
        Ok(Predicate::And(predicates))
    }
}

fn parse_operator(op: &str, operand: &Value) -> Result<Predicate> {
    let name = op.strip_prefix('$').unwrap_or(op);
    let predicate = match name {
        "eq" => Predicate::Eq(operand.clone()),
        "ne" | "neq" => Predicate::Ne(operand.clone()),
        "gt" => Predicate::Gt(operand.clone()),
        "gte" => Predicate::Gte(operand.clone()),
        "lt" => Predicate::Lt(operand.clone()),
        "lte" => Predicate::Lte(operand.clone()),
        "in" => Predicate::In(expect_array(op, operand)?),
        "nin" | "notIn" => Predicate::NotIn(expect_array(op, operand)?),
        "regex" => match operand {
            Value::String(pattern) => Predicate::Pattern(pattern.clone()),
            Value::Null => Predicate::Pattern(String::new()),
            other => {
                return Err(SpendwiseError::InvalidInput(format!(
                    "'{}' requires a string pattern, got {}",
                    op, other
                )))
            }
        },
        "or" => Predicate::Or(
            expect_array(op, operand)?
                .iter()
                .map(parse_nested)
                .collect::<Result<_>>()?,
        ),
        "and" => Predicate::And(
            expect_array(op, operand)?
                .iter()
                .map(parse_nested)
                .collect::<Result<_>>()?,
        ),
        _ => {
            return Err(SpendwiseError::InvalidInput(format!(
                "Unknown filter operator '{}'",
                op
            )))
        }
    };
    Ok(predicate)
}

fn expect_array(op: &str, operand: &Value) -> Result<Vec<Value>> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        other => Err(SpendwiseError::InvalidInput(format!(
            "'{}' requires an array, got {}",
            op, other
        ))),
    }
}
