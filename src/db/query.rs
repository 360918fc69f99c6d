// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Query description, keyset cursors and value ordering.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator for a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// A single `field <op> value` condition. All filters of a query are ANDed.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Whether `doc` satisfies this filter. Missing fields never match.
    pub fn matches(&self, doc: &Value) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        let ord = compare_values(actual, &self.value);
        match self.op {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::LessThan => ord == Ordering::Less,
            FilterOp::LessThanOrEqual => ord != Ordering::Greater,
            FilterOp::GreaterThan => ord == Ordering::Greater,
            FilterOp::GreaterThanOrEqual => ord != Ordering::Less,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One sort key of a query.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// An ordered range query over one collection.
///
/// `start_after` holds the sort-key values of the last row of the previous
/// page, one value per `order_by` entry.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: &'static str,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub start_after: Option<Vec<Value>>,
    pub limit: u32,
}

impl Query {
    pub fn new(collection: &'static str) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: Vec::new(),
            start_after: None,
            limit: 0,
        }
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn start_after(mut self, values: Vec<Value>) -> Self {
        self.start_after = Some(values);
        self
    }

    /// A limit of 0 means unbounded.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sort-key values of `doc`, or `None` if any order field is missing.
    pub fn sort_key(&self, doc: &Value) -> Option<Vec<Value>> {
        self.order_by
            .iter()
            .map(|o| doc.get(&o.field).cloned())
            .collect()
    }

    /// Compare two sort keys under this query's ordering.
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((order, x), y) in self.order_by.iter().zip(a).zip(b) {
            let ord = match order.direction {
                Direction::Ascending => compare_values(x, y),
                Direction::Descending => compare_values(y, x),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Opaque continuation token: the sort key of the last row served.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor(pub Vec<Value>);

#[derive(Debug, thiserror::Error)]
#[error("Invalid cursor")]
pub struct InvalidCursor;

impl Cursor {
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(Value::Array(self.0.clone()).to_string())
    }

    /// Decode a token produced by [`Cursor::encode`] for a query ordered by
    /// `expected_keys` sort keys.
    pub fn decode(raw: &str, expected_keys: usize) -> Result<Self, InvalidCursor> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| InvalidCursor)?;
        match serde_json::from_slice::<Value>(&bytes).map_err(|_| InvalidCursor)? {
            Value::Array(values) if values.len() == expected_keys => Ok(Self(values)),
            _ => Err(InvalidCursor),
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values, following Firestore's cross-type ordering
/// (null < bool < number < string < array < map).
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x.cmp(&y)
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x.cmp(&y)
            } else {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (x, y) in x.iter().zip(y) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(9), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(-1), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
    }

    #[test]
    fn test_cross_type_ordering() {
        assert_eq!(compare_values(&json!(null), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(100), &json!("1")), Ordering::Less);
    }

    #[test]
    fn test_mixed_direction_keys() {
        let query = Query::new("users")
            .order_by("points", Direction::Descending)
            .order_by("id", Direction::Ascending);

        let a = query.sort_key(&json!({"id": "a", "points": 10})).unwrap();
        let b = query.sort_key(&json!({"id": "b", "points": 10})).unwrap();
        let c = query.sort_key(&json!({"id": "c", "points": 20})).unwrap();

        assert_eq!(query.compare_keys(&a, &b), Ordering::Less);
        assert_eq!(query.compare_keys(&c, &a), Ordering::Less);
    }

    #[test]
    fn test_missing_sort_field_yields_no_key() {
        let query = Query::new("users").order_by("points", Direction::Descending);
        assert!(query.sort_key(&json!({"id": "a"})).is_none());
    }

    #[test]
    fn test_filter_missing_field_never_matches() {
        let filter = Filter {
            field: "box".to_string(),
            op: FilterOp::Eq,
            value: json!("CrossFit Norte"),
        };
        assert!(!filter.matches(&json!({"id": "u1"})));
        assert!(filter.matches(&json!({"box": "CrossFit Norte"})));
    }

    #[test]
    fn test_cursor_round_trip() {
        let cursor = Cursor(vec![json!(150), json!("user-7")]);
        let decoded = Cursor::decode(&cursor.encode(), 2).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_rejects_wrong_arity_and_garbage() {
        let cursor = Cursor(vec![json!(150), json!("user-7")]);
        assert!(Cursor::decode(&cursor.encode(), 3).is_err());
        assert!(Cursor::decode("not-base64!!", 2).is_err());
    }
}
