//! Structured metadata predicates
//!
//! Same shape as Chroma's `where` clause:
//!
//! ```json
//! {"lang": "en"}
//! {"year": {"$gte": 1990}}
//! {"$and": [{"genre": {"$in": ["fantasy", "sf"]}}, {"lang": {"$ne": "ro"}}]}
//! ```
//!
//! An object with several field keys is an implicit `$and`. Comparisons
//! against a key the record does not have never match.

use crate::types::Metadata;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("filter must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("filter object must not be empty")]
    Empty,

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("'{0}' expects a non-empty list of filters")]
    ExpectedFilterList(String),

    #[error("'{op}' on field '{field}' expects {expected}")]
    BadOperand {
        field: String,
        op: String,
        expected: &'static str,
    },
}

/// Comparison applied to a single metadata field
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Eq(Value),
    Ne(Value),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    In(Vec<Value>),
    Nin(Vec<Value>),
}

/// Parsed metadata predicate
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    And(Vec<MetadataFilter>),
    Or(Vec<MetadataFilter>),
    Field { key: String, cmp: Comparison },
}

impl MetadataFilter {
    /// Parse and validate a JSON predicate
    pub fn parse(value: &Value) -> Result<Self, FilterError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(FilterError::NotAnObject(type_name(other).to_string())),
        };
        if map.is_empty() {
            return Err(FilterError::Empty);
        }

        let mut clauses = Vec::with_capacity(map.len());
        for (key, operand) in map {
            match key.as_str() {
                "$and" => clauses.push(Self::And(parse_list(key, operand)?)),
                "$or" => clauses.push(Self::Or(parse_list(key, operand)?)),
                op if op.starts_with('$') => {
                    return Err(FilterError::UnknownOperator(op.to_string()));
                }
                field => clauses.extend(parse_field(field, operand)?),
            }
        }

        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Self::And(clauses)
        })
    }

    /// Evaluate against one record's metadata
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::And(parts) => parts.iter().all(|p| p.matches(metadata)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(metadata)),
            Self::Field { key, cmp } => match metadata.get(key) {
                Some(actual) => cmp.holds_for(actual),
                None => false,
            },
        }
    }
}

impl Comparison {
    fn holds_for(&self, actual: &Value) -> bool {
        match self {
            Self::Eq(expected) => scalar_eq(actual, expected),
            Self::Ne(expected) => !scalar_eq(actual, expected),
            Self::Gt(bound) => actual.as_f64().is_some_and(|v| v > *bound),
            Self::Gte(bound) => actual.as_f64().is_some_and(|v| v >= *bound),
            Self::Lt(bound) => actual.as_f64().is_some_and(|v| v < *bound),
            Self::Lte(bound) => actual.as_f64().is_some_and(|v| v <= *bound),
            Self::In(allowed) => allowed.iter().any(|v| scalar_eq(actual, v)),
            Self::Nin(excluded) => !excluded.iter().any(|v| scalar_eq(actual, v)),
        }
    }
}

fn parse_list(op: &str, operand: &Value) -> Result<Vec<MetadataFilter>, FilterError> {
    match operand {
        Value::Array(items) if !items.is_empty() => {
            items.iter().map(MetadataFilter::parse).collect()
        }
        _ => Err(FilterError::ExpectedFilterList(op.to_string())),
    }
}

fn parse_field(field: &str, operand: &Value) -> Result<Vec<MetadataFilter>, FilterError> {
    let bad = |op: &str, expected: &'static str| FilterError::BadOperand {
        field: field.to_string(),
        op: op.to_string(),
        expected,
    };

    let ops = match operand {
        v if is_scalar(v) => {
            return Ok(vec![MetadataFilter::Field {
                key: field.to_string(),
                cmp: Comparison::Eq(v.clone()),
            }]);
        }
        Value::Object(ops) if !ops.is_empty() => ops,
        _ => return Err(bad("$eq", "a scalar value or an operator object")),
    };

    ops.iter()
        .map(|(op, value)| {
            let op = op.as_str();
            let cmp = match op {
                "$eq" | "$ne" => {
                    if !is_scalar(value) {
                        return Err(bad(op, "a string, number or boolean"));
                    }
                    if op == "$eq" {
                        Comparison::Eq(value.clone())
                    } else {
                        Comparison::Ne(value.clone())
                    }
                }
                "$gt" | "$gte" | "$lt" | "$lte" => {
                    let bound = value.as_f64().ok_or_else(|| bad(op, "a number"))?;
                    match op {
                        "$gt" => Comparison::Gt(bound),
                        "$gte" => Comparison::Gte(bound),
                        "$lt" => Comparison::Lt(bound),
                        _ => Comparison::Lte(bound),
                    }
                }
                "$in" | "$nin" => {
                    let values = match value {
                        Value::Array(items) if !items.is_empty() && items.iter().all(is_scalar) => {
                            items.clone()
                        }
                        _ => return Err(bad(op, "a non-empty list of scalars")),
                    };
                    if op == "$in" {
                        Comparison::In(values)
                    } else {
                        Comparison::Nin(values)
                    }
                }
                other => return Err(FilterError::UnknownOperator(other.to_string())),
            };
            Ok(MetadataFilter::Field {
                key: field.to_string(),
                cmp,
            })
        })
        .collect()
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Numbers compare by value so `3` equals `3.0`
fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
