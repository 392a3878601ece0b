//! Tagged filter expressions over feature attributes.
//!
//! Filters are parsed once from Mapbox-style JSON arrays and evaluated by an
//! explicit interpreter:
//! - Comparison: `==`, `!=`, `<`, `<=`, `>`, `>=`
//! - Membership: `has`, `!has`, `in`, `!in`
//! - Logic: `all`, `any`, `none`, `!`
//!
//! Keys may be written bare (`"type"`) or as a `["get", "type"]` lookup.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::style::types::Properties;

/// Comparison operator of a [`FilterExpr::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            _ => return None,
        })
    }
}

/// Predicate over a feature's attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum FilterExpr {
    Literal(bool),
    Compare {
        op: CompareOp,
        key: String,
        value: Value,
    },
    Has(String),
    NotHas(String),
    In {
        key: String,
        values: Vec<Value>,
    },
    NotIn {
        key: String,
        values: Vec<Value>,
    },
    All(Vec<FilterExpr>),
    Any(Vec<FilterExpr>),
    None(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl Default for FilterExpr {
    fn default() -> Self {
        FilterExpr::Literal(true)
    }
}

impl From<bool> for FilterExpr {
    fn from(b: bool) -> Self {
        FilterExpr::Literal(b)
    }
}

impl FilterExpr {
    pub fn eq(key: &str, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, key, value)
    }

    pub fn ne(key: &str, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Ne, key, value)
    }

    pub fn compare(op: CompareOp, key: &str, value: impl Into<Value>) -> Self {
        FilterExpr::Compare {
            op,
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// Evaluate filter against a feature's properties.
    pub fn evaluate(&self, props: &Properties) -> bool {
        match self {
            FilterExpr::Literal(b) => *b,
            FilterExpr::Compare { op, key, value } => match props.get(key) {
                Some(actual) => compare(*op, actual, value),
                // A missing attribute only satisfies `!=`
                None => *op == CompareOp::Ne,
            },
            FilterExpr::Has(key) => props.contains_key(key),
            FilterExpr::NotHas(key) => !props.contains_key(key),
            FilterExpr::In { key, values } => props
                .get(key)
                .map(|v| values.iter().any(|candidate| values_equal(v, candidate)))
                .unwrap_or(false),
            FilterExpr::NotIn { key, values } => props
                .get(key)
                .map(|v| !values.iter().any(|candidate| values_equal(v, candidate)))
                .unwrap_or(true),
            FilterExpr::All(subs) => subs.iter().all(|f| f.evaluate(props)),
            FilterExpr::Any(subs) => subs.iter().any(|f| f.evaluate(props)),
            FilterExpr::None(subs) => !subs.iter().any(|f| f.evaluate(props)),
            FilterExpr::Not(sub) => !sub.evaluate(props),
        }
    }

    /// Parse a Mapbox-style filter array.
    pub fn parse(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(FilterExpr::Literal(*b)),
            Value::Null => Ok(FilterExpr::Literal(true)),
            Value::Array(arr) => parse_array(arr),
            other => Err(format!("filter must be an array or boolean, got {other}")),
        }
    }

    /// Serialize back to the Mapbox-style array form.
    pub fn to_json(&self) -> Value {
        match self {
            FilterExpr::Literal(b) => Value::Bool(*b),
            FilterExpr::Compare { op, key, value } => {
                Value::Array(vec![op.symbol().into(), key.as_str().into(), value.clone()])
            }
            FilterExpr::Has(key) => Value::Array(vec!["has".into(), key.as_str().into()]),
            FilterExpr::NotHas(key) => Value::Array(vec!["!has".into(), key.as_str().into()]),
            FilterExpr::In { key, values } => membership_json("in", key, values),
            FilterExpr::NotIn { key, values } => membership_json("!in", key, values),
            FilterExpr::All(subs) => combinator_json("all", subs),
            FilterExpr::Any(subs) => combinator_json("any", subs),
            FilterExpr::None(subs) => combinator_json("none", subs),
            FilterExpr::Not(sub) => Value::Array(vec!["!".into(), sub.to_json()]),
        }
    }
}

impl TryFrom<Value> for FilterExpr {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        FilterExpr::parse(&value)
    }
}

impl From<FilterExpr> for Value {
    fn from(filter: FilterExpr) -> Self {
        filter.to_json()
    }
}

fn parse_array(arr: &[Value]) -> Result<FilterExpr, String> {
    let Some(first) = arr.first() else {
        return Ok(FilterExpr::Literal(true));
    };
    let op = first
        .as_str()
        .ok_or_else(|| format!("filter operator must be a string, got {first}"))?;

    if let Some(cmp) = CompareOp::parse(op) {
        if arr.len() != 3 {
            return Err(format!("'{op}' expects 2 operands, got {}", arr.len() - 1));
        }
        return Ok(FilterExpr::Compare {
            op: cmp,
            key: parse_key(&arr[1])?,
            value: arr[2].clone(),
        });
    }

    match op {
        "has" | "!has" => {
            if arr.len() != 2 {
                return Err(format!("'{op}' expects 1 operand, got {}", arr.len() - 1));
            }
            let key = parse_key(&arr[1])?;
            Ok(if op == "has" {
                FilterExpr::Has(key)
            } else {
                FilterExpr::NotHas(key)
            })
        }
        "in" | "!in" => {
            if arr.len() < 2 {
                return Err(format!("'{op}' expects a key"));
            }
            let key = parse_key(&arr[1])?;
            // ["in", key, v1, v2] and ["in", key, ["literal", [v1, v2]]]
            let literal = match arr.get(2) {
                Some(Value::Array(inner)) if arr.len() == 3 => {
                    Some(inner).filter(|i| i.first() == Some(&Value::from("literal")))
                }
                _ => None,
            };
            let values = match literal {
                Some(inner) => inner
                    .get(1)
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| "'literal' expects an array".to_string())?,
                None => arr[2..].to_vec(),
            };
            Ok(if op == "in" {
                FilterExpr::In { key, values }
            } else {
                FilterExpr::NotIn { key, values }
            })
        }
        "all" | "any" | "none" => {
            let subs = arr[1..]
                .iter()
                .map(FilterExpr::parse)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match op {
                "all" => FilterExpr::All(subs),
                "any" => FilterExpr::Any(subs),
                _ => FilterExpr::None(subs),
            })
        }
        "!" | "not" => {
            if arr.len() != 2 {
                return Err(format!("'{op}' expects 1 operand, got {}", arr.len() - 1));
            }
            Ok(FilterExpr::Not(Box::new(FilterExpr::parse(&arr[1])?)))
        }
        other => Err(format!("unsupported filter operator '{other}'")),
    }
}

fn parse_key(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(get) if get.len() == 2 && get[0] == "get" => get[1]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "'get' expects a string key".to_string()),
        other => Err(format!("filter key must be a string or [\"get\", key], got {other}")),
    }
}

fn membership_json(op: &str, key: &str, values: &[Value]) -> Value {
    let mut out = vec![Value::from(op), Value::from(key)];
    out.extend(values.iter().cloned());
    Value::Array(out)
}

fn combinator_json(op: &str, subs: &[FilterExpr]) -> Value {
    let mut out = vec![Value::from(op)];
    out.extend(subs.iter().map(FilterExpr::to_json));
    Value::Array(out)
}

fn compare(op: CompareOp, actual: &Value, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !values_equal(actual, expected),
        _ => match order(actual, expected) {
            Some(ordering) => match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                CompareOp::Eq | CompareOp::Ne => unreachable!(),
            },
            None => false,
        },
    }
}

// Ordering is only defined between two numbers or two strings.
fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}
