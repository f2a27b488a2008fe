use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::model::Record;

/// Comparison operators understood by the datastore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    /// Case-insensitive equality
    #[serde(rename = "~=")]
    ILike,
    /// Case-insensitive substring match
    #[serde(rename = "%=")]
    Contains,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

/// Composable boolean filter sent to the datastore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    FilterOperator {
        field: String,
        operator: Operator,
        value: Value,
    },
    And {
        and_filter: Vec<Filter>,
    },
    Or {
        or_filter: Vec<Filter>,
    },
    Not {
        not_filter: Box<Filter>,
    },
}

impl Filter {
    pub fn op(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Filter::FilterOperator {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::op(field, Operator::Eq, value)
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { and_filter: filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { or_filter: filters }
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not {
            not_filter: Box::new(filter),
        }
    }

    /// `Or` over the given filters with structurally equal members dropped,
    /// keeping the first occurrence
    pub fn or_distinct(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut distinct: Vec<Filter> = Vec::new();
        for filter in filters {
            if !distinct.contains(&filter) {
                distinct.push(filter);
            }
        }
        Filter::or(distinct)
    }

    /// Evaluate the filter against a record
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::FilterOperator {
                field,
                operator,
                value,
            } => compare(record.get(field), *operator, value),
            Filter::And { and_filter } => and_filter.iter().all(|f| f.matches(record)),
            Filter::Or { or_filter } => or_filter.iter().any(|f| f.matches(record)),
            Filter::Not { not_filter } => !not_filter.matches(record),
        }
    }
}

fn compare(actual: Option<&Value>, operator: Operator, expected: &Value) -> bool {
    let actual = actual.unwrap_or(&Value::Null);
    match operator {
        Operator::Eq => actual == expected,
        Operator::Ne => actual != expected,
        Operator::ILike => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.to_lowercase() == e.to_lowercase(),
            _ => actual == expected,
        },
        Operator::Contains => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.to_lowercase().contains(&e.to_lowercase()),
            _ => false,
        },
        Operator::Lt => order(actual, expected) == Some(Ordering::Less),
        Operator::Le => matches!(order(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        Operator::Gt => order(actual, expected) == Some(Ordering::Greater),
        Operator::Ge => matches!(
            order(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn order(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(e)) => a.as_f64()?.partial_cmp(&e.as_f64()?),
        (Value::String(a), Value::String(e)) => Some(a.cmp(e)),
        _ => None,
    }
}
