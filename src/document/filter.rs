use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::path::{compare_values, get_path, values_equal};

/// Predicate over JSON documents.
///
/// Field comparisons against an array field match when any element matches,
/// so `Eq("tags", id)` finds documents tagged with `id`.
#[derive(Debug, Clone)]
pub enum Filter {
    All,
    Eq(String, Value),
    Ne(String, Value),
    In(String, Vec<Value>),
    Exists(String, bool),
    /// Field missing or explicitly null.
    IsNull(String),
    Regex(String, Regex),
    Gte(String, Value),
    Lte(String, Value),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Filter::Ne(field.to_string(), value.into())
    }

    pub fn is_in<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn exists(field: &str) -> Self {
        Filter::Exists(field.to_string(), true)
    }

    pub fn is_null(field: &str) -> Self {
        Filter::IsNull(field.to_string())
    }

    /// Case-insensitive substring match; the needle is matched literally.
    pub fn contains(field: &str, needle: &str) -> Self {
        match RegexBuilder::new(&regex::escape(needle))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => Filter::Regex(field.to_string(), pattern),
            Err(_) => Filter::Eq(field.to_string(), Value::String(needle.to_string())),
        }
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Lte(field.to_string(), value.into())
    }

    /// Conjunction that drops `All` members and collapses trivial cases.
    pub fn and(filters: Vec<Filter>) -> Self {
        let mut filters: Vec<Filter> = filters
            .into_iter()
            .filter(|f| !matches!(f, Filter::All))
            .collect();
        match filters.len() {
            0 => Filter::All,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => any_value(get_path(doc, field), |v| values_equal(v, expected)),
            Filter::Ne(field, expected) => !any_value(get_path(doc, field), |v| values_equal(v, expected)),
            Filter::In(field, candidates) => any_value(get_path(doc, field), |v| {
                candidates.iter().any(|c| values_equal(v, c))
            }),
            Filter::Exists(field, should_exist) => get_path(doc, field).is_some() == *should_exist,
            Filter::IsNull(field) => matches!(get_path(doc, field), None | Some(Value::Null)),
            Filter::Regex(field, pattern) => any_value(get_path(doc, field), |v| match v {
                Value::String(s) => pattern.is_match(s),
                _ => false,
            }),
            Filter::Gte(field, bound) => any_value(get_path(doc, field), |v| {
                same_kind(v, bound) && compare_values(Some(v), Some(bound)) != Ordering::Less
            }),
            Filter::Lte(field, bound) => any_value(get_path(doc, field), |v| {
                same_kind(v, bound) && compare_values(Some(v), Some(bound)) != Ordering::Greater
            }),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn any_value(value: Option<&Value>, mut predicate: impl FnMut(&Value) -> bool) -> bool {
    match value {
        None => false,
        Some(v) => match v {
            Value::Array(items) => items.iter().any(&mut predicate) || predicate(v),
            _ => predicate(v),
        },
    }
}
