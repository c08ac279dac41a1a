use serde_json::Value;
use std::cmp::Ordering;

use super::error::QueryError;
use super::filter_where::{compare_values, lookup};
use super::types::{OrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `$orderby`, e.g. `name desc, createdOn`
    pub fn parse(orderby: &str) -> Result<Vec<OrderInfo>, QueryError> {
        let mut out = Vec::new();
        for part in orderby.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }

            let mut it = trimmed.split_whitespace();
            let field = it.next().unwrap_or_default();
            if !field.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '/') {
                return Err(QueryError::InvalidOrderBy(trimmed.to_string()));
            }
            let sort = match it.next() {
                None => SortDirection::Asc,
                Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                Some(_) => return Err(QueryError::InvalidOrderBy(trimmed.to_string())),
            };
            if it.next().is_some() {
                return Err(QueryError::InvalidOrderBy(trimmed.to_string()));
            }
            out.push(OrderInfo { field: field.split('/').map(str::to_string).collect(), sort });
        }
        Ok(out)
    }

    /// Compare two rows by each order key in turn
    pub fn compare(infos: &[OrderInfo], a: &Value, b: &Value) -> Ordering {
        for info in infos {
            let ordering = total_order(lookup(a, &info.field), lookup(b, &info.field));
            let ordering = match info.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// Nulls first, then by JSON type, then by value
fn total_order(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    compare_values(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}
