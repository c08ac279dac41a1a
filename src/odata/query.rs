use serde::Serialize;
use serde_json::Value;

use super::error::QueryError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ODataQuery, Page};
use crate::config::QueryConfig;

/// Filter, count, sort and page already-scoped rows.
///
/// `$top` is capped at `limits.max_top`; without `$top` the configured
/// `default_top` (if any) applies.
pub fn apply_query<T: Serialize>(rows: Vec<T>, query: &ODataQuery, limits: &QueryConfig) -> Result<Page<T>, QueryError> {
    let filter = query.filter.as_deref().map(FilterWhere::parse).transpose()?;
    let order = match query.orderby.as_deref() {
        Some(orderby) => FilterOrder::parse(orderby)?,
        None => Vec::new(),
    };

    let mut projected: Vec<(Value, T)> = Vec::with_capacity(rows.len());
    for row in rows {
        // Rows that fail to serialize are skipped
        let Ok(json) = serde_json::to_value(&row) else { continue };
        if filter.as_ref().map_or(true, |node| FilterWhere::matches(node, &json)) {
            projected.push((json, row));
        }
    }

    let count = query.count.unwrap_or(false).then_some(projected.len());
    if !order.is_empty() {
        projected.sort_by(|(a, _), (b, _)| FilterOrder::compare(&order, a, b));
    }

    let top = query.top.or(limits.default_top).unwrap_or(limits.max_top).min(limits.max_top);
    let value = projected
        .into_iter()
        .skip(query.skip.unwrap_or(0))
        .take(top)
        .map(|(_, row)| row)
        .collect();

    Ok(Page { value, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits(max_top: usize) -> QueryConfig {
        QueryConfig { max_top, default_top: None }
    }

    #[test]
    fn filter_order_and_page() {
        let rows: Vec<Value> = (1..=6).map(|n| json!({"n": n, "even": n % 2 == 0})).collect();
        let query = ODataQuery {
            filter: Some("even eq true".to_string()),
            orderby: Some("n desc".to_string()),
            top: Some(1),
            skip: Some(1),
            count: Some(true),
        };
        let page = apply_query(rows, &query, &limits(100)).unwrap();
        assert_eq!(page.count, Some(3));
        assert_eq!(page.value, vec![json!({"n": 4, "even": true})]);
    }

    #[test]
    fn top_is_capped() {
        let rows: Vec<Value> = (0..10).map(|n| json!({"n": n})).collect();
        let query = ODataQuery { top: Some(50), ..Default::default() };
        let page = apply_query(rows, &query, &limits(4)).unwrap();
        assert_eq!(page.value.len(), 4);
        assert_eq!(page.count, None);
    }

    #[test]
    fn count_serializes_as_odata_annotation() {
        let page = Page { value: vec![1, 2], count: Some(2) };
        assert_eq!(serde_json::to_value(&page).unwrap(), json!({"value": [1, 2], "@odata.count": 2}));
    }
}
