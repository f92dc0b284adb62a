//! Order-by column selection for the cluster strategy

use colord_common::{ColordError, Result};
use std::collections::HashMap;

/// Always preferred as the ordering key when a query reads it.
pub const PREFERRED_ORDER_BY_COLUMN: &str = "market";

/// Pick the column a cluster job sorts on.
///
/// `market` wins whenever it is requested. Otherwise the requested column
/// with the smallest average chunk size is chosen; on equal sizes the first
/// one requested is kept. `sizes` is keyed by lower-cased column name and the
/// returned name is lower-cased as well.
pub fn select_order_by_column<S: AsRef<str>>(
    requested: &[S],
    sizes: &HashMap<String, f64>,
) -> Result<String> {
    if requested
        .iter()
        .any(|name| name.as_ref().eq_ignore_ascii_case(PREFERRED_ORDER_BY_COLUMN))
    {
        return Ok(PREFERRED_ORDER_BY_COLUMN.to_string());
    }

    let mut best: Option<(String, f64)> = None;
    for name in requested {
        let key = name.as_ref().to_lowercase();
        let Some(&size) = sizes.get(&key) else {
            tracing::warn!("Column {} has no size statistics, skipped", name.as_ref());
            continue;
        };
        match &best {
            Some((_, smallest)) if size >= *smallest => {}
            _ => best = Some((key, size)),
        }
    }

    best.map(|(name, _)| name).ok_or_else(|| {
        if requested.is_empty() {
            ColordError::OrderBy("query requests no columns".to_string())
        } else {
            ColordError::OrderBy(format!(
                "none of the requested columns [{}] has size statistics",
                requested
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(",")
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_market_overrides_size() {
        let map = sizes(&[("market", 1e9), ("a", 1.0), ("b", 2.0)]);
        assert_eq!(select_order_by_column(&["market", "a", "b"], &map).unwrap(), "market");
        // even without statistics, and in any case
        assert_eq!(select_order_by_column(&["a", "MARKET"], &HashMap::new()).unwrap(), "market");
    }

    #[test]
    fn test_smallest_column_wins() {
        let map = sizes(&[("a", 300.0), ("b", 100.0), ("c", 200.0)]);
        assert_eq!(select_order_by_column(&["a", "b", "c"], &map).unwrap(), "b");
    }

    #[test]
    fn test_tie_keeps_first_requested() {
        let map = sizes(&[("a", 100.0), ("b", 100.0)]);
        assert_eq!(select_order_by_column(&["a", "b"], &map).unwrap(), "a");
        assert_eq!(select_order_by_column(&["b", "a"], &map).unwrap(), "b");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let map = sizes(&[("price", 10.0), ("quantity", 5.0)]);
        assert_eq!(
            select_order_by_column(&["Price", "QUANTITY"], &map).unwrap(),
            "quantity"
        );
    }

    #[test]
    fn test_unknown_columns_are_skipped() {
        let map = sizes(&[("b", 100.0)]);
        assert_eq!(select_order_by_column(&["zzz", "b"], &map).unwrap(), "b");
    }

    #[test]
    fn test_no_candidate_is_an_error() {
        let map = sizes(&[("a", 1.0)]);
        let empty: [&str; 0] = [];
        assert!(matches!(
            select_order_by_column(&empty, &map),
            Err(ColordError::OrderBy(_))
        ));
        assert!(matches!(
            select_order_by_column(&["x", "y"], &map),
            Err(ColordError::OrderBy(_))
        ));
    }
}
