use crate::value::{lookup_present, Record, Value};
use indexmap::{IndexMap, IndexSet};

pub const DEFAULT_UNIQUE_LIMIT: usize = 100;

/// Distinct non-null values per column in first-seen order, capped at
/// `limit` per column. Used for autocomplete suggestions.
pub fn compute_unique_values(
    records: &[Record],
    columns: &[String],
    limit: usize,
) -> IndexMap<String, Vec<Value>> {
    columns
        .iter()
        .map(|column| (column.clone(), unique_for_column(records, column, limit)))
        .collect()
}

fn unique_for_column(records: &[Record], column: &str, limit: usize) -> Vec<Value> {
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut values = Vec::new();

    for record in records {
        if values.len() >= limit {
            break;
        }
        let Some(value) = lookup_present(record, column) else {
            continue;
        };
        let Some(key) = value.as_text() else {
            continue;
        };
        if seen.insert(key) {
            values.push(value.clone());
        }
    }

    values
}

/// Occurrences per value in first-seen order. List items count
/// individually; empty text and nested objects are skipped.
pub fn count_values(records: &[Record], column: &str) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();

    let items = records
        .iter()
        .filter_map(|record| lookup_present(record, column))
        .flat_map(|value| match value {
            Value::List(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        });

    for value in items {
        if matches!(value, Value::List(_) | Value::Object(_)) {
            continue;
        }
        if let Some(key) = value.as_text().filter(|t| !t.is_empty()) {
            *counts.entry(key).or_default() += 1;
        }
    }

    counts
}

/// `value: count` lines, most frequent first. Equal counts keep
/// first-seen order.
pub fn format_counts(counts: &IndexMap<String, usize>) -> Vec<String> {
    let mut items: Vec<(&String, &usize)> = counts.iter().collect();
    items.sort_by(|a, b| b.1.cmp(a.1));
    items
        .into_iter()
        .map(|(value, count)| format!("{}: {}", value, count))
        .collect()
}
