use super::ast::{SortDirection, SortRule};
use crate::value::{lookup_present, Record, Value};
use std::cmp::Ordering;

/// Multi-key stable sort. Rules are applied most significant first in
/// ascending `priority`; rules sharing a priority keep their declared order.
pub fn apply_sort(records: &[Record], rules: &[SortRule]) -> Vec<Record> {
    let mut out = records.to_vec();
    if rules.is_empty() {
        return out;
    }

    let mut keys: Vec<&SortRule> = rules.iter().collect();
    keys.sort_by_key(|rule| rule.priority);

    out.sort_by(|a, b| compare_records(a, b, &keys));
    out
}

fn compare_records(a: &Record, b: &Record, keys: &[&SortRule]) -> Ordering {
    for rule in keys {
        let ord = compare_keys(
            lookup_present(a, &rule.column),
            lookup_present(b, &rule.column),
            rule.direction,
        );
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Absent values go last whatever the direction.
fn compare_keys(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| sortable(v));
    let b = b.filter(|v| sortable(v));

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(a, b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

fn sortable(v: &Value) -> bool {
    match v {
        Value::Number(n) => !n.is_nan(),
        Value::Object(_) => false,
        _ => true,
    }
}

/// Numbers (including numeric text) come before other text, so mixed
/// columns still get a total order.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            let x = a.as_text().unwrap_or_default().to_lowercase();
            let y = b.as_text().unwrap_or_default().to_lowercase();
            x.cmp(&y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{FilterRule, Operator};
    use crate::query::eval::apply_filters;
    use crate::value::record;

    fn people() -> Vec<Record> {
        vec![
            record(&[("name", "Alice".into()), ("age", 30.into()), ("dept", "IT".into())]),
            record(&[("name", "bob".into()), ("age", 25.into()), ("dept", "HR".into())]),
            record(&[("name", "Carol".into()), ("age", 25.into()), ("dept", "IT".into())]),
        ]
    }

    fn names(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r["name"].to_string()).collect()
    }

    #[test]
    fn test_filter_then_sort_by_age() {
        let filtered = apply_filters(
            &people(),
            &[FilterRule::new("age", Operator::GreaterThan, 24)],
            None,
        );
        let sorted = apply_sort(&filtered, &[SortRule::new("age", SortDirection::Asc, 1)]);
        assert_eq!(names(&sorted), ["bob", "Carol", "Alice"]);
    }

    #[test]
    fn test_desc_keeps_ties_stable() {
        let sorted = apply_sort(&people(), &[SortRule::new("age", SortDirection::Desc, 1)]);
        assert_eq!(names(&sorted), ["Alice", "bob", "Carol"]);
    }

    #[test]
    fn test_strings_case_insensitive() {
        let sorted = apply_sort(&people(), &[SortRule::new("name", SortDirection::Desc, 1)]);
        assert_eq!(names(&sorted), ["Carol", "bob", "Alice"]);
    }

    #[test]
    fn test_priority_orders_keys() {
        let rules = [
            SortRule::new("name", SortDirection::Desc, 2),
            SortRule::new("dept", SortDirection::Asc, 1),
        ];
        let sorted = apply_sort(&people(), &rules);
        assert_eq!(names(&sorted), ["bob", "Carol", "Alice"]);
    }

    #[test]
    fn test_missing_values_last_both_directions() {
        let records = vec![
            record(&[("name", "a".into())]),
            record(&[("name", "b".into()), ("cost", 5.into())]),
            record(&[("name", "c".into()), ("cost", Value::Null)]),
            record(&[("name", "d".into()), ("cost", 1.into())]),
        ];
        let asc = apply_sort(&records, &[SortRule::new("cost", SortDirection::Asc, 0)]);
        assert_eq!(names(&asc), ["d", "b", "a", "c"]);
        let desc = apply_sort(&records, &[SortRule::new("cost", SortDirection::Desc, 0)]);
        assert_eq!(names(&desc), ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_numeric_strings_sort_numerically() {
        let records = vec![
            record(&[("name", "x".into()), ("qty", "100".into())]),
            record(&[("name", "y".into()), ("qty", "9".into())]),
        ];
        let sorted = apply_sort(&records, &[SortRule::new("qty", SortDirection::Asc, 0)]);
        assert_eq!(names(&sorted), ["y", "x"]);
    }

    #[test]
    fn test_mixed_column_numbers_before_text() {
        let records: Vec<Record> = ["10", "9", "1a"]
            .iter()
            .cycle()
            .take(33)
            .enumerate()
            .map(|(i, qty)| record(&[("name", i.to_string().into()), ("qty", (*qty).into())]))
            .collect();

        let asc = apply_sort(&records, &[SortRule::new("qty", SortDirection::Asc, 0)]);
        let qtys: Vec<String> = asc.iter().map(|r| r["qty"].to_string()).collect();
        assert_eq!(&qtys[..11], vec!["9"; 11].as_slice());
        assert_eq!(&qtys[11..22], vec!["10"; 11].as_slice());
        assert_eq!(&qtys[22..], vec!["1a"; 11].as_slice());
        assert_eq!(asc[0]["name"].to_string(), "1");
        assert_eq!(asc[1]["name"].to_string(), "4");

        let desc = apply_sort(&records, &[SortRule::new("qty", SortDirection::Desc, 0)]);
        assert_eq!(desc[0]["qty"].to_string(), "1a");
        assert_eq!(desc[32]["qty"].to_string(), "9");
    }

    #[test]
    fn test_numbers_and_numeric_text_interleave_missing_last() {
        let records = vec![
            record(&[("name", "a".into()), ("price", "n/a".into())]),
            record(&[("name", "b".into()), ("price", 12.into())]),
            record(&[("name", "c".into())]),
            record(&[("name", "d".into()), ("price", "3.5".into())]),
            record(&[("name", "e".into()), ("price", "N/A".into())]),
            record(&[("name", "f".into()), ("price", 100.into())]),
        ];
        let asc = apply_sort(&records, &[SortRule::new("price", SortDirection::Asc, 0)]);
        assert_eq!(names(&asc), ["d", "b", "f", "a", "e", "c"]);
        let desc = apply_sort(&records, &[SortRule::new("price", SortDirection::Desc, 0)]);
        assert_eq!(names(&desc), ["a", "e", "f", "b", "d", "c"]);
    }

    #[test]
    fn test_no_rules_returns_copy() {
        assert_eq!(apply_sort(&people(), &[]), people());
    }
}
