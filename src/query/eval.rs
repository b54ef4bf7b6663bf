use super::ast::{DateRangeFilter, FilterRule, Operator};
use crate::value::{lookup_present, Record, Value};

/// Returns the records accepted by every enabled rule and by the date range,
/// in their original order. Never fails: values that cannot be coerced simply
/// do not match.
pub fn apply_filters(
    records: &[Record],
    filters: &[FilterRule],
    date_range: Option<&DateRangeFilter>,
) -> Vec<Record> {
    records
        .iter()
        .filter(|record| matches_all(record, filters, date_range))
        .cloned()
        .collect()
}

pub fn matches_all(
    record: &Record,
    filters: &[FilterRule],
    date_range: Option<&DateRangeFilter>,
) -> bool {
    filters.iter().all(|rule| matches_rule(record, rule))
        && date_range.map_or(true, |range| matches_date_range(record, range))
}

pub fn matches_rule(record: &Record, rule: &FilterRule) -> bool {
    if !rule.enabled {
        return true;
    }

    if rule.operator == Operator::Between && !has_both_bounds(rule) {
        return true;
    }

    let Some(field) = lookup_present(record, &rule.column) else {
        return false;
    };

    if rule.operator.is_numeric() {
        eval_numeric(field, rule).unwrap_or(false)
    } else {
        eval_text(field, rule).unwrap_or(false)
    }
}

fn has_both_bounds(rule: &FilterRule) -> bool {
    let present = |v: &Option<Value>| v.as_ref().is_some_and(|v| !v.is_null());
    present(&rule.min_value) && present(&rule.max_value)
}

fn normalize(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

fn rule_tokens(rule: &FilterRule) -> Vec<String> {
    match &rule.value {
        Value::List(items) => items
            .iter()
            .filter_map(Value::as_text)
            .map(|t| normalize(t.trim(), rule.case_sensitive))
            .collect(),
        other => other
            .as_text()
            .unwrap_or_default()
            .split(',')
            .map(|t| normalize(t.trim(), rule.case_sensitive))
            .collect(),
    }
}

fn eval_text(field: &Value, rule: &FilterRule) -> Option<bool> {
    let actual = normalize(&field.as_text()?, rule.case_sensitive);

    if matches!(rule.operator, Operator::In | Operator::NotIn) {
        let found = rule_tokens(rule).iter().any(|t| *t == actual);
        return Some(found == (rule.operator == Operator::In));
    }

    let expected = normalize(&rule.value.as_text().unwrap_or_default(), rule.case_sensitive);

    Some(match rule.operator {
        Operator::Equals => actual == expected,
        Operator::Contains => actual.contains(&expected),
        Operator::StartsWith => actual.starts_with(&expected),
        Operator::EndsWith => actual.ends_with(&expected),
        _ => return None,
    })
}

fn eval_numeric(field: &Value, rule: &FilterRule) -> Option<bool> {
    let actual = field.as_number()?;

    Some(match rule.operator {
        Operator::GreaterThan => actual > rule.value.as_number()?,
        Operator::LessThan => actual < rule.value.as_number()?,
        Operator::Between => {
            let min = rule.min_value.as_ref()?.as_number()?;
            let max = rule.max_value.as_ref()?.as_number()?;
            min <= actual && actual <= max
        }
        _ => return None,
    })
}

pub fn matches_date_range(record: &Record, range: &DateRangeFilter) -> bool {
    if !range.enabled {
        return true;
    }

    let Some(date) = lookup_present(record, &range.column).and_then(Value::as_date) else {
        return false;
    };

    range.start_date.map_or(true, |start| date >= start)
        && range.end_date.map_or(true, |end| date <= end)
}
