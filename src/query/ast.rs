use crate::value::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    Between,
    In,
    NotIn,
}

impl Operator {
    pub fn is_numeric(self) -> bool {
        matches!(self, Operator::GreaterThan | Operator::LessThan | Operator::Between)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Value>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl FilterRule {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            min_value: None,
            max_value: None,
            case_sensitive: false,
            enabled: true,
        }
    }

    pub fn between(column: impl Into<String>, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            min_value: Some(min.into()),
            max_value: Some(max.into()),
            ..Self::new(column, Operator::Between, Value::Null)
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortRule {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
    /// Lower priority sorts first (most significant key).
    #[serde(default)]
    pub priority: i32,
}

impl SortRule {
    pub fn new(column: impl Into<String>, direction: SortDirection, priority: i32) -> Self {
        Self {
            column: column.into(),
            direction,
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeFilter {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// A saved filter/sort configuration, as used by export previews, import
/// previews and the report builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRangeFilter>,
    #[serde(default)]
    pub sort: Vec<SortRule>,
}
