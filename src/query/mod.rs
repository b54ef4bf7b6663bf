pub mod ast;
pub mod eval;
pub mod parser;
pub mod sort;

pub use ast::{DateRangeFilter, FilterRule, Operator, RuleSet, SortDirection, SortRule};
pub use eval::apply_filters;
pub use parser::{parse, parse_date_range, parse_sort};
pub use sort::apply_sort;

use crate::value::Record;

/// Filters, then sorts. This is the preview pipeline shared by export,
/// import and reports.
pub fn run(records: &[Record], rules: &RuleSet) -> Vec<Record> {
    let filtered = apply_filters(records, &rules.filters, rules.date_range.as_ref());
    apply_sort(&filtered, &rules.sort)
}
