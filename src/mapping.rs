use crate::schema::ColumnDef;
use crate::value::{Record, Value};
use indexmap::IndexMap;

/// File header to system field key.
pub type ColumnMapping = IndexMap<String, String>;

/// Proposes a mapping for each file header. The first schema column whose
/// lower-cased key or label occurs inside the lower-cased header wins. When
/// nothing matches that way, a header that abbreviates a key or label
/// (`Dept` for `Department`) is accepted. Headers with no match stay
/// unmapped.
pub fn suggest_mapping(headers: &[String], columns: &[ColumnDef]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();

    for header in headers {
        let lowered = header.trim().to_lowercase();
        if lowered.is_empty() {
            continue;
        }

        let found = columns
            .iter()
            .find(|c| {
                lowered.contains(&c.key.to_lowercase()) || lowered.contains(&c.label.to_lowercase())
            })
            .or_else(|| {
                columns
                    .iter()
                    .find(|c| abbreviates(&lowered, c.key) || abbreviates(&lowered, c.label))
            });

        if let Some(column) = found {
            mapping.insert(header.clone(), column.key.to_string());
        }
    }

    mapping
}

fn compact(s: &str) -> Vec<char> {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `short` starts like `long` and its remaining characters appear in `long`
/// in order.
fn abbreviates(short: &str, long: &str) -> bool {
    let short = compact(short);
    let long = compact(long);
    if short.len() < 2 || short.len() >= long.len() || short[0] != long[0] {
        return false;
    }

    let mut rest = long.iter();
    short.iter().all(|c| rest.any(|l| l == c))
}

/// Builds records keyed by system field. Unmapped headers are dropped and
/// blank cells become null.
pub fn apply_mapping(headers: &[String], rows: &[Vec<String>], mapping: &ColumnMapping) -> Vec<Record> {
    let targets: Vec<Option<&String>> = headers.iter().map(|h| mapping.get(h)).collect();

    rows.iter()
        .map(|row| {
            let mut record = Record::new();
            for (idx, target) in targets.iter().enumerate() {
                let Some(field) = target else {
                    continue;
                };
                let cell = row.get(idx).map(String::as_str).unwrap_or("");
                record.insert((*field).clone(), Value::from_cell(cell));
            }
            record
        })
        .collect()
}

pub fn unmapped_required<'a>(mapping: &ColumnMapping, columns: &'a [ColumnDef]) -> Vec<&'a ColumnDef> {
    columns
        .iter()
        .filter(|c| c.required && !mapping.values().any(|v| v == c.key))
        .collect()
}
