use crate::error::LoadError;
use crate::value::{Record, Value};
use indexmap::IndexSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Raw rows as read from a file, before any column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn load_records(path: &Path) -> Result<Vec<Record>, LoadError> {
    let ext = extension(path);
    if !matches!(ext.as_str(), "json" | "yaml" | "yml" | "csv") {
        return Err(LoadError::UnsupportedFormat(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match ext.as_str() {
        "csv" => {
            let table = read_csv_table(content.as_bytes()).map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            table_to_records(&table)
        }
        "json" => {
            let doc: serde_json::Value =
                serde_json::from_str(&content).map_err(|source| LoadError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            records_from_document(doc, path)?
        }
        _ => {
            let doc: serde_json::Value =
                serde_yaml::from_str(&content).map_err(|source| LoadError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?;
            records_from_document(doc, path)?
        }
    };

    debug!(path = %path.display(), count = records.len(), "Loaded records");
    Ok(records)
}

/// Accepts a bare list of objects or an API envelope with a `data` list.
fn records_from_document(doc: serde_json::Value, path: &Path) -> Result<Vec<Record>, LoadError> {
    let list = match doc {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(data @ serde_json::Value::Array(_)) => data,
            _ => return Err(LoadError::NotRecords(path.to_path_buf())),
        },
        _ => return Err(LoadError::NotRecords(path.to_path_buf())),
    };

    serde_json::from_value(list).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_csv_table<R: Read>(reader: R) -> Result<Table, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

pub fn table_to_records(table: &Table) -> Vec<Record> {
    table
        .rows
        .iter()
        .map(|row| {
            table
                .headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let cell = row.get(idx).map(String::as_str).unwrap_or("");
                    (header.clone(), Value::from_cell(cell))
                })
                .collect()
        })
        .collect()
}

/// Flattens records back into rows. Headers are the union of keys in
/// first-seen order.
pub fn records_to_table(records: &[Record]) -> Table {
    let headers: IndexSet<&String> = records.iter().flat_map(|r| r.keys()).collect();
    let headers: Vec<String> = headers.into_iter().cloned().collect();

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| record.get(h).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    Table { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_csv_table_keeps_ragged_rows() {
        let table = read_csv_table("Name, Dept\nAlice,IT\nBob\n".as_bytes()).unwrap();
        assert_eq!(table.headers, ["Name", "Dept"]);
        assert_eq!(table.rows[1], ["Bob"]);
    }

    #[test]
    fn test_load_csv_records() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "hw.csv", "assetTag,cost\nHW-001,1200\nHW-002,\n");
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["cost"].as_number(), Some(1200.0));
        assert!(records[1]["cost"].is_null());
    }

    #[test]
    fn test_load_json_envelope_and_list() {
        let dir = TempDir::new().unwrap();
        let list = write(&dir, "a.json", r#"[{"name": "Alice"}]"#);
        let envelope = write(&dir, "b.JSON", r#"{"success": true, "data": [{"name": "Bob"}]}"#);
        assert_eq!(load_records(&list).unwrap()[0]["name"], Value::from("Alice"));
        assert_eq!(load_records(&envelope).unwrap()[0]["name"], Value::from("Bob"));

        let scalar = write(&dir, "c.json", r#"{"success": true}"#);
        assert!(matches!(load_records(&scalar), Err(LoadError::NotRecords(_))));
    }

    #[test]
    fn test_load_yaml_records() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "e.yaml", "- name: Carol\n  age: 25\n");
        let records = load_records(&path).unwrap();
        assert_eq!(records[0]["age"], Value::Number(25.0));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "book.xlsx", "");
        assert!(matches!(load_records(&path), Err(LoadError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_records_to_table_union_headers() {
        let records: Vec<Record> =
            serde_json::from_str(r#"[{"a": 1}, {"b": "x", "a": 2}]"#).unwrap();
        let table = records_to_table(&records);
        assert_eq!(table.headers, ["a", "b"]);
        assert_eq!(table.rows[0], ["1", ""]);
        assert_eq!(table.rows[1], ["2", "x"]);
    }
}
