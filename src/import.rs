//! Import preview: file checks, analysis of the parsed rows and per-row
//! validation once a column mapping has been chosen.

use crate::error::{ImportError, LoadError};
use crate::loader::{self, extension, Table};
use crate::mapping::{apply_mapping, suggest_mapping, unmapped_required, ColumnMapping};
use crate::schema::Schema;
use crate::validation::validate_record;
use crate::value::Record;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;
pub const SAMPLE_ROWS: usize = 5;
pub const IMPORT_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl Issue {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            row: None,
            column: None,
        }
    }

    fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    fn at_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub headers: Vec<String>,
    pub sample_data: Vec<Vec<String>>,
    pub estimated_rows: usize,
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub suggested_mapping: ColumnMapping,
}

impl FileAnalysis {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

pub fn check_file(path: &Path) -> Result<FileKind, ImportError> {
    let ext = extension(path);
    let kind = match ext.as_str() {
        "csv" => FileKind::Csv,
        "xlsx" | "xls" => FileKind::Excel,
        "json" => FileKind::Json,
        _ => return Err(ImportError::UnsupportedExtension(ext)),
    };

    let size = fs::metadata(path)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size > MAX_IMPORT_BYTES {
        return Err(ImportError::TooLarge {
            size,
            limit: MAX_IMPORT_BYTES,
        });
    }

    Ok(kind)
}

pub fn read_table(path: &Path) -> Result<Table, ImportError> {
    match check_file(path)? {
        FileKind::Csv => {
            let file = fs::File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            loader::read_csv_table(file).map_err(|source| {
                LoadError::Csv {
                    path: path.to_path_buf(),
                    source,
                }
                .into()
            })
        }
        FileKind::Json => Ok(loader::records_to_table(&loader::load_records(path)?)),
        FileKind::Excel => Err(ImportError::UnsupportedFormat("Excel")),
    }
}

pub fn analyze_file(path: &Path, schema: Option<&Schema>) -> Result<FileAnalysis, ImportError> {
    let table = read_table(path)?;
    let analysis = analyze(&table, schema);
    info!(
        path = %path.display(),
        rows = analysis.estimated_rows,
        issues = analysis.issues.len(),
        "Analyzed import file"
    );
    Ok(analysis)
}

pub fn analyze(table: &Table, schema: Option<&Schema>) -> FileAnalysis {
    let mut issues = Vec::new();
    let width = table.headers.len();

    if table.headers.is_empty() || table.headers.iter().all(|h| h.is_empty()) {
        issues.push(Issue::new(Severity::Error, "File has no header row"));
    }
    if table.rows.is_empty() {
        issues.push(Issue::new(Severity::Error, "File has no data rows"));
    }

    let mut seen: IndexMap<&str, usize> = IndexMap::new();
    for (idx, header) in table.headers.iter().enumerate() {
        if header.is_empty() {
            issues.push(
                Issue::new(Severity::Warning, format!("Column {} has no header", idx + 1))
                    .at_column((idx + 1).to_string()),
            );
            continue;
        }
        *seen.entry(header.as_str()).or_default() += 1;
    }
    for (header, count) in seen.iter().filter(|(_, c)| **c > 1) {
        issues.push(
            Issue::new(
                Severity::Error,
                format!("Header '{}' appears {} times", header, count),
            )
            .at_column(*header),
        );
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let row_number = idx + 2;
        if row.iter().all(|c| c.trim().is_empty()) {
            issues.push(Issue::new(Severity::Info, "Blank row will be skipped").at_row(row_number));
        } else if row.len() != width {
            issues.push(
                Issue::new(
                    Severity::Warning,
                    format!("Row has {} cells, expected {}", row.len(), width),
                )
                .at_row(row_number),
            );
        }
    }

    let mut suggested_mapping = ColumnMapping::new();
    if let Some(schema) = schema {
        suggested_mapping = suggest_mapping(&table.headers, schema.columns);
        for column in unmapped_required(&suggested_mapping, schema.columns) {
            issues.push(
                Issue::new(
                    Severity::Warning,
                    format!("Required field '{}' has no matching column", column.label),
                )
                .at_column(column.key),
            );
        }
    }

    FileAnalysis {
        headers: table.headers.clone(),
        sample_data: table.rows.iter().take(SAMPLE_ROWS).cloned().collect(),
        estimated_rows: table.rows.len(),
        issues,
        suggested_mapping,
    }
}

/// Non-blank rows turned into records under `mapping`.
pub fn mapped_records(table: &Table, mapping: &ColumnMapping) -> Vec<(usize, Record)> {
    let rows: Vec<(usize, Vec<String>)> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.iter().all(|c| c.trim().is_empty()))
        .map(|(idx, row)| (idx + 2, row.clone()))
        .collect();

    let only_rows: Vec<Vec<String>> = rows.iter().map(|(_, r)| r.clone()).collect();
    let records = apply_mapping(&table.headers, &only_rows, mapping);
    rows.into_iter().map(|(n, _)| n).zip(records).collect()
}

/// Row numbers count the header as row 1.
pub fn validate_rows(rows: &[(usize, Record)], schema: &Schema) -> Vec<RowError> {
    let mut errors = Vec::new();
    for (row, record) in rows {
        for error in validate_record(record, schema).iter() {
            errors.push(RowError {
                row: *row,
                field: error.field.clone(),
                message: error.message.clone(),
            });
        }
    }
    debug!(rows = rows.len(), errors = errors.len(), "Validated import rows");
    errors
}
