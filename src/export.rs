use crate::error::ExportError;
use crate::value::{lookup, Record, Value};
use chrono::NaiveDate;
use clap::ValueEnum;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Pdf,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Excel => "Excel",
            ExportFormat::Csv => "CSV",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Json => "JSON",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumn {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ExportColumn {
    pub fn header(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }
}

/// `key` or `key=Label`.
impl FromStr for ExportColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, label) = match s.split_once('=') {
            Some((k, l)) => (k.trim(), Some(l.trim().to_string()).filter(|l| !l.is_empty())),
            None => (s.trim(), None),
        };
        if key.is_empty() {
            return Err(format!("empty column in '{}'", s));
        }
        Ok(Self {
            key: key.to_string(),
            label,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    pub delimiter: char,
    pub include_headers: bool,
    pub quote_all: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_headers: true,
            quote_all: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    #[default]
    Professional,
    Minimal,
    Colorful,
    Classic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcelStyle {
    pub font: &'static str,
    pub font_size: u8,
    pub header_bold: bool,
    pub header_fill: &'static str,
    pub header_font_color: &'static str,
    pub zebra_fill: Option<&'static str>,
    pub borders: bool,
}

impl StylePreset {
    pub fn style(self) -> ExcelStyle {
        match self {
            StylePreset::Professional => ExcelStyle {
                font: "Calibri",
                font_size: 11,
                header_bold: true,
                header_fill: "#1F4E78",
                header_font_color: "#FFFFFF",
                zebra_fill: Some("#F2F2F2"),
                borders: true,
            },
            StylePreset::Minimal => ExcelStyle {
                font: "Arial",
                font_size: 10,
                header_bold: true,
                header_fill: "#FFFFFF",
                header_font_color: "#000000",
                zebra_fill: None,
                borders: false,
            },
            StylePreset::Colorful => ExcelStyle {
                font: "Calibri",
                font_size: 11,
                header_bold: true,
                header_fill: "#70AD47",
                header_font_color: "#FFFFFF",
                zebra_fill: Some("#E2EFDA"),
                borders: true,
            },
            StylePreset::Classic => ExcelStyle {
                font: "Times New Roman",
                font_size: 12,
                header_bold: true,
                header_fill: "#D9D9D9",
                header_font_color: "#000000",
                zebra_fill: None,
                borders: true,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExcelOptions {
    pub sheet_name: String,
    pub style_preset: StylePreset,
    pub freeze_header: bool,
    pub auto_filter: bool,
}

impl Default for ExcelOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Export".to_string(),
            style_preset: StylePreset::default(),
            freeze_header: true,
            auto_filter: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfOptions {
    pub orientation: Orientation,
    pub page_size: PageSize,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    pub pretty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Empty means every column, in first-seen order.
    #[serde(default)]
    pub columns: Vec<ExportColumn>,
    #[serde(default)]
    pub csv: CsvOptions,
    #[serde(default)]
    pub excel: ExcelOptions,
    #[serde(default)]
    pub pdf: PdfOptions,
    #[serde(default)]
    pub json: JsonOptions,
}

const SHEET_NAME_FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            columns: Vec::new(),
            csv: CsvOptions::default(),
            excel: ExcelOptions::default(),
            pdf: PdfOptions::default(),
            json: JsonOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        let mut headers = IndexSet::new();
        for column in &self.columns {
            if !headers.insert(column.header()) {
                return Err(ExportError::InvalidOptions(format!(
                    "column header '{}' is used twice",
                    column.header()
                )));
            }
        }

        match self.format {
            ExportFormat::Csv => {
                let d = self.csv.delimiter;
                if !d.is_ascii() || d == '"' || d == '\n' || d == '\r' {
                    return Err(ExportError::InvalidOptions(format!(
                        "'{}' cannot be used as a CSV delimiter",
                        d.escape_default()
                    )));
                }
            }
            ExportFormat::Excel => {
                let name = &self.excel.sheet_name;
                if name.trim().is_empty() || name.chars().count() > 31 {
                    return Err(ExportError::InvalidOptions(
                        "sheet name must be 1-31 characters".to_string(),
                    ));
                }
                if name.contains(SHEET_NAME_FORBIDDEN) {
                    return Err(ExportError::InvalidOptions(format!(
                        "sheet name '{}' contains one of [ ] : * ? / \\",
                        name
                    )));
                }
            }
            ExportFormat::Pdf | ExportFormat::Json => {}
        }

        Ok(())
    }
}

pub fn default_columns(records: &[Record]) -> Vec<ExportColumn> {
    let keys: IndexSet<&String> = records.iter().flat_map(|r| r.keys()).collect();
    keys.into_iter()
        .map(|k| ExportColumn {
            key: k.clone(),
            label: None,
        })
        .collect()
}

/// Records restricted to `columns`, keyed by output header. Keys may be
/// dotted paths into nested values.
pub fn project(records: &[Record], columns: &[ExportColumn]) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| {
                    let value = lookup(record, &c.key).cloned().unwrap_or(Value::Null);
                    (c.header().to_string(), value)
                })
                .collect()
        })
        .collect()
}

pub fn default_file_name(resource: &str, format: ExportFormat, today: NaiveDate) -> String {
    format!(
        "{}_export_{}.{}",
        resource,
        today.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Turns projected records into bytes for one format.
pub trait ExportWriter {
    fn format(&self) -> ExportFormat;

    fn write(
        &self,
        headers: &[String],
        records: &[Record],
        options: &ExportOptions,
        out: &mut dyn Write,
    ) -> Result<(), ExportError>;
}

pub struct CsvExporter;

impl ExportWriter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn write(
        &self,
        headers: &[String],
        records: &[Record],
        options: &ExportOptions,
        out: &mut dyn Write,
    ) -> Result<(), ExportError> {
        let quote_style = if options.csv.quote_all {
            csv::QuoteStyle::Always
        } else {
            csv::QuoteStyle::Necessary
        };
        let mut writer = csv::WriterBuilder::new()
            .delimiter(options.csv.delimiter as u8)
            .quote_style(quote_style)
            .has_headers(false)
            .from_writer(out);

        if options.csv.include_headers {
            writer.write_record(headers)?;
        }
        for record in records {
            writer.write_record(headers.iter().map(|h| {
                record.get(h).map(|v| v.to_string()).unwrap_or_default()
            }))?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub struct JsonExporter;

impl ExportWriter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn write(
        &self,
        _headers: &[String],
        records: &[Record],
        options: &ExportOptions,
        out: &mut dyn Write,
    ) -> Result<(), ExportError> {
        if options.json.pretty {
            serde_json::to_writer_pretty(&mut *out, records)?;
        } else {
            serde_json::to_writer(&mut *out, records)?;
        }
        out.write_all(b"\n")?;
        Ok(())
    }
}

/// Writers by format. CSV and JSON are built in; Excel and PDF writers can
/// be registered by the embedding application.
pub struct Exporter {
    writers: Vec<Box<dyn ExportWriter>>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self {
            writers: vec![Box::new(CsvExporter), Box::new(JsonExporter)],
        }
    }
}

impl Exporter {
    pub fn register(&mut self, writer: Box<dyn ExportWriter>) {
        self.writers.retain(|w| w.format() != writer.format());
        self.writers.push(writer);
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        self.writers.iter().any(|w| w.format() == format)
    }

    /// Writes `records` and returns how many rows went out.
    pub fn export(
        &self,
        records: &[Record],
        options: &ExportOptions,
        out: &mut dyn Write,
    ) -> Result<usize, ExportError> {
        options.validate()?;

        let writer = self
            .writers
            .iter()
            .find(|w| w.format() == options.format)
            .ok_or(ExportError::NoWriter(options.format.name()))?;

        let columns = if options.columns.is_empty() {
            default_columns(records)
        } else {
            options.columns.clone()
        };
        let headers: Vec<String> = columns.iter().map(|c| c.header().to_string()).collect();
        let projected = project(records, &columns);

        writer.write(&headers, &projected, options, out)?;
        info!(
            format = options.format.name(),
            rows = projected.len(),
            columns = headers.len(),
            "Export written"
        );
        Ok(projected.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::record;

    fn assets() -> Vec<Record> {
        vec![
            record(&[("tag", "HW-001".into()), ("name", "Laptop, 14\"".into()), ("cost", 1200.into())]),
            record(&[("tag", "HW-002".into()), ("name", "Dock".into())]),
        ]
    }

    fn run(options: &ExportOptions) -> String {
        let mut buf = Vec::new();
        Exporter::default().export(&assets(), options, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_csv_default_columns() {
        let out = run(&ExportOptions::new(ExportFormat::Csv));
        assert_eq!(out, "tag,name,cost\nHW-001,\"Laptop, 14\"\"\",1200\nHW-002,Dock,\n");
    }

    #[test]
    fn test_csv_selected_columns_with_labels_and_delimiter() {
        let mut options = ExportOptions::new(ExportFormat::Csv);
        options.columns = vec!["tag=Asset Tag".parse().unwrap(), "cost".parse().unwrap()];
        options.csv.delimiter = ';';
        assert_eq!(run(&options), "Asset Tag;cost\nHW-001;1200\nHW-002;\n");

        options.csv.include_headers = false;
        options.csv.quote_all = true;
        assert_eq!(run(&options), "\"HW-001\";\"1200\"\n\"HW-002\";\"\"\n");
    }

    #[test]
    fn test_json_export() {
        let mut options = ExportOptions::new(ExportFormat::Json);
        options.columns = vec!["tag".parse().unwrap(), "cost=Price".parse().unwrap()];
        assert_eq!(
            run(&options),
            "[{\"tag\":\"HW-001\",\"Price\":1200},{\"tag\":\"HW-002\",\"Price\":null}]\n"
        );
    }

    #[test]
    fn test_excel_needs_registered_writer() {
        let exporter = Exporter::default();
        assert!(!exporter.supports(ExportFormat::Excel));
        let mut buf = Vec::new();
        let err = exporter
            .export(&assets(), &ExportOptions::new(ExportFormat::Excel), &mut buf)
            .unwrap_err();
        assert!(matches!(err, ExportError::NoWriter("Excel")));
    }

    #[test]
    fn test_register_custom_writer() {
        struct CountingPdf;
        impl ExportWriter for CountingPdf {
            fn format(&self) -> ExportFormat {
                ExportFormat::Pdf
            }
            fn write(
                &self,
                headers: &[String],
                records: &[Record],
                options: &ExportOptions,
                out: &mut dyn Write,
            ) -> Result<(), ExportError> {
                write!(out, "{:?} {} {}", options.pdf.orientation, headers.len(), records.len())?;
                Ok(())
            }
        }

        let mut exporter = Exporter::default();
        exporter.register(Box::new(CountingPdf));
        let mut options = ExportOptions::new(ExportFormat::Pdf);
        options.pdf.orientation = Orientation::Landscape;
        let mut buf = Vec::new();
        assert_eq!(exporter.export(&assets(), &options, &mut buf).unwrap(), 2);
        assert_eq!(String::from_utf8(buf).unwrap(), "Landscape 3 2");
    }

    #[test]
    fn test_invalid_options() {
        let mut options = ExportOptions::new(ExportFormat::Csv);
        options.csv.delimiter = '"';
        assert!(options.validate().is_err());

        let mut options = ExportOptions::new(ExportFormat::Excel);
        options.excel.sheet_name = "Q1/Q2".into();
        assert!(options.validate().is_err());
        options.excel.sheet_name = "x".repeat(32);
        assert!(options.validate().is_err());

        let mut options = ExportOptions::new(ExportFormat::Json);
        options.columns = vec!["a=Name".parse().unwrap(), "b=Name".parse().unwrap()];
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_presets_and_file_name() {
        assert_eq!(StylePreset::Professional.style().header_fill, "#1F4E78");
        assert!(StylePreset::Minimal.style().zebra_fill.is_none());
        let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(
            default_file_name("hardware", ExportFormat::Excel, day),
            "hardware_export_2024-07-01.xlsx"
        );
    }

    #[test]
    fn test_options_from_yaml() {
        let yaml = "format: excel\nexcel:\n  stylePreset: colorful\n  sheetName: Assets\n";
        let options: ExportOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.excel.style_preset, StylePreset::Colorful);
        assert!(options.excel.freeze_header);
        assert_eq!(options.csv.delimiter, ',');
    }
}
