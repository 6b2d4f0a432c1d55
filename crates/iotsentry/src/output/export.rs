//! Serializing tables for download.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SentryError};
use crate::input::DataTable;

/// Suggested file name for the augmented table.
pub const DEFAULT_OUTPUT_FILE: &str = "predictions.csv";

/// Supported export encodings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    /// Array of row objects keyed by column name.
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Tsv => "text/tab-separated-values; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Unknown format: {}. Use csv, tsv, or json.", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Write `table` to `writer` in `format`. Row order is preserved.
pub fn write_table<W: Write>(table: &DataTable, format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(table, writer),
        ExportFormat::Tsv => write_delimited(table, b'\t', writer),
        ExportFormat::Json => write_json(table, writer),
    }
}

/// Write `table` as comma-separated text with a header row.
pub fn write_csv<W: Write>(table: &DataTable, writer: W) -> Result<()> {
    write_delimited(table, b',', writer)
}

/// Write `table` to a file, creating or truncating it.
pub fn write_table_to_path(table: &DataTable, format: ExportFormat, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| SentryError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_table(table, format, BufWriter::new(file))
}

fn write_delimited<W: Write>(table: &DataTable, delimiter: u8, writer: W) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    out.write_record(&table.headers)?;
    for row in &table.rows {
        out.write_record(row)?;
    }
    out.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn write_json<W: Write>(table: &DataTable, writer: W) -> Result<()> {
    let records: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .headers
                .iter()
                .zip(row)
                .map(|(h, v)| (h.clone(), Value::String(v.clone())))
                .collect();
            Value::Object(object)
        })
        .collect();

    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DataTable {
        DataTable::from_rows(
            &["rate", "note"],
            &[&["1.5", "a,b"], &["2", "plain"]],
        )
    }

    #[test]
    fn test_csv_quotes_embedded_delimiters() {
        let mut buf = Vec::new();
        write_table(&table(), ExportFormat::Csv, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "rate,note\n1.5,\"a,b\"\n2,plain\n"
        );
    }

    #[test]
    fn test_tsv() {
        let mut buf = Vec::new();
        write_table(&table(), ExportFormat::Tsv, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "rate\tnote\n1.5\ta,b\n2\tplain\n"
        );
    }

    #[test]
    fn test_json_records() {
        let mut buf = Vec::new();
        write_table(&table(), ExportFormat::Json, &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value[0]["rate"], "1.5");
        assert_eq!(value[1]["note"], "plain");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("tsv".parse::<ExportFormat>().unwrap(), ExportFormat::Tsv);
        assert!("parquet".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_write_to_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        write_table_to_path(&table(), ExportFormat::Csv, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("rate,note\n"));
    }
}
