//! Writers for extracted tables.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use polars::prelude::{CsvWriter, SerWriter};
use wws_extract::{ExtractedRows, ListMode};
use wws_model::Value;

/// Separator used to join list cells in CSV output.
pub const DEFAULT_LIST_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    /// An array of row objects.
    Json,
}

/// Writes `extracted` as CSV. List cells are joined with `separator`.
pub fn write_csv<W: Write>(extracted: &ExtractedRows, separator: &str, writer: W) -> Result<()> {
    let mut frame = extracted
        .to_frame(&ListMode::Joined(separator.to_string()))
        .context("build table")?;
    CsvWriter::new(writer)
        .include_header(true)
        .finish(&mut frame)
        .context("write CSV")?;
    Ok(())
}

/// Writes `extracted` as a JSON array of objects, keys in column order.
///
/// Every object carries every column; cells a row never set are `null`.
pub fn write_json<W: Write>(extracted: &ExtractedRows, writer: W) -> Result<()> {
    let rows: Vec<IndexMap<&str, &Value>> = extracted
        .rows
        .iter()
        .map(|row| {
            extracted
                .columns
                .iter()
                .map(|column| (column.as_str(), row.get(column).unwrap_or(&Value::Null)))
                .collect()
        })
        .collect();
    serde_json::to_writer_pretty(writer, &rows).context("write JSON")?;
    Ok(())
}

/// Writes `extracted` to `path` in `format`.
pub fn write_table(
    extracted: &ExtractedRows,
    path: &Path,
    format: OutputFormat,
    separator: &str,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Csv => write_csv(extracted, separator, &mut writer)?,
        OutputFormat::Json => write_json(extracted, &mut writer)?,
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}
