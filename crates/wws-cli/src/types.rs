use std::path::PathBuf;

use wws_cli::output::OutputFormat;
use wws_extract::ExtractedRows;

#[derive(Debug)]
pub struct ExtractResult {
    pub start_tag: String,
    pub inputs: Vec<PathBuf>,
    pub extracted: ExtractedRows,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    /// Rows shown when no output file was requested.
    pub preview: usize,
}

impl ExtractResult {
    /// Per-column fill counts, in column order.
    pub fn column_summaries(&self) -> Vec<ColumnSummary> {
        self.extracted
            .columns
            .iter()
            .map(|name| {
                let mut summary = ColumnSummary {
                    name: name.clone(),
                    filled: 0,
                    lists: 0,
                };
                for row in &self.extracted.rows {
                    match row.get(name) {
                        Some(value) if value.as_list().is_some() => {
                            summary.filled += 1;
                            summary.lists += 1;
                        }
                        Some(value) if !value.is_null() => summary.filled += 1,
                        _ => {}
                    }
                }
                summary
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub name: String,
    /// Rows with a non-null value.
    pub filled: usize,
    /// Rows holding a multi-valued cell.
    pub lists: usize,
}

#[derive(Debug)]
pub struct FetchResult {
    pub url: String,
    pub out_dir: PathBuf,
    pub pages: Vec<PathBuf>,
}

/// One row of the `tags` report.
#[derive(Debug)]
pub struct TagReport {
    pub source: String,
    pub outcome: TagOutcome,
}

#[derive(Debug)]
pub enum TagOutcome {
    Parsed {
        kind: &'static str,
        /// Raw column keys and their final names.
        columns: Vec<(String, String)>,
    },
    Skipped(String),
}
