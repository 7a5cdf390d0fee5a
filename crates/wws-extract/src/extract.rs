//! Entry points: documents in, finalized rows or a DataFrame out.

use polars::prelude::DataFrame;
use roxmltree::{Document, Node};
use tracing::{debug, info};
use wws_model::{ExtractOptions, Row};

use crate::engine::RowFlattener;
use crate::error::{ExtractError, Result};
use crate::finalize::finalize_rows;
use crate::parser::{SkippedDirective, parse_directives};
use crate::table::{ListMode, build_table};

/// Finalized extraction output.
#[derive(Debug, Clone, Default)]
pub struct ExtractedRows {
    /// Final column names, in order of first appearance.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Tag expressions that failed to parse.
    pub skipped: Vec<SkippedDirective>,
}

impl ExtractedRows {
    pub fn to_frame(&self, mode: &ListMode) -> Result<DataFrame> {
        Ok(build_table(&self.columns, &self.rows, mode)?)
    }
}

/// Extracts rows from every `start_tag` element found in `documents`.
///
/// Record elements from all documents are combined in the order given.
pub fn extract_rows<D, S>(
    documents: &[D],
    start_tag: &str,
    tags: &[S],
    options: &ExtractOptions,
) -> Result<ExtractedRows>
where
    D: AsRef<[u8]>,
    S: AsRef<str>,
{
    if documents.is_empty() {
        return Err(ExtractError::NoDocuments);
    }
    let start_tag = start_tag.trim();
    if start_tag.is_empty() {
        return Err(ExtractError::EmptyStartTag);
    }

    let texts = documents
        .iter()
        .enumerate()
        .map(|(index, bytes)| {
            std::str::from_utf8(bytes.as_ref())
                .map_err(|source| ExtractError::Encoding { index, source })
        })
        .collect::<Result<Vec<_>>>()?;
    let parsed_documents = texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
            Document::parse(text).map_err(|source| ExtractError::Xml { index, source })
        })
        .collect::<Result<Vec<_>>>()?;

    let uri = options.namespace.uri.as_str();
    let records: Vec<Node<'_, '_>> = parsed_documents
        .iter()
        .flat_map(|document| {
            document
                .root_element()
                .descendants()
                .skip(1)
                .filter(move |node| node.has_tag_name((uri, start_tag)))
        })
        .collect();
    info!(
        documents = documents.len(),
        records = records.len(),
        start_tag,
        "collected record elements"
    );

    let parsed = parse_directives(tags, options);
    debug!(
        directives = parsed.directives.len(),
        skipped = parsed.skipped.len(),
        "parsed tag expressions"
    );

    let rows = RowFlattener::new(options).flatten_records(&records, &parsed.directives, &Row::new());
    let (columns, rows) = finalize_rows(rows, &options.namespace);
    info!(rows = rows.len(), columns = columns.len(), "extraction complete");

    Ok(ExtractedRows {
        columns,
        rows,
        skipped: parsed.skipped,
    })
}

/// Extracts rows and builds a DataFrame with nested list columns.
pub fn extract<D, S>(
    documents: &[D],
    start_tag: &str,
    tags: &[S],
    options: &ExtractOptions,
) -> Result<DataFrame>
where
    D: AsRef<[u8]>,
    S: AsRef<str>,
{
    extract_rows(documents, start_tag, tags, options)?.to_frame(&ListMode::Nested)
}
