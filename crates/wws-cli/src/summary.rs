use std::path::PathBuf;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use wws_model::{Row, Value};

use crate::types::{ExtractResult, FetchResult, TagOutcome, TagReport};

/// Longest cell shown in the row preview.
const PREVIEW_CELL_WIDTH: usize = 40;

pub fn print_extract_summary(result: &ExtractResult) {
    println!("Start tag: {}", result.start_tag);
    println!("Responses: {}", result.inputs.len());
    println!("Rows: {}", result.extracted.rows.len());
    if let Some(path) = &result.output {
        println!("Output: {} ({:?})", path.display(), result.format);
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Filled"),
        header_cell("Lists"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    let total = result.extracted.rows.len();
    for summary in result.column_summaries() {
        table.add_row(vec![
            Cell::new(&summary.name),
            fill_cell(summary.filled, total),
            count_cell(summary.lists, Color::Yellow),
        ]);
    }
    println!("{table}");

    print_skipped(result);
    if result.output.is_none() && result.preview > 0 {
        print_preview(&result.extracted.columns, &result.extracted.rows, result.preview);
    }
}

fn print_skipped(result: &ExtractResult) {
    if result.extracted.skipped.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Skipped tag"), header_cell("Reason")]);
    apply_table_style(&mut table);
    for skipped in &result.extracted.skipped {
        table.add_row(vec![
            Cell::new(&skipped.source).fg(Color::Red),
            Cell::new(skipped.error.to_string()),
        ]);
    }
    println!();
    println!("{table}");
}

fn print_preview(columns: &[String], rows: &[Row], limit: usize) {
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(columns.iter().map(|c| header_cell(c)).collect::<Vec<_>>());
    apply_table_style(&mut table);
    for row in rows.iter().take(limit) {
        table.add_row(
            columns
                .iter()
                .map(|column| value_cell(row.get(column)))
                .collect::<Vec<_>>(),
        );
    }
    println!();
    println!("Preview ({} of {} rows):", limit.min(rows.len()), rows.len());
    println!("{table}");
}

pub fn print_tags(reports: &[TagReport]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Tag"),
        header_cell("Kind"),
        header_cell("Column key"),
        header_cell("Final name"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, report) in reports.iter().enumerate() {
        let number = Cell::new(index + 1);
        let source = Cell::new(&report.source);
        match &report.outcome {
            TagOutcome::Parsed { kind, columns } if columns.is_empty() => {
                table.add_row(vec![
                    number,
                    source,
                    Cell::new(kind),
                    dim_cell("-"),
                    dim_cell("-"),
                ]);
            }
            TagOutcome::Parsed { kind, columns } => {
                let keys: Vec<&str> = columns.iter().map(|(raw, _)| raw.as_str()).collect();
                let names: Vec<&str> = columns.iter().map(|(_, name)| name.as_str()).collect();
                table.add_row(vec![
                    number,
                    source,
                    Cell::new(kind),
                    Cell::new(keys.join("\n")),
                    Cell::new(names.join("\n")).add_attribute(Attribute::Bold),
                ]);
            }
            TagOutcome::Skipped(message) => {
                table.add_row(vec![
                    number,
                    source.fg(Color::Red),
                    Cell::new("error").fg(Color::Red).add_attribute(Attribute::Bold),
                    Cell::new(message).fg(Color::Red),
                    dim_cell("-"),
                ]);
            }
        }
    }
    println!("{table}");
}

pub fn print_fetch_summary(result: &FetchResult) {
    println!("URL: {}", result.url);
    println!("Pages: {}", result.pages.len());
    println!("Saved to: {}", result.out_dir.display());
}

pub fn print_dump_summary(written: &[PathBuf]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("JSON dump")]);
    apply_table_style(&mut table);
    for path in written {
        table.add_row(vec![Cell::new(path.display())]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn fill_cell(filled: usize, total: usize) -> Cell {
    let cell = Cell::new(format!("{filled}/{total}"));
    match filled {
        0 => cell.fg(Color::DarkGrey),
        n if n == total => cell.fg(Color::Green),
        _ => cell,
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn value_cell(value: Option<&Value>) -> Cell {
    match value {
        Some(Value::Text(text)) => Cell::new(truncate(text)),
        Some(Value::List(items)) => {
            let joined = items
                .iter()
                .map(|item| item.as_deref().unwrap_or("null"))
                .collect::<Vec<_>>()
                .join(", ");
            Cell::new(truncate(&format!("[{joined}]"))).fg(Color::Yellow)
        }
        Some(Value::Null) | None => dim_cell("null"),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CELL_WIDTH {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CELL_WIDTH - 1).collect();
    format!("{head}…")
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
