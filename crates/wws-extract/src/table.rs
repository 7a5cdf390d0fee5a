//! DataFrame construction from finalized rows.

use polars::prelude::*;
use wws_model::{Row, Value};

/// How list cells are materialized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListMode {
    /// `List(String)` columns.
    #[default]
    Nested,
    /// List items joined into one string (for CSV, which has no list type).
    Joined(String),
}

/// Builds a DataFrame with one column per entry of `columns`.
///
/// Missing cells are null. A column holding a list in any row becomes a list
/// column; its scalar cells are wrapped as one-item lists.
pub fn build_table(columns: &[String], rows: &[Row], mode: &ListMode) -> PolarsResult<DataFrame> {
    let mut frame_columns: Vec<Column> = Vec::with_capacity(columns.len());
    for name in columns {
        let cells: Vec<Option<&Value>> = rows.iter().map(|row| row.get(name)).collect();
        let has_list = cells.iter().flatten().any(|value| value.as_list().is_some());
        let series = match mode {
            ListMode::Nested if has_list => list_series(name, &cells)?,
            ListMode::Joined(separator) => {
                let values: Vec<Option<String>> = cells
                    .iter()
                    .map(|cell| cell.and_then(|value| joined_text(value, separator)))
                    .collect();
                Series::new(name.as_str().into(), values)
            }
            ListMode::Nested => {
                let values: Vec<Option<&str>> = cells
                    .iter()
                    .map(|cell| cell.and_then(Value::as_text))
                    .collect();
                Series::new(name.as_str().into(), values)
            }
        };
        frame_columns.push(series.into());
    }
    DataFrame::new(frame_columns)
}

fn list_series(name: &str, cells: &[Option<&Value>]) -> PolarsResult<Series> {
    let values: Vec<Option<Series>> = cells
        .iter()
        .map(|cell| match cell {
            Some(Value::List(items)) => Some(Series::new(PlSmallStr::EMPTY, items.clone())),
            Some(Value::Text(text)) => Some(Series::new(PlSmallStr::EMPTY, [text.as_str()])),
            Some(Value::Null) | None => None,
        })
        .collect();
    Series::new(name.into(), values).cast(&DataType::List(Box::new(DataType::String)))
}

fn joined_text(value: &Value, separator: &str) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(text) => Some(text.clone()),
        Value::List(items) => Some(
            items
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(separator),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<String>, Vec<Row>) {
        let mut first = Row::new();
        first.set("Journal_Number", "J-1");
        first.set(
            "Memo",
            Value::List(vec![Some("a".to_string()), None, Some("b".to_string())]),
        );
        let mut second = Row::new();
        second.set("Journal_Number", "J-2");
        second.set("Memo", "c");
        second.set("Extra", Value::Null);
        let columns = vec![
            "Journal_Number".to_string(),
            "Memo".to_string(),
            "Extra".to_string(),
        ];
        (columns, vec![first, second])
    }

    #[test]
    fn nested_mode_builds_list_columns() {
        let (columns, rows) = sample();
        let frame = build_table(&columns, &rows, &ListMode::Nested).expect("build table");
        assert_eq!(frame.shape(), (2, 3));
        assert_eq!(
            frame.column("Memo").expect("memo").dtype(),
            &DataType::List(Box::new(DataType::String))
        );
        assert_eq!(frame.column("Journal_Number").expect("number").dtype(), &DataType::String);
        assert_eq!(frame.column("Extra").expect("extra").null_count(), 2);
    }

    #[test]
    fn joined_mode_flattens_lists() {
        let (columns, rows) = sample();
        let frame =
            build_table(&columns, &rows, &ListMode::Joined("; ".into())).expect("build table");
        let memo = frame.column("Memo").expect("memo").str().expect("string column");
        assert_eq!(memo.get(0), Some("a; b"));
        assert_eq!(memo.get(1), Some("c"));
    }
}
