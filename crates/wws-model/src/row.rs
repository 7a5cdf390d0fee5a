//! Row values produced by the flattening engine.

use indexmap::IndexMap;
use serde::Serialize;

/// A single cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    /// Multi-valued leaf kept in one cell (collections mode).
    List(Vec<Option<String>>),
}

impl Value {
    pub fn from_option(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Option<String>]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        Self::from_option(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One output row: column name to cell, in insertion order.
///
/// Rows are plain values. Forking a row for fan-out clones it, so sibling
/// rows never share state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row {
    cells: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column`, keeping its original position when it already exists.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Returns a copy of this row with `column` set.
    #[must_use]
    pub fn with(&self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut forked = self.clone();
        forked.set(column, value);
        forked
    }

    pub fn extend<K, V>(&mut self, cells: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (column, value) in cells {
            self.set(column, value);
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    /// Text of `column`, or `None` when missing, null, or a list.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_text)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Rebuilds the row with every column passed through `rename`.
    ///
    /// Values and their order are untouched.
    #[must_use]
    pub fn renamed(self, mut rename: impl FnMut(&str) -> String) -> Self {
        let cells = self
            .cells
            .into_iter()
            .map(|(column, value)| (rename(&column), value))
            .collect();
        Self { cells }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        row.extend(iter);
        row
    }
}
