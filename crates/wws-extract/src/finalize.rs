//! Final column naming.
//!
//! Raw column keys are the qualified path rendering of each directive. After
//! all rows exist, each key is renamed once:
//!
//! - a key with an attribute-equality predicate takes the predicate literal
//!   (`./wd:Ref/wd:ID[@wd:type='Cost_Center_ID']` → `Cost_Center_ID`);
//! - a namespace-qualified path takes its last segment without prefix or `@`
//!   (`./wd:Line/wd:Memo` → `Memo`, `./@wd:Primary_Job` → `Primary_Job`);
//! - anything else (explicit `^^` names, flatten-all keys) is kept.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::warn;
use wws_model::{Namespace, Row};

static PREDICATE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=(.*?)\]").expect("valid predicate literal regex"));

/// Final name for one raw column key.
pub fn final_column_name(raw: &str, namespace: &Namespace) -> String {
    if let Some(captures) = PREDICATE_LITERAL.captures(raw) {
        return captures[1].replace(['\'', '"'], "");
    }
    let qualified = format!("{}:", namespace.prefix);
    let path_step = format!("/{qualified}");
    let attribute_step = format!("/@{qualified}");
    if raw.contains(&path_step) || raw.contains(&attribute_step) {
        let last = raw.rsplit('/').next().unwrap_or(raw);
        let last = last.trim_start_matches('@');
        return last.strip_prefix(&qualified).unwrap_or(last).to_string();
    }
    raw.to_string()
}

/// Every column in `rows`, in order of first appearance.
pub fn ordered_columns(rows: &[Row]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for row in rows {
        for column in row.columns() {
            if seen.insert(column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

/// Raw-to-final column mapping with collisions resolved.
#[derive(Debug, Clone, Default)]
pub struct ColumnPlan {
    renames: IndexMap<String, String>,
}

impl ColumnPlan {
    /// Plans final names for `columns`. When two raw columns land on the same
    /// name, the later one gets `_2`, `_3`, … appended.
    pub fn new<S: AsRef<str>>(columns: &[S], namespace: &Namespace) -> Self {
        let mut taken: HashSet<String> = HashSet::new();
        let mut renames = IndexMap::new();
        for raw in columns {
            let raw = raw.as_ref();
            if renames.contains_key(raw) {
                continue;
            }
            let base = final_column_name(raw, namespace);
            let mut name = base.clone();
            let mut counter = 2;
            while taken.contains(&name) {
                name = format!("{base}_{counter}");
                counter += 1;
            }
            if name != base {
                warn!(column = raw, renamed = %name, "final column name collides; suffixing");
            }
            taken.insert(name.clone());
            renames.insert(raw.to_string(), name);
        }
        Self { renames }
    }

    /// Final name for `raw`, or `raw` itself when unplanned.
    pub fn final_name<'a>(&'a self, raw: &'a str) -> &'a str {
        self.renames.get(raw).map_or(raw, String::as_str)
    }

    /// Final names in planned order.
    pub fn columns(&self) -> Vec<String> {
        self.renames.values().cloned().collect()
    }

    pub fn apply(&self, rows: Vec<Row>) -> Vec<Row> {
        rows.into_iter()
            .map(|row| row.renamed(|column| self.final_name(column).to_string()))
            .collect()
    }
}

/// Renames every row's columns; returns the final column order and rows.
pub fn finalize_rows(rows: Vec<Row>, namespace: &Namespace) -> (Vec<String>, Vec<Row>) {
    let plan = ColumnPlan::new(&ordered_columns(&rows), namespace);
    let columns = plan.columns();
    (columns, plan.apply(rows))
}
