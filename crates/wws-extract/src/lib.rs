//! Extraction of flat rows from Workday Web Services XML responses.
//!
//! Each output column is described by a tag expression (see [`parser`]). The
//! [`engine`] walks every record element, the [`finalize`] pass assigns
//! user-facing column names, and [`table`] turns the rows into a DataFrame.

pub mod engine;
pub mod error;
pub mod extract;
pub mod finalize;
pub mod flatten;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod table;

pub use engine::RowFlattener;
pub use error::{DirectiveError, ExtractError, Result};
pub use extract::{ExtractedRows, extract, extract_rows};
pub use finalize::{ColumnPlan, final_column_name, finalize_rows};
pub use flatten::shorten_key;
pub use parser::{
    Directive, DirectiveKind, ParsedDirectives, SkippedDirective, parse_directive,
    parse_directives,
};
pub use table::{ListMode, build_table};
