//! Row-flattening engine.
//!
//! Walks record elements in order, evaluating directives against each and
//! producing rows. A repeat anchor hands every directive after it to a nested
//! call over the anchor's matched children, with the row built so far as the
//! inherited prefix.
//!
//! Fan-out appends forked rows immediately and then keeps evaluating later
//! directives against the un-forked row; that row is only emitted if no
//! fan-out happened for the element.

use indexmap::IndexMap;
use roxmltree::Node;
use tracing::{debug, trace};
use wws_model::{ExtractOptions, Row, Value};

use crate::flatten::FlatRecord;
use crate::parser::{Directive, DirectiveKind};
use crate::resolver::{Resolved, Resolver};

pub struct RowFlattener {
    resolver: Resolver,
    allow_collections: bool,
}

impl RowFlattener {
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            resolver: Resolver::new(options),
            allow_collections: options.allow_collections,
        }
    }

    /// Produces the rows for `records`, each starting from a copy of `prefix`.
    pub fn flatten_records(
        &self,
        records: &[Node<'_, '_>],
        directives: &[Directive],
        prefix: &Row,
    ) -> Vec<Row> {
        let mut rows = Vec::new();
        for record in records {
            self.flatten_record(*record, directives, prefix, &mut rows);
        }
        rows
    }

    fn flatten_record(
        &self,
        record: Node<'_, '_>,
        directives: &[Directive],
        prefix: &Row,
        rows: &mut Vec<Row>,
    ) {
        let mut row = prefix.clone();
        let mut emitted = false;

        for (position, directive) in directives.iter().enumerate() {
            match &directive.kind {
                DirectiveKind::RepeatAnchor(path) => {
                    let children = self.resolver.elements(path, record);
                    let group = &directives[position + 1..];
                    trace!(
                        anchor = %directive.key,
                        children = children.len(),
                        nested = group.len(),
                        "descending into repeat group"
                    );
                    rows.extend(self.flatten_records(&children, group, &row));
                    emitted = true;
                    break;
                }
                DirectiveKind::FlattenAll(path) => {
                    let subtrees = self.resolver.subtrees(path, record);
                    if self.apply_subtrees(directive, subtrees, &mut row, rows) {
                        emitted = true;
                    }
                }
                kind => {
                    let Some(resolved) = self.resolver.resolve(kind, record) else {
                        continue;
                    };
                    if self.apply_value(directive, resolved, &mut row, rows) {
                        emitted = true;
                    }
                }
            }
        }

        if !emitted {
            rows.push(row);
        }
    }

    /// Returns `true` when forked rows were appended.
    fn apply_subtrees(
        &self,
        directive: &Directive,
        subtrees: Vec<FlatRecord>,
        row: &mut Row,
        rows: &mut Vec<Row>,
    ) -> bool {
        debug!(tag = %directive.source, matches = subtrees.len(), "flatten-all");
        match subtrees.len() {
            0 => {
                row.set(directive.key.as_str(), Value::Null);
                false
            }
            1 => {
                row.extend(subtrees.into_iter().flatten());
                false
            }
            _ if self.allow_collections => {
                let mut collected: IndexMap<String, Vec<Option<String>>> = IndexMap::new();
                for (key, value) in subtrees.into_iter().flatten() {
                    collected.entry(key).or_default().push(value);
                }
                row.extend(
                    collected
                        .into_iter()
                        .map(|(key, values)| (key, Value::List(values))),
                );
                false
            }
            _ => {
                rows.extend(subtrees.into_iter().map(|subtree| {
                    let mut forked = row.clone();
                    forked.extend(subtree);
                    forked
                }));
                true
            }
        }
    }

    /// Returns `true` when forked rows were appended.
    fn apply_value(
        &self,
        directive: &Directive,
        resolved: Resolved,
        row: &mut Row,
        rows: &mut Vec<Row>,
    ) -> bool {
        let column = directive.column();
        match resolved {
            Resolved::Attribute(value) => {
                row.set(column, value);
                false
            }
            Resolved::Chain(winner) => {
                let DirectiveKind::OrChain { target, .. } = &directive.kind else {
                    return false;
                };
                match winner {
                    Some(found) => {
                        debug!(
                            tag = %directive.source,
                            alternative = found.alternative,
                            "or-chain resolved"
                        );
                        row.set(target.as_str(), found.discriminator);
                        if directive.rename.is_some() {
                            row.set(column, found.text);
                        }
                    }
                    None => {
                        debug!(tag = %directive.source, "or-chain found no single match");
                        row.set(target.as_str(), Value::Null);
                        if directive.rename.is_some() {
                            row.set(column, Value::Null);
                        }
                    }
                }
                false
            }
            Resolved::Texts(mut texts) => match texts.len() {
                0 => {
                    row.set(column, Value::Null);
                    false
                }
                1 => {
                    row.set(column, texts.pop().flatten());
                    false
                }
                matches if self.allow_collections => {
                    debug!(tag = %directive.source, matches, "packing matches into a list");
                    row.set(column, Value::List(texts));
                    false
                }
                matches => {
                    debug!(tag = %directive.source, matches, "fanning out rows");
                    rows.extend(texts.into_iter().map(|text| row.with(column, text)));
                    true
                }
            },
        }
    }
}
