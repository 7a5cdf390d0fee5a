//! Flatten-all extraction: every leaf and attribute under an element becomes
//! one key/value pair.
//!
//! Keys join ancestor local names with `_` (`Address_Data_Country_Reference_ID`);
//! attributes append their local name (`..._ID_type`). Keys longer than the
//! configured limit are shortened as they are built.

use std::collections::HashSet;

use indexmap::IndexMap;
use roxmltree::Node;
use tracing::debug;

/// Flattened subtree, in document order.
pub type FlatRecord = IndexMap<String, Option<String>>;

const KEY_SEPARATOR: char = '_';

/// Flattens the children of `element` (not `element` itself).
pub fn flatten_element(element: Node<'_, '_>, max_key_length: usize) -> FlatRecord {
    let mut record = FlatRecord::new();
    let mut emitted = HashSet::new();
    collect_leaves(element, "", max_key_length, &mut emitted, &mut record);
    record
}

fn collect_leaves(
    element: Node<'_, '_>,
    prefix: &str,
    max_key_length: usize,
    emitted: &mut HashSet<String>,
    record: &mut FlatRecord,
) {
    for child in element.children().filter(Node::is_element) {
        let local = child.tag_name().name();
        let key = if prefix.is_empty() {
            local.to_string()
        } else {
            format!("{prefix}{KEY_SEPARATOR}{local}")
        };
        let key = shorten_key(&key, max_key_length);
        note_key(emitted, &key);

        for attribute in child.attributes() {
            let attribute_key = shorten_key(
                &format!("{key}{KEY_SEPARATOR}{}", attribute.name()),
                max_key_length,
            );
            note_key(emitted, &attribute_key);
            record.insert(attribute_key, Some(attribute.value().to_string()));
        }

        if child.children().any(|node| node.is_element()) {
            collect_leaves(child, &key, max_key_length, emitted, record);
        } else {
            record.insert(key, child.text().map(str::to_string));
        }
    }
}

fn note_key(emitted: &mut HashSet<String>, key: &str) {
    if !emitted.insert(key.to_string()) {
        debug!(key, "flattened key repeated; later value wins");
    }
}

/// Shortens `key` to at most `max_length` characters, keeping a suffix.
///
/// Prefers to cut just after the first `_` that leaves a short enough tail,
/// falls back to an `_` immediately before the window, and finally keeps the
/// last `max_length` characters.
pub fn shorten_key(key: &str, max_length: usize) -> String {
    let chars: Vec<char> = key.chars().collect();
    let len = chars.len();
    if len <= max_length {
        return key.to_string();
    }
    let start = len - max_length;
    let tail = |from: usize| -> String { chars[from..].iter().collect() };

    if let Some(offset) = chars[start..].iter().position(|ch| *ch == KEY_SEPARATOR) {
        let cut = start + offset + 1;
        if cut < len {
            return tail(cut);
        }
    } else if let Some(index) = chars[..start].iter().rposition(|ch| *ch == KEY_SEPARATOR) {
        if len - index - 1 <= max_length {
            return tail(index + 1);
        }
    }
    tail(start)
}
