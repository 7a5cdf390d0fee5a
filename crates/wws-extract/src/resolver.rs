//! Evaluates value-producing directives against a single element.

use roxmltree::Node;
use wws_model::ExtractOptions;

use crate::flatten::{FlatRecord, flatten_element};
use crate::parser::DirectiveKind;
use crate::query::{Path, QName, Query};

/// What a value-producing directive found on one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Element texts, one per match (plain and wildcard directives).
    Texts(Vec<Option<String>>),
    /// A single attribute value, never a list.
    Attribute(Option<String>),
    /// The OR-chain winner, if any alternative matched exactly once.
    Chain(Option<ChainMatch>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatch {
    /// Index of the winning alternative.
    pub alternative: usize,
    /// The winner's discriminator attribute.
    pub discriminator: Option<String>,
    /// The winner's element text.
    pub text: Option<String>,
}

/// Namespace-aware lookups driven by [`ExtractOptions`].
#[derive(Debug, Clone)]
pub struct Resolver {
    discriminator: QName,
    max_key_length: usize,
}

impl Resolver {
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            discriminator: QName::new(
                Some(&options.namespace.uri),
                options.discriminator_attribute.as_str(),
            ),
            max_key_length: options.max_key_length,
        }
    }

    /// Resolves plain, wildcard, attribute and OR-chain directives.
    ///
    /// Returns `None` for repeat anchors and flatten-all directives, which
    /// the engine drives through [`Self::elements`] and [`Self::subtrees`].
    pub fn resolve(&self, kind: &DirectiveKind, element: Node<'_, '_>) -> Option<Resolved> {
        let resolved = match kind {
            DirectiveKind::Plain(query) | DirectiveKind::Wildcard(query) => {
                Resolved::Texts(texts(query, element))
            }
            DirectiveKind::Attribute { owner, attribute } => {
                Resolved::Attribute(attribute_value(owner.as_ref(), attribute, element))
            }
            DirectiveKind::OrChain { alternatives, .. } => {
                Resolved::Chain(self.first_single_match(alternatives, element))
            }
            DirectiveKind::RepeatAnchor(_) | DirectiveKind::FlattenAll(_) => return None,
        };
        Some(resolved)
    }

    /// Elements a repeat anchor enumerates.
    pub fn elements<'a, 'i>(&self, path: &Path, element: Node<'a, 'i>) -> Vec<Node<'a, 'i>> {
        path.select(element)
    }

    /// One flattened record per element the flatten-all path matches.
    pub fn subtrees(&self, path: &Path, element: Node<'_, '_>) -> Vec<FlatRecord> {
        path.select(element)
            .into_iter()
            .map(|parent| flatten_element(parent, self.max_key_length))
            .collect()
    }

    fn first_single_match(
        &self,
        alternatives: &[Query],
        element: Node<'_, '_>,
    ) -> Option<ChainMatch> {
        alternatives
            .iter()
            .enumerate()
            .find_map(|(index, query)| match query.select(element).as_slice() {
                [winner] => Some(ChainMatch {
                    alternative: index,
                    discriminator: self
                        .discriminator
                        .attribute_of(*winner)
                        .map(str::to_string),
                    text: winner.text().map(str::to_string),
                }),
                _ => None,
            })
    }
}

fn texts(query: &Query, element: Node<'_, '_>) -> Vec<Option<String>> {
    query
        .select(element)
        .into_iter()
        .map(|node| node.text().map(str::to_string))
        .collect()
}

/// Direct lookup on the context element, else the first owning element that
/// carries the attribute.
fn attribute_value(owner: Option<&Path>, attribute: &QName, element: Node<'_, '_>) -> Option<String> {
    let value = match owner {
        None => attribute.attribute_of(element),
        Some(path) => path
            .select(element)
            .into_iter()
            .find_map(|node| attribute.attribute_of(node)),
    };
    value.map(str::to_string)
}
