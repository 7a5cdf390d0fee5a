//! Namespace-aware child-step queries evaluated against `roxmltree` nodes.
//!
//! A [`Path`] is a chain of child steps (`wd:A/wd:B[@wd:type='X']`); a
//! [`Query`] is a union of paths whose matches come back in document order.

use roxmltree::Node;

/// A namespace-qualified name. `namespace == None` means "no namespace".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    fn matches_element(&self, node: Node<'_, '_>) -> bool {
        let tag = node.tag_name();
        tag.name() == self.local && tag.namespace() == self.namespace.as_deref()
    }

    /// Looks the attribute up on `node`.
    pub fn attribute_of<'a>(&self, node: Node<'a, '_>) -> Option<&'a str> {
        match self.namespace.as_deref() {
            Some(uri) => node.attribute((uri, self.local.as_str())),
            None => node.attribute(self.local.as_str()),
        }
    }
}

/// Which elements a step accepts before predicates run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Named(QName),
    /// Any element in the given namespace (`wd:*`).
    AnyIn(Option<String>),
    /// Any element, whatever its namespace (`*`).
    Any,
}

impl NameTest {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        match self {
            Self::Named(name) => name.matches_element(node),
            Self::AnyIn(namespace) => node.tag_name().namespace() == namespace.as_deref(),
            Self::Any => node.is_element(),
        }
    }
}

/// What a case-insensitive `contains` predicate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainsSubject {
    Attribute(QName),
    Text,
    LocalName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    AttributeEquals { attribute: QName, value: String },
    HasAttribute(QName),
    /// 1-based position among the candidates that survived earlier predicates.
    Position(usize),
    /// `term` is stored lowercased.
    Contains { subject: ContainsSubject, term: String },
}

impl Predicate {
    fn accepts(&self, node: Node<'_, '_>) -> bool {
        match self {
            Self::AttributeEquals { attribute, value } => {
                attribute.attribute_of(node) == Some(value.as_str())
            }
            Self::HasAttribute(attribute) => attribute.attribute_of(node).is_some(),
            Self::Position(_) => true,
            Self::Contains { subject, term } => {
                let haystack = match subject {
                    ContainsSubject::Attribute(attribute) => attribute.attribute_of(node),
                    ContainsSubject::Text => node.text(),
                    ContainsSubject::LocalName => Some(node.tag_name().name()),
                };
                haystack.is_some_and(|value| value.to_lowercase().contains(term.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub test: NameTest,
    pub predicates: Vec<Predicate>,
}

impl Step {
    pub fn named(name: QName) -> Self {
        Self {
            test: NameTest::Named(name),
            predicates: Vec::new(),
        }
    }

    fn select_children<'a, 'i>(&self, parent: Node<'a, 'i>, out: &mut Vec<Node<'a, 'i>>) {
        let mut candidates: Vec<Node<'a, 'i>> = parent
            .children()
            .filter(|child| child.is_element() && self.test.matches(*child))
            .collect();
        for predicate in &self.predicates {
            candidates = match predicate {
                Predicate::Position(position) => candidates
                    .get(position.wrapping_sub(1))
                    .copied()
                    .into_iter()
                    .collect(),
                other => candidates
                    .into_iter()
                    .filter(|node| other.accepts(*node))
                    .collect(),
            };
        }
        out.extend(candidates);
    }
}

/// A chain of child steps relative to a context element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub steps: Vec<Step>,
}

impl Path {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Elements reached from `context`, in document order.
    ///
    /// An empty path selects the context element itself.
    pub fn select<'a, 'i>(&self, context: Node<'a, 'i>) -> Vec<Node<'a, 'i>> {
        let mut current = vec![context];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in current {
                step.select_children(node, &mut next);
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }
}

/// A union of paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub branches: Vec<Path>,
}

impl Query {
    pub fn single(path: Path) -> Self {
        Self {
            branches: vec![path],
        }
    }

    pub fn union(branches: Vec<Path>) -> Self {
        Self { branches }
    }

    pub fn select<'a, 'i>(&self, context: Node<'a, 'i>) -> Vec<Node<'a, 'i>> {
        match self.branches.as_slice() {
            [path] => path.select(context),
            branches => {
                let mut nodes: Vec<Node<'a, 'i>> =
                    branches.iter().flat_map(|path| path.select(context)).collect();
                nodes.sort_by_key(|node| node.id().get());
                nodes.dedup_by_key(|node| node.id());
                nodes
            }
        }
    }
}
