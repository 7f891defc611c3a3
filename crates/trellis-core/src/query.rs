//! Composable element predicates for document-order queries.
//!
//! Predicates cover the selector forms the engine needs: attribute presence,
//! attribute equality, the activation marker, and conjunction. They are
//! deliberately not a general selector language.

use crate::element::ElementData;

/// A predicate over elements, evaluated by [`crate::Tree::query_all`].
///
/// ```
/// use trellis_core::Predicate;
///
/// // [data-view][role=group] with the active marker set
/// let p = Predicate::has_attr("data-view")
///     .and(Predicate::attr_eq("role", "group"))
///     .and(Predicate::active());
/// # let _ = p;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The attribute is present, with any value.
    HasAttr(String),
    /// The attribute is present and equals the value exactly.
    AttrEq(String, String),
    /// The activation marker is set.
    Active,
    /// All inner predicates match.
    All(Vec<Predicate>),
}

impl Predicate {
    /// Match elements carrying the named attribute.
    pub fn has_attr(name: impl Into<String>) -> Self {
        Self::HasAttr(name.into())
    }

    /// Match elements whose named attribute equals `value`.
    pub fn attr_eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttrEq(name.into(), value.into())
    }

    /// Match elements with the activation marker set.
    pub fn active() -> Self {
        Self::Active
    }

    /// Combine with another predicate; both must match.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::All(mut inner) => {
                inner.push(other);
                Self::All(inner)
            }
            first => Self::All(vec![first, other]),
        }
    }

    pub(crate) fn matches(&self, data: &ElementData) -> bool {
        match self {
            Self::HasAttr(name) => data.attrs.contains_key(name),
            Self::AttrEq(name, value) => data.attrs.get(name).is_some_and(|v| v == value),
            Self::Active => data.active,
            Self::All(inner) => inner.iter().all(|p| p.matches(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn query_filters_and_preserves_document_order() {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        let a = tree.create_element(Some(root)).unwrap();
        let b = tree.create_element(Some(root)).unwrap();
        let c = tree.create_element(Some(b)).unwrap();

        tree.set_attr(a, "data-operator", "select").unwrap();
        tree.set_attr(c, "data-operator", "select").unwrap();
        tree.set_attr(b, "data-operator", "other").unwrap();

        let hits = tree.query_all(root, &Predicate::has_attr("data-operator"));
        assert_eq!(hits, vec![a, b, c]);

        let hits = tree.query_all(root, &Predicate::attr_eq("data-operator", "select"));
        assert_eq!(hits, vec![a, c]);
    }

    #[test]
    fn conjunction_requires_all_terms() {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        let a = tree.create_element(Some(root)).unwrap();
        let b = tree.create_element(Some(root)).unwrap();

        tree.set_attr(a, "data-view", "nav").unwrap();
        tree.set_attr(b, "data-view", "nav").unwrap();
        tree.set_active(b, true).unwrap();

        let p = Predicate::has_attr("data-view").and(Predicate::active());
        assert_eq!(tree.query_all(root, &p), vec![b]);
    }

    #[test]
    fn scope_is_excluded_from_results() {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        tree.set_attr(root, "data-view", "nav").unwrap();
        assert!(tree.query_all(root, &Predicate::has_attr("data-view")).is_empty());
    }
}
