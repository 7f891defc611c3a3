//! Arena-backed element tree.
//!
//! The tree is the structural collaborator the engine dispatches against:
//! parent/child links, declarative attributes, and the two visibility
//! markers (`active` for view activation, `hidden` for toggled panels).
//!
//! [`Tree`] is a cheap-to-clone shared handle; all mutation goes through an
//! internal `RwLock`. Locks are only held across individual operations, never
//! across application callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::SlotMap;

use crate::element::{ElementData, ElementId};
use crate::error::{TreeError, TreeResult};
use crate::query::Predicate;

/// The single-owner element store.
///
/// Most callers use the shared [`Tree`] handle instead; this type is exposed
/// for hosts that want to drive the store without locking.
pub struct TreeStore {
    elements: SlotMap<ElementId, ElementData>,
}

impl TreeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            elements: SlotMap::with_key(),
        }
    }

    /// Create a new element, optionally attached under a parent.
    pub fn create_element(&mut self, parent: Option<ElementId>) -> TreeResult<ElementId> {
        if let Some(parent_id) = parent {
            if !self.elements.contains_key(parent_id) {
                return Err(TreeError::InvalidElementId);
            }
        }
        let id = self.elements.insert(ElementData::new());
        if let Some(parent_id) = parent {
            self.elements[id].parent = Some(parent_id);
            self.elements[parent_id].children.push(id);
        }
        tracing::trace!(target: "trellis_core::tree", ?id, ?parent, "created element");
        Ok(id)
    }

    /// Remove an element and all its descendants.
    pub fn remove(&mut self, id: ElementId) -> TreeResult<()> {
        let descendants = self.collect_descendants(id)?;
        tracing::trace!(target: "trellis_core::tree", ?id, descendant_count = descendants.len(), "removing element subtree");

        if let Some(data) = self.elements.get(id) {
            if let Some(parent_id) = data.parent {
                if let Some(parent_data) = self.elements.get_mut(parent_id) {
                    parent_data.children.retain(|&child| child != id);
                }
            }
        }

        for child_id in descendants {
            self.elements.remove(child_id);
        }
        self.elements.remove(id);
        Ok(())
    }

    fn collect_descendants(&self, id: ElementId) -> TreeResult<Vec<ElementId>> {
        let mut result = Vec::new();
        self.collect_descendants_recursive(id, &mut result)?;
        Ok(result)
    }

    fn collect_descendants_recursive(
        &self,
        id: ElementId,
        result: &mut Vec<ElementId>,
    ) -> TreeResult<()> {
        let data = self.elements.get(id).ok_or(TreeError::InvalidElementId)?;
        for &child_id in &data.children {
            self.collect_descendants_recursive(child_id, result)?;
            result.push(child_id);
        }
        Ok(())
    }

    /// Check if an element exists.
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Re-attach an element under a new parent (or detach with `None`).
    ///
    /// Rejects attachments that would make an element its own ancestor.
    pub fn set_parent(&mut self, id: ElementId, new_parent: Option<ElementId>) -> TreeResult<()> {
        if !self.elements.contains_key(id) {
            return Err(TreeError::InvalidElementId);
        }
        if let Some(parent_id) = new_parent {
            if !self.elements.contains_key(parent_id) {
                return Err(TreeError::InvalidElementId);
            }
            if self.is_ancestor_of(id, parent_id) {
                return Err(TreeError::CircularParentage);
            }
        }

        let old_parent = self.elements.get(id).and_then(|d| d.parent);
        if let Some(old_parent_id) = old_parent {
            if let Some(parent_data) = self.elements.get_mut(old_parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
        }
        if let Some(data) = self.elements.get_mut(id) {
            data.parent = new_parent;
        }
        if let Some(parent_id) = new_parent {
            if let Some(parent_data) = self.elements.get_mut(parent_id) {
                parent_data.children.push(id);
            }
        }
        Ok(())
    }

    fn is_ancestor_of(&self, potential_ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return true;
            }
            current = self.elements.get(current_id).and_then(|d| d.parent);
        }
        false
    }

    /// Get the parent of an element.
    pub fn parent(&self, id: ElementId) -> TreeResult<Option<ElementId>> {
        self.elements
            .get(id)
            .map(|d| d.parent)
            .ok_or(TreeError::InvalidElementId)
    }

    /// Get the children of an element in document order.
    pub fn children(&self, id: ElementId) -> TreeResult<&[ElementId]> {
        self.elements
            .get(id)
            .map(|d| d.children.as_slice())
            .ok_or(TreeError::InvalidElementId)
    }

    /// Get all ancestors of an element from immediate parent to root.
    pub fn ancestors(&self, id: ElementId) -> TreeResult<Vec<ElementId>> {
        if !self.elements.contains_key(id) {
            return Err(TreeError::InvalidElementId);
        }
        let mut result = Vec::new();
        let mut current = self.elements.get(id).and_then(|d| d.parent);
        while let Some(current_id) = current {
            result.push(current_id);
            current = self.elements.get(current_id).and_then(|d| d.parent);
        }
        Ok(result)
    }

    /// Check whether `id` lies in the subtree rooted at `ancestor`.
    ///
    /// An element is considered a descendant of itself.
    pub fn is_descendant_of(&self, id: ElementId, ancestor: ElementId) -> bool {
        self.is_ancestor_of(ancestor, id)
    }

    /// Depth-first pre-order traversal starting at (and including) `id`.
    ///
    /// This is document order for the subtree.
    pub fn document_order(&self, id: ElementId) -> TreeResult<Vec<ElementId>> {
        let mut result = Vec::new();
        self.document_order_recursive(id, &mut result)?;
        Ok(result)
    }

    fn document_order_recursive(
        &self,
        id: ElementId,
        result: &mut Vec<ElementId>,
    ) -> TreeResult<()> {
        let data = self.elements.get(id).ok_or(TreeError::InvalidElementId)?;
        result.push(id);
        for &child_id in &data.children {
            self.document_order_recursive(child_id, result)?;
        }
        Ok(())
    }

    /// Iterate over all root elements (elements with no parent).
    pub fn roots(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Get the number of elements in the store.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Get a declarative attribute value.
    pub fn attr(&self, id: ElementId, name: &str) -> TreeResult<Option<&str>> {
        let data = self.elements.get(id).ok_or(TreeError::InvalidElementId)?;
        Ok(data.attrs.get(name).map(|s| s.as_str()))
    }

    /// Set a declarative attribute.
    pub fn set_attr(
        &mut self,
        id: ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        let data = self.elements.get_mut(id).ok_or(TreeError::InvalidElementId)?;
        data.attrs.insert(name.into(), value.into());
        Ok(())
    }

    /// Remove a declarative attribute. Returns the previous value, if any.
    pub fn remove_attr(&mut self, id: ElementId, name: &str) -> TreeResult<Option<String>> {
        let data = self.elements.get_mut(id).ok_or(TreeError::InvalidElementId)?;
        Ok(data.attrs.remove(name))
    }

    /// Check whether an attribute is present.
    pub fn has_attr(&self, id: ElementId, name: &str) -> bool {
        self.elements
            .get(id)
            .is_some_and(|d| d.attrs.contains_key(name))
    }

    /// Split a space-separated attribute into its tokens.
    ///
    /// Missing attribute yields an empty list.
    pub fn attr_tokens(&self, id: ElementId, name: &str) -> Vec<String> {
        self.elements
            .get(id)
            .and_then(|d| d.attrs.get(name))
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Visibility markers
    // =========================================================================

    /// Check the activation marker.
    pub fn is_active(&self, id: ElementId) -> bool {
        self.elements.get(id).is_some_and(|d| d.active)
    }

    /// Set or clear the activation marker.
    pub fn set_active(&mut self, id: ElementId, active: bool) -> TreeResult<()> {
        let data = self.elements.get_mut(id).ok_or(TreeError::InvalidElementId)?;
        data.active = active;
        Ok(())
    }

    /// Check the hidden marker.
    pub fn is_hidden(&self, id: ElementId) -> bool {
        self.elements.get(id).is_some_and(|d| d.hidden)
    }

    /// Set or clear the hidden marker.
    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) -> TreeResult<()> {
        let data = self.elements.get_mut(id).ok_or(TreeError::InvalidElementId)?;
        data.hidden = hidden;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Find descendants of `scope` matching `predicate`, in document order.
    ///
    /// `scope` itself is never part of the result.
    pub fn query_all(&self, scope: ElementId, predicate: &Predicate) -> Vec<ElementId> {
        let Ok(order) = self.document_order(scope) else {
            return Vec::new();
        };
        order
            .into_iter()
            .skip(1)
            .filter(|&id| {
                self.elements
                    .get(id)
                    .is_some_and(|data| predicate.matches(data))
            })
            .collect()
    }

    /// Find the first descendant of `scope` whose `id` attribute equals `name`.
    pub fn find_by_element_id(&self, scope: ElementId, name: &str) -> Option<ElementId> {
        self.query_all(scope, &Predicate::attr_eq("id", name))
            .into_iter()
            .next()
    }
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A cheap-to-clone shared handle onto a [`TreeStore`].
///
/// Clones refer to the same underlying tree. Reads take a shared lock,
/// mutations an exclusive one.
#[derive(Clone)]
pub struct Tree {
    inner: Arc<RwLock<TreeStore>>,
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(TreeStore::new())),
        }
    }

    /// Create a new element, optionally attached under a parent.
    pub fn create_element(&self, parent: Option<ElementId>) -> TreeResult<ElementId> {
        self.inner.write().create_element(parent)
    }

    /// Remove an element and all its descendants.
    pub fn remove(&self, id: ElementId) -> TreeResult<()> {
        self.inner.write().remove(id)
    }

    /// Check if an element exists.
    pub fn contains(&self, id: ElementId) -> bool {
        self.inner.read().contains(id)
    }

    /// Re-attach an element under a new parent (or detach with `None`).
    pub fn set_parent(&self, id: ElementId, parent: Option<ElementId>) -> TreeResult<()> {
        self.inner.write().set_parent(id, parent)
    }

    /// Get the parent of an element.
    pub fn parent(&self, id: ElementId) -> TreeResult<Option<ElementId>> {
        self.inner.read().parent(id)
    }

    /// Get the children of an element (owned for lock hygiene).
    pub fn children(&self, id: ElementId) -> TreeResult<Vec<ElementId>> {
        self.inner.read().children(id).map(|c| c.to_vec())
    }

    /// Get all ancestors of an element from immediate parent to root.
    pub fn ancestors(&self, id: ElementId) -> TreeResult<Vec<ElementId>> {
        self.inner.read().ancestors(id)
    }

    /// Check whether `id` lies in the subtree rooted at `ancestor`.
    pub fn is_descendant_of(&self, id: ElementId, ancestor: ElementId) -> bool {
        self.inner.read().is_descendant_of(id, ancestor)
    }

    /// Document-order traversal of the subtree rooted at `id` (inclusive).
    pub fn document_order(&self, id: ElementId) -> TreeResult<Vec<ElementId>> {
        self.inner.read().document_order(id)
    }

    /// Get all root elements.
    pub fn roots(&self) -> Vec<ElementId> {
        self.inner.read().roots().collect()
    }

    /// Get the number of elements in the tree.
    pub fn element_count(&self) -> usize {
        self.inner.read().element_count()
    }

    /// Get a declarative attribute value (owned).
    pub fn attr(&self, id: ElementId, name: &str) -> Option<String> {
        self.inner
            .read()
            .attr(id, name)
            .ok()
            .flatten()
            .map(str::to_string)
    }

    /// Set a declarative attribute.
    pub fn set_attr(
        &self,
        id: ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        self.inner.write().set_attr(id, name, value)
    }

    /// Remove a declarative attribute.
    pub fn remove_attr(&self, id: ElementId, name: &str) -> TreeResult<Option<String>> {
        self.inner.write().remove_attr(id, name)
    }

    /// Check whether an attribute is present.
    pub fn has_attr(&self, id: ElementId, name: &str) -> bool {
        self.inner.read().has_attr(id, name)
    }

    /// Split a space-separated attribute into its tokens.
    pub fn attr_tokens(&self, id: ElementId, name: &str) -> Vec<String> {
        self.inner.read().attr_tokens(id, name)
    }

    /// Check the activation marker.
    pub fn is_active(&self, id: ElementId) -> bool {
        self.inner.read().is_active(id)
    }

    /// Set or clear the activation marker.
    pub fn set_active(&self, id: ElementId, active: bool) -> TreeResult<()> {
        self.inner.write().set_active(id, active)
    }

    /// Check the hidden marker.
    pub fn is_hidden(&self, id: ElementId) -> bool {
        self.inner.read().is_hidden(id)
    }

    /// Set or clear the hidden marker.
    pub fn set_hidden(&self, id: ElementId, hidden: bool) -> TreeResult<()> {
        self.inner.write().set_hidden(id, hidden)
    }

    /// Find descendants of `scope` matching `predicate`, in document order.
    pub fn query_all(&self, scope: ElementId, predicate: &Predicate) -> Vec<ElementId> {
        self.inner.read().query_all(scope, predicate)
    }

    /// Find the first descendant of `scope` whose `id` attribute equals `name`.
    pub fn find_by_element_id(&self, scope: ElementId, name: &str) -> Option<ElementId> {
        self.inner.read().find_by_element_id(scope, name)
    }

    /// Access the store with a read lock for compound queries.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&TreeStore) -> R,
    {
        f(&self.inner.read())
    }

    /// Access the store with a write lock for compound mutations.
    pub fn with_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut TreeStore) -> R,
    {
        f(&mut self.inner.write())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> (Tree, ElementId, ElementId, ElementId) {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        let child = tree.create_element(Some(root)).unwrap();
        let grandchild = tree.create_element(Some(child)).unwrap();
        (tree, root, child, grandchild)
    }

    #[test]
    fn create_and_parentage() {
        let (tree, root, child, grandchild) = small_tree();
        assert_eq!(tree.parent(root).unwrap(), None);
        assert_eq!(tree.parent(child).unwrap(), Some(root));
        assert_eq!(tree.ancestors(grandchild).unwrap(), vec![child, root]);
        assert!(tree.is_descendant_of(grandchild, root));
        assert!(tree.is_descendant_of(root, root));
        assert!(!tree.is_descendant_of(root, child));
    }

    #[test]
    fn circular_parentage_rejected() {
        let (tree, root, _, grandchild) = small_tree();
        assert_eq!(
            tree.set_parent(root, Some(grandchild)),
            Err(TreeError::CircularParentage)
        );
    }

    #[test]
    fn remove_cascades() {
        let (tree, root, child, grandchild) = small_tree();
        tree.remove(child).unwrap();
        assert!(tree.contains(root));
        assert!(!tree.contains(child));
        assert!(!tree.contains(grandchild));
        assert!(tree.children(root).unwrap().is_empty());
    }

    #[test]
    fn document_order_is_preorder() {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        let a = tree.create_element(Some(root)).unwrap();
        let a1 = tree.create_element(Some(a)).unwrap();
        let b = tree.create_element(Some(root)).unwrap();
        assert_eq!(tree.document_order(root).unwrap(), vec![root, a, a1, b]);
    }

    #[test]
    fn attr_tokens_split_on_whitespace() {
        let (tree, root, _, _) = small_tree();
        tree.set_attr(root, "data-view", "nav  detail").unwrap();
        assert_eq!(tree.attr_tokens(root, "data-view"), vec!["nav", "detail"]);
        assert!(tree.attr_tokens(root, "data-events").is_empty());
    }

    #[test]
    fn markers_default_off() {
        let (tree, root, _, _) = small_tree();
        assert!(!tree.is_active(root));
        assert!(!tree.is_hidden(root));
        tree.set_active(root, true).unwrap();
        tree.set_hidden(root, true).unwrap();
        assert!(tree.is_active(root));
        assert!(tree.is_hidden(root));
    }

    #[test]
    fn invalid_ids_are_errors() {
        let (tree, root, child, _) = small_tree();
        tree.remove(child).unwrap();
        assert_eq!(tree.parent(child), Err(TreeError::InvalidElementId));
        assert_eq!(tree.set_active(child, true), Err(TreeError::InvalidElementId));
        assert_eq!(
            tree.set_parent(child, Some(root)),
            Err(TreeError::InvalidElementId)
        );
    }
}
