//! Event path resolution.
//!
//! Reconstructs the element chain an interaction travelled through and picks
//! the element whose declarative attributes drive dispatch.

use trellis_core::{ElementId, InputEvent, Tree};

use crate::contract;

/// The chain of elements an event travelled through, origin first.
///
/// A host-provided path on the event is used verbatim. Otherwise the chain is
/// rebuilt by walking parent links from the origin up to and including the
/// capture point; a broken parent link ends the walk early, and an event with
/// no capture point resolves to its origin alone.
pub fn resolve_path(tree: &Tree, event: &InputEvent) -> Vec<ElementId> {
    if let Some(path) = event.path() {
        return path.to_vec();
    }
    let mut path = vec![event.origin()];
    let Some(capture) = event.capture() else {
        return path;
    };
    let mut cursor = event.origin();
    while cursor != capture {
        match tree.parent(cursor) {
            Ok(Some(parent)) => {
                path.push(parent);
                cursor = parent;
            }
            _ => break,
        }
    }
    path
}

/// The element dispatch reads its operator from.
///
/// Scans the event path origin-outward for the first element carrying a
/// `data-operator` or `data-toggle` attribute. When none does, the capture
/// point (or, lacking one, the origin) stands in so dispatch can still fall
/// back to the event-type-named member.
pub fn find_operator_element(tree: &Tree, event: &InputEvent) -> ElementId {
    resolve_path(tree, event)
        .into_iter()
        .find(|&el| {
            tree.has_attr(el, contract::OPERATOR) || tree.has_attr(el, contract::TOGGLE)
        })
        .unwrap_or_else(|| event.capture().unwrap_or_else(|| event.origin()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(tree: &Tree, len: usize) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(len);
        let mut parent = None;
        for _ in 0..len {
            let el = tree.create_element(parent).unwrap();
            out.push(el);
            parent = Some(el);
        }
        out
    }

    #[test]
    fn walks_origin_to_capture_inclusive() {
        let tree = Tree::new();
        let els = chain(&tree, 4);
        let event = InputEvent::new("click", els[3]).with_capture(els[1]);
        assert_eq!(resolve_path(&tree, &event), vec![els[3], els[2], els[1]]);
    }

    #[test]
    fn origin_only_without_capture() {
        let tree = Tree::new();
        let els = chain(&tree, 2);
        let event = InputEvent::new("click", els[1]);
        assert_eq!(resolve_path(&tree, &event), vec![els[1]]);
    }

    #[test]
    fn detached_capture_ends_walk_at_root() {
        let tree = Tree::new();
        let els = chain(&tree, 3);
        let stranger = tree.create_element(None).unwrap();
        let event = InputEvent::new("click", els[2]).with_capture(stranger);
        assert_eq!(resolve_path(&tree, &event), vec![els[2], els[1], els[0]]);
    }

    #[test]
    fn host_path_is_used_verbatim() {
        let tree = Tree::new();
        let els = chain(&tree, 3);
        let event = InputEvent::new("click", els[2])
            .with_capture(els[0])
            .with_path(vec![els[2], els[0]]);
        assert_eq!(resolve_path(&tree, &event), vec![els[2], els[0]]);
    }

    #[test]
    fn nearest_operator_carrier_wins() {
        let tree = Tree::new();
        let els = chain(&tree, 4);
        tree.set_attr(els[1], contract::OPERATOR, "outer_op").unwrap();
        tree.set_attr(els[2], contract::TOGGLE, "").unwrap();
        let event = InputEvent::new("click", els[3]).with_capture(els[0]);
        assert_eq!(find_operator_element(&tree, &event), els[2]);
    }

    #[test]
    fn capture_stands_in_when_nothing_carries_an_operator() {
        let tree = Tree::new();
        let els = chain(&tree, 3);
        let event = InputEvent::new("click", els[2]).with_capture(els[0]);
        assert_eq!(find_operator_element(&tree, &event), els[0]);

        let bare = InputEvent::new("click", els[2]);
        assert_eq!(find_operator_element(&tree, &bare), els[2]);
    }
}
