//! View lifecycle.
//!
//! Every registered view composes application delegates over the [`CoreView`]
//! base, which contributes the lifecycle member set and the tab-switching
//! `toggle` operator. The transition sequences themselves (`open`, `close`,
//! `refresh`) live here as crate-internal functions the registry drives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use trellis_core::{ElementId, Predicate, Tree};

use crate::compose::{Composed, Delegate, Value, ViewCx, ViewOps};
use crate::contract;
use crate::logging::targets;
use crate::registry::ViewRegistry;

/// Members every composed view answers to, contributed by [`CoreView`].
///
/// These names are write-protected on the composed facade; delegates layer
/// over them but cannot replace them wholesale.
pub const BASE_MEMBERS: &[&str] = &[
    "open",
    "close",
    "refresh",
    "update",
    "reset",
    "prepare",
    "active",
    "change_to",
    "open_view",
    "toggle",
];

/// The base delegate at the bottom of every composed view.
///
/// Lifecycle requests (`open`, `close`, `refresh`) are forwarded to the host
/// so the full transition sequence runs; `prepare`, `reset` and `update` are
/// placeholder hooks for delegates to layer over. `change_to`, `open_view`
/// and `toggle` are link-following operators reading their target from the
/// invocation element.
pub struct CoreView;

impl Delegate for CoreView {
    fn provides(&self, member: &str) -> bool {
        BASE_MEMBERS.contains(&member)
    }

    fn invoke(&mut self, member: &str, cx: &mut ViewCx<'_>) -> Value {
        match member {
            "open" => {
                cx.open();
                Value::Null
            }
            "close" => {
                cx.close();
                Value::Null
            }
            "refresh" => {
                cx.refresh();
                Value::Null
            }
            "active" => Value::Bool(cx.is_active()),
            "change_to" => {
                if let Some(target) = element_link(cx) {
                    cx.change_to(&target);
                }
                Value::Null
            }
            "open_view" => {
                if let Some(target) = element_link(cx) {
                    cx.open_view(&target);
                }
                Value::Null
            }
            "toggle" => {
                toggle(cx);
                Value::Null
            }
            // prepare / reset / update are hooks with no base behavior.
            _ => Value::Null,
        }
    }
}

/// The link an element points at: `aria-controls`, else `href` with a
/// leading `#` stripped. Empty links count as absent.
pub(crate) fn link_of(tree: &Tree, el: ElementId) -> Option<String> {
    tree.attr(el, contract::CONTROLS)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            tree.attr(el, contract::HREF)
                .map(|v| v.trim_start_matches('#').to_owned())
                .filter(|v| !v.is_empty())
        })
}

fn element_link(cx: &ViewCx<'_>) -> Option<String> {
    cx.element().and_then(|el| link_of(cx.tree(), el))
}

/// Switch the visible panel within a tab group.
///
/// Scope is the nearest `role="tablist"` ancestor of the trigger, falling
/// back to the view root. Every toggle control in scope loses its active
/// marker and has its linked panel hidden; then the trigger's panel is
/// revealed and the trigger marked active. Panels are located by `id` within
/// the view root.
pub(crate) fn toggle(cx: &mut ViewCx<'_>) {
    let Some(trigger) = cx.element() else { return };
    let tree = cx.tree().clone();
    let Some(target) = link_of(&tree, trigger) else { return };

    let mut scope = cx.root();
    if let Ok(ancestors) = tree.ancestors(trigger) {
        for anc in ancestors {
            if tree.attr(anc, contract::ROLE).as_deref() == Some(contract::ROLE_TABLIST) {
                scope = anc;
                break;
            }
            if anc == cx.root() {
                break;
            }
        }
    }

    for control in tree.query_all(scope, &Predicate::has_attr(contract::TOGGLE)) {
        if let Some(panel) = link_of(&tree, control) {
            cx.hide_id(&panel);
        }
        let _ = tree.set_active(control, false);
    }
    cx.show_id(&target);
    let _ = tree.set_active(trigger, true);
    tracing::debug!(target: targets::VIEW, view = cx.view_id(), panel = %target, "toggled panel");
}

/// A registered view: identity, root element, composed behavior and the
/// per-view data bag.
pub struct ViewEntry {
    id: String,
    root: ElementId,
    modules: Vec<String>,
    always: Vec<String>,
    composed: Composed,
    data: Mutex<HashMap<String, Value>>,
    // Raised while an open sequence is in flight; a transition triggered by
    // one of the hooks lowers it, telling the sequence to stand down before
    // the durable marker is ever set.
    transitioning: AtomicBool,
}

impl ViewEntry {
    pub(crate) fn new(
        id: String,
        root: ElementId,
        modules: Vec<String>,
        always: Vec<String>,
        composed: Composed,
    ) -> Self {
        Self {
            id,
            root,
            modules,
            always,
            composed,
            data: Mutex::new(HashMap::new()),
            transitioning: AtomicBool::new(false),
        }
    }

    /// The view's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The view's root element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Behavior-module names declared on the root, in composition order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Event types dispatched to this view even while inactive.
    pub fn always(&self) -> &[String] {
        &self.always
    }

    /// The composed behavior facade.
    pub fn composed(&self) -> &Composed {
        &self.composed
    }

    /// Whether the view is active: either its root carries the durable
    /// marker or an open sequence is currently in flight.
    pub fn is_active(&self, tree: &Tree) -> bool {
        tree.is_active(self.root) || self.transitioning.load(Ordering::Relaxed)
    }

    pub(crate) fn cx<'a>(&'a self, tree: &'a Tree, ops: &'a dyn ViewOps) -> ViewCx<'a> {
        ViewCx::new(&self.id, self.root, tree, ops, &self.data)
    }

    pub(crate) fn data_bag(&self) -> &Mutex<HashMap<String, Value>> {
        &self.data
    }

    pub(crate) fn seed_data(&self, data: HashMap<String, Value>) {
        *self.data.lock() = data;
    }

    fn in_transition(&self) -> bool {
        self.transitioning.load(Ordering::Relaxed)
    }
}

/// Run the open sequence: seed the data bag, raise the transition flag, run
/// `prepare` then `reset`/`update`, and set the durable marker only if no
/// hook redirected elsewhere in the meantime.
pub(crate) fn open(reg: &ViewRegistry, entry: &ViewEntry, data: Option<HashMap<String, Value>>) {
    let tree = reg.tree();
    if entry.is_active(&tree) {
        return;
    }
    tracing::debug!(target: targets::VIEW, view = entry.id(), "opening");

    entry.seed_data(data.unwrap_or_default());
    entry.transitioning.store(true, Ordering::Relaxed);

    entry.composed.call("prepare", &mut entry.cx(&tree, reg));
    if !entry.in_transition() {
        tracing::debug!(target: targets::VIEW, view = entry.id(), "open redirected during prepare");
        return;
    }

    entry.composed.call("reset", &mut entry.cx(&tree, reg));
    if !entry.in_transition() {
        return;
    }
    entry.composed.call("update", &mut entry.cx(&tree, reg));
    if !entry.in_transition() {
        return;
    }

    let _ = tree.set_active(entry.root, true);
    entry.transitioning.store(false, Ordering::Relaxed);
}

/// Run the close sequence: clear the marker (and any in-flight transition),
/// cascade into active descendant views, then run the `reset` hook.
pub(crate) fn close(reg: &ViewRegistry, entry: &ViewEntry) {
    let tree = reg.tree();
    if !entry.is_active(&tree) {
        return;
    }
    tracing::debug!(target: targets::VIEW, view = entry.id(), "closing");

    entry.transitioning.store(false, Ordering::Relaxed);
    let _ = tree.set_active(entry.root, false);
    reg.close_descendants(entry.root);
    entry.composed.call("reset", &mut entry.cx(&tree, reg));
}

/// Re-run `reset` then `update` on an active view, re-checking activity
/// between the hooks in case `reset` closed or redirected the view.
pub(crate) fn refresh(reg: &ViewRegistry, entry: &ViewEntry) {
    let tree = reg.tree();
    if !entry.is_active(&tree) {
        return;
    }
    entry.composed.call("reset", &mut entry.cx(&tree, reg));
    if !entry.is_active(&tree) {
        return;
    }
    entry.composed.call("update", &mut entry.cx(&tree, reg));
}

/// Background refresh for a view that is *not* on screen: run `reset` and
/// `update` so its content is current the next time it opens.
pub(crate) fn refresh_dormant(reg: &ViewRegistry, entry: &ViewEntry) {
    let tree = reg.tree();
    if entry.is_active(&tree) {
        return;
    }
    entry.composed.call("reset", &mut entry.cx(&tree, reg));
    entry.composed.call("update", &mut entry.cx(&tree, reg));
}

/// Background update for a view that is *not* on screen.
pub(crate) fn update_dormant(reg: &ViewRegistry, entry: &ViewEntry) {
    let tree = reg.tree();
    if entry.is_active(&tree) {
        return;
    }
    entry.composed.call("update", &mut entry.cx(&tree, reg));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::InertOps;

    #[test]
    fn base_member_set_is_stable() {
        let base = CoreView;
        for member in BASE_MEMBERS {
            assert!(base.provides(member), "missing base member {member}");
        }
        assert!(!base.provides("select"));
    }

    #[test]
    fn aria_controls_beats_href() {
        let tree = Tree::new();
        let el = tree.create_element(None).unwrap();
        tree.set_attr(el, contract::HREF, "#from_href").unwrap();
        assert_eq!(link_of(&tree, el), Some("from_href".into()));

        tree.set_attr(el, contract::CONTROLS, "from_controls").unwrap();
        assert_eq!(link_of(&tree, el), Some("from_controls".into()));
    }

    #[test]
    fn empty_links_count_as_absent() {
        let tree = Tree::new();
        let el = tree.create_element(None).unwrap();
        tree.set_attr(el, contract::CONTROLS, "").unwrap();
        tree.set_attr(el, contract::HREF, "#").unwrap();
        assert_eq!(link_of(&tree, el), None);
    }

    #[test]
    fn toggle_switches_panels_within_the_tablist() {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        let tablist = tree.create_element(Some(root)).unwrap();
        tree.set_attr(tablist, contract::ROLE, contract::ROLE_TABLIST)
            .unwrap();

        let mut tabs = Vec::new();
        let mut panels = Vec::new();
        for name in ["pa", "pb"] {
            let tab = tree.create_element(Some(tablist)).unwrap();
            tree.set_attr(tab, contract::TOGGLE, "").unwrap();
            tree.set_attr(tab, contract::CONTROLS, name).unwrap();
            tabs.push(tab);

            let panel = tree.create_element(Some(root)).unwrap();
            tree.set_attr(panel, contract::ID, name).unwrap();
            panels.push(panel);
        }
        let _ = tree.set_active(tabs[0], true);
        let _ = tree.set_hidden(panels[1], true);

        let data = Mutex::new(HashMap::new());
        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data).with_element(tabs[1]);
        toggle(&mut cx);

        assert!(!tree.is_active(tabs[0]));
        assert!(tree.is_active(tabs[1]));
        assert!(tree.is_hidden(panels[0]));
        assert!(!tree.is_hidden(panels[1]));
    }
}
