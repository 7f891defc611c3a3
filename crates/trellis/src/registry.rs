//! The view registry.
//!
//! The registry is the single entry point the host and application modules
//! drive: it discovers view roots in the tree, composes their declared
//! behavior modules over the [`CoreView`](crate::view::CoreView) base, owns
//! the element/event binding table, and routes raw interaction events into
//! operator dispatch.
//!
//! [`ViewRegistry`] is a cheap-to-clone shared handle; clones refer to the
//! same registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::{ElementId, InputEvent, Predicate, Tree, TreeError};

use crate::compose::{ChainPolicy, Composed, Delegate, Value, ViewOps};
use crate::contract;
use crate::dispatch::{DispatchOutcome, Dispatcher, ToggleNaming};
use crate::error::{Error, Result};
use crate::logging::{targets, ViewDebugRow};
use crate::view::{self, CoreView, ViewEntry};

type ModuleFactory = Arc<dyn Fn() -> Box<dyn Delegate> + Send + Sync>;

/// Composition and dispatch knobs, fixed at registry construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryConfig {
    /// How toggle markers translate to operator names.
    pub toggle_naming: ToggleNaming,
    /// Chain policy between application behavior modules. The boundary
    /// between the innermost module and the view base is always
    /// override-with-mandatory-fallthrough so base bookkeeping cannot be
    /// skipped.
    pub delegate_policy: ChainPolicy,
}

struct RegistryInner {
    tree: Tree,
    config: RegistryConfig,
    dispatcher: Dispatcher,
    views: RwLock<HashMap<String, Arc<ViewEntry>>>,
    modules: RwLock<HashMap<String, ModuleFactory>>,
    // (element, event type) -> view id. One handler per element and type;
    // repeated registration must not accumulate duplicates.
    bindings: RwLock<HashMap<(ElementId, String), String>>,
}

/// Shared handle onto the view registry.
#[derive(Clone)]
pub struct ViewRegistry {
    inner: Arc<RegistryInner>,
}

impl ViewRegistry {
    /// Create a registry over `tree` with default configuration.
    pub fn new(tree: Tree) -> Self {
        Self::with_config(tree, RegistryConfig::default())
    }

    /// Create a registry over `tree` with explicit configuration.
    pub fn with_config(tree: Tree, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                tree,
                config,
                dispatcher: Dispatcher::new(config.toggle_naming),
                views: RwLock::new(HashMap::new()),
                modules: RwLock::new(HashMap::new()),
                bindings: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// A handle onto the element tree this registry operates on.
    pub fn tree(&self) -> Tree {
        self.inner.tree.clone()
    }

    /// The configuration the registry was built with.
    pub fn config(&self) -> RegistryConfig {
        self.inner.config
    }

    // =========================================================================
    // Module and view registration
    // =========================================================================

    /// Register a behavior module under `name`.
    ///
    /// The factory produces a fresh delegate per view. Modules may arrive
    /// after views already declared them: every such view is re-composed in
    /// place, keeping its data bag and active state, and its event bindings
    /// are torn down and reinstalled.
    pub fn register_module(
        &self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Delegate> + Send + Sync + 'static,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyModuleName);
        }
        self.inner
            .modules
            .write()
            .insert(name.clone(), Arc::new(factory));
        tracing::debug!(target: targets::REGISTRY, module = %name, "registered behavior module");

        let affected: Vec<Arc<ViewEntry>> = {
            let views = self.inner.views.read();
            views
                .values()
                .filter(|e| e.modules().iter().any(|m| *m == name))
                .cloned()
                .collect()
        };
        for old in affected {
            self.recompose(&old);
        }
        Ok(())
    }

    /// Register the view rooted at `root`.
    ///
    /// Reads the declared module list and always-list from the root's
    /// attributes, composes the modules (declaration order = precedence
    /// order) over the base, stores the entry under the element's `id`
    /// attribute (falling back to the last declared module name), and binds
    /// the subtree's declared events. Registering an already-known
    /// identifier is a no-op. Returns the identifier, or `None` when the
    /// element declares neither an id nor any module.
    pub fn register_view(&self, root: ElementId) -> Result<Option<String>> {
        let tree = &self.inner.tree;
        if !tree.contains(root) {
            return Err(Error::Tree(TreeError::InvalidElementId));
        }
        let modules = tree.attr_tokens(root, contract::VIEW);
        let id = tree
            .attr(root, contract::ID)
            .filter(|v| !v.is_empty())
            .or_else(|| modules.last().cloned());
        let Some(id) = id else {
            tracing::warn!(target: targets::REGISTRY, ?root, "view root has no id and no modules; skipping");
            return Ok(None);
        };
        if self.inner.views.read().contains_key(&id) {
            return Ok(Some(id));
        }

        let always = tree.attr_tokens(root, contract::ALWAYS);
        let composed = self.compose_for(&modules);
        let entry = Arc::new(ViewEntry::new(
            id.clone(),
            root,
            modules,
            always,
            composed,
        ));
        self.inner.views.write().insert(id.clone(), entry.clone());
        self.bind_events(&entry);
        tracing::info!(
            target: targets::REGISTRY,
            view = %id,
            modules = ?entry.modules(),
            "registered view"
        );
        Ok(Some(id))
    }

    /// Register every view root currently in the tree.
    pub fn scan(&self) {
        let predicate = view_root_predicate();
        let tree = &self.inner.tree;
        for top in tree.roots() {
            let mut candidates = Vec::new();
            if tree.has_attr(top, contract::VIEW)
                && tree.attr(top, contract::ROLE).as_deref() == Some(contract::ROLE_GROUP)
            {
                candidates.push(top);
            }
            candidates.extend(tree.query_all(top, &predicate));
            for root in candidates {
                // Individual failures (e.g. roots removed mid-scan) are not
                // fatal to the sweep.
                if let Err(err) = self.register_view(root) {
                    tracing::warn!(target: targets::REGISTRY, ?root, %err, "scan skipped root");
                }
            }
        }
    }

    /// Drop every view and binding, then re-scan the tree.
    ///
    /// For hosts that replace whole subtrees: registered modules survive,
    /// view entries (including data bags) do not.
    pub fn rebuild(&self) {
        self.inner.views.write().clear();
        self.inner.bindings.write().clear();
        tracing::info!(target: targets::REGISTRY, "rebuilding view table");
        self.scan();
    }

    // Compose the declared module list over the base. Unknown module names
    // are skipped so markup can declare modules before the code arrives.
    fn compose_for(&self, modules: &[String]) -> Composed {
        let factories: Vec<Option<ModuleFactory>> = {
            let table = self.inner.modules.read();
            modules.iter().map(|name| table.get(name).cloned()).collect()
        };
        let mut composed = Composed::new(Box::new(CoreView));
        let mut innermost = true;
        // First declared module has highest precedence, so layer from the
        // back of the declaration list outward.
        for (name, factory) in modules.iter().zip(&factories).rev() {
            let Some(factory) = factory else {
                tracing::trace!(target: targets::REGISTRY, module = %name, "module not registered; skipped");
                continue;
            };
            let policy = if innermost {
                ChainPolicy::OuterThenInner
            } else {
                self.inner.config.delegate_policy
            };
            composed = composed.layer(factory(), policy);
            innermost = false;
        }
        composed
    }

    // Re-run composition for a view whose module set changed, preserving
    // its data bag; active state lives on the tree and is untouched.
    fn recompose(&self, old: &Arc<ViewEntry>) {
        let composed = self.compose_for(old.modules());
        let entry = Arc::new(ViewEntry::new(
            old.id().to_owned(),
            old.root(),
            old.modules().to_vec(),
            old.always().to_vec(),
            composed,
        ));
        entry.seed_data(old.data_bag().lock().clone());
        self.inner
            .views
            .write()
            .insert(entry.id().to_owned(), entry.clone());
        self.unbind_view(entry.id());
        self.bind_events(&entry);
        tracing::debug!(target: targets::REGISTRY, view = entry.id(), "re-composed view");
    }

    // Install the view's declared event bindings: always for the root's own
    // event list, and for descendant event lists only when the subtree holds
    // no nested view roots (those bind their own).
    fn bind_events(&self, entry: &Arc<ViewEntry>) {
        let tree = &self.inner.tree;
        let root = entry.root();
        let mut bindings = self.inner.bindings.write();
        for ev in tree.attr_tokens(root, contract::EVENTS) {
            bindings
                .entry((root, ev))
                .or_insert_with(|| entry.id().to_owned());
        }
        if tree.query_all(root, &view_root_predicate()).is_empty() {
            for el in tree.query_all(root, &Predicate::has_attr(contract::EVENTS)) {
                for ev in tree.attr_tokens(el, contract::EVENTS) {
                    bindings
                        .entry((el, ev))
                        .or_insert_with(|| entry.id().to_owned());
                }
            }
        }
    }

    fn unbind_view(&self, id: &str) {
        self.inner.bindings.write().retain(|_, owner| owner != id);
    }

    // =========================================================================
    // Event routing
    // =========================================================================

    /// Route a raw interaction event to the view bound at its capture point
    /// (or origin) and dispatch it.
    pub fn handle_event(&self, event: &InputEvent) -> DispatchOutcome {
        if event.propagation_stopped() {
            return DispatchOutcome::Unbound;
        }
        let event_type = event.event_type().to_owned();
        let id = {
            let bindings = self.inner.bindings.read();
            event
                .capture()
                .and_then(|el| bindings.get(&(el, event_type.clone())).cloned())
                .or_else(|| bindings.get(&(event.origin(), event_type)).cloned())
        };
        let Some(id) = id else {
            tracing::trace!(
                target: targets::DISPATCH,
                event = event.event_type(),
                "no binding for event"
            );
            return DispatchOutcome::Unbound;
        };
        let Some(entry) = self.entry(&id) else {
            return DispatchOutcome::Unbound;
        };
        self.inner
            .dispatcher
            .dispatch(&entry, &self.inner.tree, self, event)
    }

    // =========================================================================
    // Lifecycle fan-out
    // =========================================================================

    /// Open the named view with an empty data bag; no-op if unknown or
    /// already active.
    pub fn open_view(&self, id: &str) {
        self.open_view_with(id, HashMap::new());
    }

    /// Open the named view, seeding its data bag; no-op if unknown or
    /// already active.
    pub fn open_view_with(&self, id: &str, data: HashMap<String, Value>) {
        if let Some(entry) = self.entry(id) {
            view::open(self, &entry, Some(data));
        }
    }

    /// Close the named view; no-op if unknown or already closed.
    pub fn close_view(&self, id: &str) {
        if let Some(entry) = self.entry(id) {
            view::close(self, &entry);
        }
    }

    /// Close every active view whose root lies within `scope` (the whole
    /// tree when `None`).
    pub fn close_all(&self, scope: Option<ElementId>) {
        let tree = &self.inner.tree;
        let mut targets: Vec<Arc<ViewEntry>> = self
            .entries()
            .into_iter()
            .filter(|e| e.is_active(tree))
            .filter(|e| scope.map_or(true, |s| tree.is_descendant_of(e.root(), s)))
            .collect();
        targets.sort_by(|a, b| a.id().cmp(b.id()));
        for entry in targets {
            view::close(self, &entry);
        }
    }

    // Cascade helper for `view::close`: closes active views strictly inside
    // the closing view's subtree.
    pub(crate) fn close_descendants(&self, scope: ElementId) {
        let tree = &self.inner.tree;
        let mut targets: Vec<Arc<ViewEntry>> = self
            .entries()
            .into_iter()
            .filter(|e| e.root() != scope && e.is_active(tree))
            .filter(|e| tree.is_descendant_of(e.root(), scope))
            .collect();
        targets.sort_by(|a, b| a.id().cmp(b.id()));
        for entry in targets {
            view::close(self, &entry);
        }
    }

    /// Run `reset` and `update` on every dormant view so its content is
    /// current when next opened. Active views are left alone; their own
    /// handlers decide when to refresh live.
    pub fn refresh(&self) {
        for entry in self.entries() {
            view::refresh_dormant(self, &entry);
        }
    }

    /// Run `update` on every dormant view.
    pub fn update(&self) {
        for entry in self.entries() {
            view::update_dormant(self, &entry);
        }
    }

    /// Background-refresh a single dormant view; no-op if unknown or active.
    pub fn refresh_view(&self, id: &str) {
        if let Some(entry) = self.entry(id) {
            view::refresh_dormant(self, &entry);
        }
    }

    /// Background-update a single dormant view; no-op if unknown or active.
    pub fn update_view(&self, id: &str) {
        if let Some(entry) = self.entry(id) {
            view::update_dormant(self, &entry);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Identifiers of currently-active views, sorted.
    pub fn active_views(&self) -> Vec<String> {
        let tree = &self.inner.tree;
        let mut ids: Vec<String> = self
            .entries()
            .into_iter()
            .filter(|e| e.is_active(tree))
            .map(|e| e.id().to_owned())
            .collect();
        ids.sort();
        ids
    }

    /// Identifiers of registered views whose root lies within `scope` (all
    /// registered views when `None`), sorted.
    pub fn present_views(&self, scope: Option<ElementId>) -> Vec<String> {
        let tree = &self.inner.tree;
        let mut ids: Vec<String> = self
            .entries()
            .into_iter()
            .filter(|e| scope.map_or(true, |s| tree.is_descendant_of(e.root(), s)))
            .map(|e| e.id().to_owned())
            .collect();
        ids.sort();
        ids
    }

    /// Whether a view is registered, optionally constrained to a subtree.
    pub fn has_view(&self, id: &str, scope: Option<ElementId>) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        scope.map_or(true, |s| self.inner.tree.is_descendant_of(entry.root(), s))
    }

    /// Look up a registered view entry.
    pub fn view(&self, id: &str) -> Option<Arc<ViewEntry>> {
        self.entry(id)
    }

    fn entry(&self, id: &str) -> Option<Arc<ViewEntry>> {
        self.inner.views.read().get(id).cloned()
    }

    // Snapshot of entries; the lock is never held across hook invocations.
    fn entries(&self) -> Vec<Arc<ViewEntry>> {
        self.inner.views.read().values().cloned().collect()
    }

    pub(crate) fn debug_rows(&self) -> Vec<ViewDebugRow> {
        let tree = &self.inner.tree;
        let mut rows: Vec<ViewDebugRow> = self
            .entries()
            .into_iter()
            .map(|e| ViewDebugRow {
                id: e.id().to_owned(),
                active: e.is_active(tree),
                modules: e.modules().to_vec(),
                always: e.always().to_vec(),
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}

impl ViewOps for ViewRegistry {
    fn open_view(&self, id: &str) {
        ViewRegistry::open_view(self, id);
    }

    fn close_view(&self, id: &str) {
        ViewRegistry::close_view(self, id);
    }

    fn change_view(&self, from: &str, target: &str) {
        let Some(entry) = self.entry(from) else { return };
        if !entry.is_active(&self.inner.tree) {
            return;
        }
        tracing::debug!(target: targets::REGISTRY, %from, to = %target, "changing view");
        view::close(self, &entry);
        if !target.is_empty() {
            ViewRegistry::open_view(self, target);
        }
    }

    fn open_nested(&self, from: &str, target: &str) {
        let Some(entry) = self.entry(from) else { return };
        if !entry.is_active(&self.inner.tree) {
            return;
        }
        ViewRegistry::open_view(self, target);
    }

    fn refresh_active(&self, id: &str) {
        if let Some(entry) = self.entry(id) {
            view::refresh(self, &entry);
        }
    }
}

fn view_root_predicate() -> Predicate {
    Predicate::has_attr(contract::VIEW)
        .and(Predicate::attr_eq(contract::ROLE, contract::ROLE_GROUP))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_root(tree: &Tree, parent: Option<ElementId>, modules: &str) -> ElementId {
        let el = tree.create_element(parent).unwrap();
        tree.set_attr(el, contract::VIEW, modules).unwrap();
        tree.set_attr(el, contract::ROLE, contract::ROLE_GROUP).unwrap();
        el
    }

    #[test]
    fn identifier_falls_back_to_last_module_name() {
        let tree = Tree::new();
        let root = view_root(&tree, None, "nav detail");
        let registry = ViewRegistry::new(tree);
        assert_eq!(registry.register_view(root).unwrap(), Some("detail".into()));
        assert!(registry.has_view("detail", None));
    }

    #[test]
    fn explicit_identifier_wins() {
        let tree = Tree::new();
        let root = view_root(&tree, None, "nav");
        tree.set_attr(root, contract::ID, "sidebar").unwrap();
        let registry = ViewRegistry::new(tree);
        assert_eq!(registry.register_view(root).unwrap(), Some("sidebar".into()));
    }

    #[test]
    fn registration_is_idempotent() {
        let tree = Tree::new();
        let root = view_root(&tree, None, "nav");
        let registry = ViewRegistry::new(tree.clone());
        registry.register_view(root).unwrap();
        registry.open_view("nav");
        registry.register_view(root).unwrap();
        assert_eq!(registry.active_views(), vec!["nav".to_owned()]);
    }

    #[test]
    fn anonymous_moduleless_roots_are_skipped() {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        let registry = ViewRegistry::new(tree);
        assert_eq!(registry.register_view(root).unwrap(), None);
    }

    #[test]
    fn empty_module_name_is_rejected() {
        let registry = ViewRegistry::new(Tree::new());
        let err = registry
            .register_module("", || Box::new(crate::compose::CallbackDelegate::new()))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyModuleName));
    }

    #[test]
    fn scan_finds_nested_view_roots() {
        let tree = Tree::new();
        let top = tree.create_element(None).unwrap();
        let outer = view_root(&tree, Some(top), "shell");
        let _inner = view_root(&tree, Some(outer), "panel");
        let bare = tree.create_element(Some(top)).unwrap();
        tree.set_attr(bare, contract::VIEW, "ignored_without_role")
            .unwrap();

        let registry = ViewRegistry::new(tree);
        registry.scan();
        assert_eq!(
            registry.present_views(None),
            vec!["panel".to_owned(), "shell".to_owned()]
        );
    }
}
