//! Delegate composition.
//!
//! A view's behavior is assembled by layering [`Delegate`]s over a base
//! delegate. Each layer boundary carries a [`ChainPolicy`] deciding what
//! happens when both sides define the same member: the outer layer may
//! supersede the inner one, or both may run with a fixed order.
//!
//! Missing members never panic: calling a member no layer provides yields
//! [`Value::Null`]. This keeps rapid prototyping cheap (wire up markup before
//! the behavior exists) at the cost of silent no-ops for typos; enable
//! `trace`-level logging on the `trellis::compose` target to surface them.

use std::collections::HashMap;

use parking_lot::Mutex;
use trellis_core::{ElementId, InputEvent, Tree};

use crate::error::{Error, Result};
use crate::logging::targets;

/// A dynamically-typed member value.
///
/// Composition treats `Null` and the empty string as "no result" when a
/// short-circuit boundary decides whether to fall through.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// Whether this value counts as "no result" for chain fallthrough.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// A named-member provider that can be layered into a [`Composed`] view.
///
/// `provides` must be side-effect free; composition consults it repeatedly
/// while resolving a call. `invoke` is only called for members `provides`
/// reported.
pub trait Delegate: Send {
    /// Whether this delegate defines the named member.
    fn provides(&self, member: &str) -> bool;

    /// Invoke the named member.
    fn invoke(&mut self, member: &str, cx: &mut ViewCx<'_>) -> Value;
}

type Callback = Box<dyn FnMut(&mut ViewCx<'_>) -> Value + Send>;

/// A [`Delegate`] built from a table of named closures.
///
/// The usual way application behavior modules are written:
///
/// ```
/// use trellis::{CallbackDelegate, Value};
///
/// let module = CallbackDelegate::new()
///     .on("select", |cx| {
///         cx.set_data("selected", true.into());
///         Value::Null
///     })
///     .on("selected", |cx| cx.data("selected").unwrap_or_default());
/// ```
#[derive(Default)]
pub struct CallbackDelegate {
    members: HashMap<String, Callback>,
}

impl CallbackDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member. Later registrations under the same name replace
    /// earlier ones.
    pub fn on(
        mut self,
        member: impl Into<String>,
        f: impl FnMut(&mut ViewCx<'_>) -> Value + Send + 'static,
    ) -> Self {
        self.members.insert(member.into(), Box::new(f));
        self
    }
}

impl Delegate for CallbackDelegate {
    fn provides(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }

    fn invoke(&mut self, member: &str, cx: &mut ViewCx<'_>) -> Value {
        match self.members.get_mut(member) {
            Some(f) => f(cx),
            None => Value::Null,
        }
    }
}

/// Host-side view operations a delegate can request during invocation.
///
/// The registry implements this; [`InertOps`] is a stand-in for composing
/// outside a registry (tests, previews).
pub trait ViewOps {
    /// Open the named view if it is currently inactive.
    fn open_view(&self, id: &str);

    /// Close the named view if it is currently active.
    fn close_view(&self, id: &str);

    /// Close `from` and open `target`; ignored unless `from` is active.
    fn change_view(&self, from: &str, target: &str);

    /// Open `target` while `from` stays open; ignored unless `from` is active.
    fn open_nested(&self, from: &str, target: &str);

    /// Re-run the named view's reset/update hooks; ignored unless active.
    fn refresh_active(&self, id: &str);
}

/// A [`ViewOps`] that ignores every request.
pub struct InertOps;

impl ViewOps for InertOps {
    fn open_view(&self, _id: &str) {}
    fn close_view(&self, _id: &str) {}
    fn change_view(&self, _from: &str, _target: &str) {}
    fn open_nested(&self, _from: &str, _target: &str) {}
    fn refresh_active(&self, _id: &str) {}
}

/// Per-invocation context handed to delegate members.
///
/// Carries the identity of the view being invoked, shared access to the
/// element tree and the view's data bag, and (for event-driven calls) the
/// resolved operator element and the triggering event.
pub struct ViewCx<'a> {
    view_id: &'a str,
    root: ElementId,
    tree: &'a Tree,
    ops: &'a dyn ViewOps,
    data: &'a Mutex<HashMap<String, Value>>,
    element: Option<ElementId>,
    event: Option<&'a InputEvent>,
}

impl<'a> ViewCx<'a> {
    pub fn new(
        view_id: &'a str,
        root: ElementId,
        tree: &'a Tree,
        ops: &'a dyn ViewOps,
        data: &'a Mutex<HashMap<String, Value>>,
    ) -> Self {
        Self {
            view_id,
            root,
            tree,
            ops,
            data,
            element: None,
            event: None,
        }
    }

    /// Attach the element the invocation resolved to.
    pub fn with_element(mut self, element: ElementId) -> Self {
        self.element = Some(element);
        self
    }

    /// Attach the triggering event.
    pub fn with_event(mut self, event: &'a InputEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// Identifier of the view being invoked.
    pub fn view_id(&self) -> &str {
        self.view_id
    }

    /// The view's root element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// The operator element this invocation resolved to, if event-driven.
    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    /// The triggering event, if event-driven.
    pub fn event(&self) -> Option<&InputEvent> {
        self.event
    }

    /// Whether the view's root currently carries the active marker.
    pub fn is_active(&self) -> bool {
        self.tree.is_active(self.root)
    }

    /// Read a value from the view's data bag.
    pub fn data(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Write a value into the view's data bag.
    pub fn set_data(&self, key: impl Into<String>, value: Value) {
        self.data.lock().insert(key.into(), value);
    }

    /// Drop every value from the view's data bag.
    pub fn clear_data(&self) {
        self.data.lock().clear();
    }

    /// Reveal the element with the given `id` attribute under this view.
    pub fn show_id(&self, id: &str) {
        if let Some(el) = self.tree.find_by_element_id(self.root, id) {
            let _ = self.tree.set_hidden(el, false);
        }
    }

    /// Conceal the element with the given `id` attribute under this view.
    pub fn hide_id(&self, id: &str) {
        if let Some(el) = self.tree.find_by_element_id(self.root, id) {
            let _ = self.tree.set_hidden(el, true);
        }
    }

    /// Close this view and open `target` in its place.
    pub fn change_to(&self, target: &str) {
        self.ops.change_view(self.view_id, target);
    }

    /// Open `target` while this view stays open.
    pub fn open_view(&self, target: &str) {
        self.ops.open_nested(self.view_id, target);
    }

    /// Ask the host to open this view.
    pub fn open(&self) {
        self.ops.open_view(self.view_id);
    }

    /// Ask the host to close this view.
    pub fn close(&self) {
        self.ops.close_view(self.view_id);
    }

    /// Ask the host to re-run this view's reset/update hooks.
    pub fn refresh(&self) {
        self.ops.refresh_active(self.view_id);
    }
}

/// How a layer boundary resolves a member both sides define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainPolicy {
    /// Invoke the outer layer; fall through to the inner chain only when the
    /// outer result [is empty](Value::is_empty).
    #[default]
    ShortCircuit,
    /// Invoke the outer layer, then the inner chain unconditionally. The
    /// inner result is returned.
    OuterThenInner,
    /// Invoke the inner chain, then the outer layer unconditionally. The
    /// outer result is returned.
    InnerThenOuter,
}

struct Layer {
    delegate: Mutex<Option<Box<dyn Delegate>>>,
    policy: ChainPolicy,
}

/// A base delegate with zero or more layers composed over it.
///
/// Layers are held in slots a member is *checked out* of for the duration of
/// its own invocation. A member that re-enters its own layer (directly or
/// through a view transition it triggers) therefore sees that layer as
/// absent and resolution degrades to the remaining chain instead of
/// deadlocking.
pub struct Composed {
    base: Mutex<Option<Box<dyn Delegate>>>,
    // Innermost first; the last layer is consulted first.
    layers: Vec<Layer>,
    props: Mutex<HashMap<String, Value>>,
}

impl Composed {
    pub fn new(base: Box<dyn Delegate>) -> Self {
        Self {
            base: Mutex::new(Some(base)),
            layers: Vec::new(),
            props: Mutex::new(HashMap::new()),
        }
    }

    /// Layer `delegate` over everything composed so far.
    pub fn layer(mut self, delegate: Box<dyn Delegate>, policy: ChainPolicy) -> Self {
        self.layers.push(Layer {
            delegate: Mutex::new(Some(delegate)),
            policy,
        });
        self
    }

    /// Whether any currently checked-in layer (or the base) defines `member`.
    pub fn provides(&self, member: &str) -> bool {
        self.provides_below(self.layers.len() + 1, member)
    }

    // Whether any layer strictly below `depth` defines `member`; depth
    // `layers.len() + 1` covers the whole stack, depth 1 covers the base only.
    fn provides_below(&self, depth: usize, member: &str) -> bool {
        self.layers[..depth.saturating_sub(1)]
            .iter()
            .any(|l| slot_provides(&l.delegate, member))
            || slot_provides(&self.base, member)
    }

    /// Invoke `member` through the chain. Returns [`Value::Null`] when no
    /// layer defines it.
    pub fn call(&self, member: &str, cx: &mut ViewCx<'_>) -> Value {
        if !self.provides(member) {
            tracing::trace!(
                target: targets::COMPOSE,
                view = cx.view_id(),
                member,
                "no layer provides member; returning null"
            );
            return Value::Null;
        }
        self.call_below(self.layers.len() + 1, member, cx)
    }

    // Resolve `member` among the layers strictly below `depth`.
    fn call_below(&self, depth: usize, member: &str, cx: &mut ViewCx<'_>) -> Value {
        let Some(layer_index) = depth.checked_sub(2) else {
            // Base level.
            return invoke_slot(&self.base, member, cx).unwrap_or_default();
        };
        let layer = &self.layers[layer_index];
        let here = slot_provides(&layer.delegate, member);
        if !here {
            return self.call_below(depth - 1, member, cx);
        }
        if !self.provides_below(depth - 1, member) {
            return invoke_slot(&layer.delegate, member, cx).unwrap_or_default();
        }
        match layer.policy {
            ChainPolicy::ShortCircuit => {
                let outer = invoke_slot(&layer.delegate, member, cx).unwrap_or_default();
                if outer.is_empty() {
                    self.call_below(depth - 1, member, cx)
                } else {
                    outer
                }
            }
            ChainPolicy::OuterThenInner => {
                invoke_slot(&layer.delegate, member, cx);
                self.call_below(depth - 1, member, cx)
            }
            ChainPolicy::InnerThenOuter => {
                self.call_below(depth - 1, member, cx);
                invoke_slot(&layer.delegate, member, cx).unwrap_or_default()
            }
        }
    }

    /// Read an auxiliary property previously stored with [`Composed::set`].
    pub fn get(&self, name: &str) -> Option<Value> {
        self.props.lock().get(name).cloned()
    }

    /// Store an auxiliary property on the composed facade.
    ///
    /// Members the base delegate defines are write-protected; assigning one
    /// fails with [`Error::ProtectedMember`].
    pub fn set(&self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if slot_provides(&self.base, &name) {
            return Err(Error::ProtectedMember { name });
        }
        self.props.lock().insert(name, value);
        Ok(())
    }
}

fn slot_provides(slot: &Mutex<Option<Box<dyn Delegate>>>, member: &str) -> bool {
    slot.lock().as_ref().is_some_and(|d| d.provides(member))
}

// Checks the delegate out of its slot for the duration of the call, so a
// re-entrant resolution sees the slot empty. Returns None when the slot is
// already checked out or the delegate does not define the member.
fn invoke_slot(
    slot: &Mutex<Option<Box<dyn Delegate>>>,
    member: &str,
    cx: &mut ViewCx<'_>,
) -> Option<Value> {
    let mut delegate = slot.lock().take()?;
    if !delegate.provides(member) {
        *slot.lock() = Some(delegate);
        return None;
    }
    let value = delegate.invoke(member, cx);
    *slot.lock() = Some(delegate);
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cx_parts() -> (Tree, ElementId, Mutex<HashMap<String, Value>>) {
        let tree = Tree::new();
        let root = tree.create_element(None).unwrap();
        (tree, root, Mutex::new(HashMap::new()))
    }

    fn recorder(
        log: &std::sync::Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
        result: Value,
    ) -> impl FnMut(&mut ViewCx<'_>) -> Value + Send + 'static {
        let log = log.clone();
        move |_cx| {
            log.lock().push(tag);
            result.clone()
        }
    }

    #[test]
    fn outer_layer_wins_on_short_circuit() {
        let (tree, root, data) = cx_parts();
        let composed = Composed::new(Box::new(
            CallbackDelegate::new().on("greet", |_| "inner".into()),
        ))
        .layer(
            Box::new(CallbackDelegate::new().on("greet", |_| "outer".into())),
            ChainPolicy::ShortCircuit,
        );

        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data);
        assert_eq!(composed.call("greet", &mut cx), Value::Str("outer".into()));
    }

    #[test]
    fn empty_outer_result_falls_through() {
        let (tree, root, data) = cx_parts();
        let composed = Composed::new(Box::new(
            CallbackDelegate::new().on("greet", |_| "inner".into()),
        ))
        .layer(
            Box::new(CallbackDelegate::new().on("greet", |_| Value::Str(String::new()))),
            ChainPolicy::ShortCircuit,
        );

        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data);
        assert_eq!(composed.call("greet", &mut cx), Value::Str("inner".into()));
    }

    #[test]
    fn outer_then_inner_runs_both_in_order() {
        let log = std::sync::Arc::new(Mutex::new(Vec::new()));
        let (tree, root, data) = cx_parts();
        let composed = Composed::new(Box::new(
            CallbackDelegate::new().on("setup", recorder(&log, "base", Value::Null)),
        ))
        .layer(
            Box::new(CallbackDelegate::new().on("setup", recorder(&log, "outer", 7.into()))),
            ChainPolicy::OuterThenInner,
        );

        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data);
        composed.call("setup", &mut cx);
        assert_eq!(*log.lock(), vec!["outer", "base"]);
    }

    #[test]
    fn inner_then_outer_returns_outer_result() {
        let log = std::sync::Arc::new(Mutex::new(Vec::new()));
        let (tree, root, data) = cx_parts();
        let composed = Composed::new(Box::new(
            CallbackDelegate::new().on("setup", recorder(&log, "base", Value::Null)),
        ))
        .layer(
            Box::new(CallbackDelegate::new().on("setup", recorder(&log, "outer", 7.into()))),
            ChainPolicy::InnerThenOuter,
        );

        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data);
        assert_eq!(composed.call("setup", &mut cx), Value::Int(7));
        assert_eq!(*log.lock(), vec!["base", "outer"]);
    }

    #[test]
    fn missing_member_is_a_silent_null() {
        let (tree, root, data) = cx_parts();
        let composed = Composed::new(Box::new(CallbackDelegate::new()));
        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data);
        assert_eq!(composed.call("nope", &mut cx), Value::Null);
    }

    #[test]
    fn only_defining_layer_is_invoked() {
        let log = std::sync::Arc::new(Mutex::new(Vec::new()));
        let (tree, root, data) = cx_parts();
        let composed = Composed::new(Box::new(
            CallbackDelegate::new().on("only_base", recorder(&log, "base", Value::Null)),
        ))
        .layer(
            Box::new(CallbackDelegate::new().on("only_outer", recorder(&log, "outer", Value::Null))),
            ChainPolicy::ShortCircuit,
        );

        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data);
        composed.call("only_base", &mut cx);
        composed.call("only_outer", &mut cx);
        assert_eq!(*log.lock(), vec!["base", "outer"]);
    }

    #[test]
    fn base_members_are_write_protected() {
        let composed = Composed::new(Box::new(
            CallbackDelegate::new().on("open", |_| Value::Null),
        ));

        let err = composed.set("open", 1.into()).unwrap_err();
        assert!(matches!(err, Error::ProtectedMember { name } if name == "open"));

        composed.set("note", "kept".into()).unwrap();
        assert_eq!(composed.get("note"), Some(Value::Str("kept".into())));
    }

    #[test]
    fn reentrant_self_call_degrades_to_inner_chain() {
        use std::sync::{Arc, OnceLock};

        let (tree, root, data) = cx_parts();
        // The closure re-enters the chain it is part of; the slot checkout
        // makes its own layer invisible to the nested call.
        let cell: Arc<OnceLock<Arc<Composed>>> = Arc::new(OnceLock::new());
        let handle = cell.clone();
        let reentrant = CallbackDelegate::new().on("step", move |cx| {
            let composed = handle.get().unwrap();
            let nested = composed.call("step", cx);
            assert_eq!(nested, Value::Str("base".into()));
            "outer".into()
        });

        let composed = Arc::new(
            Composed::new(Box::new(
                CallbackDelegate::new().on("step", |_| "base".into()),
            ))
            .layer(Box::new(reentrant), ChainPolicy::ShortCircuit),
        );
        cell.set(composed.clone()).ok().unwrap();

        let mut cx = ViewCx::new("v", root, &tree, &InertOps, &data);
        assert_eq!(composed.call("step", &mut cx), Value::Str("outer".into()));
    }
}
