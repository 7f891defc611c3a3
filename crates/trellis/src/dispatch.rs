//! Operator dispatch.
//!
//! Maps a resolved operator element and event type onto a member of the
//! view's composed behavior and invokes it. Dispatch never fails loudly:
//! inactive views swallow events (minus their always-list), and views with
//! no matching member ignore the event.

use trellis_core::{InputEvent, Tree};

use crate::compose::ViewOps;
use crate::contract;
use crate::logging::targets;
use crate::path::find_operator_element;
use crate::view::ViewEntry;

/// How a toggle marker translates to an operator name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleNaming {
    /// Every toggle marker dispatches the literal `toggle` member.
    #[default]
    Fixed,
    /// A non-empty marker value names the member to dispatch, so one view
    /// can carry several distinct toggle operators. Empty markers still
    /// dispatch `toggle`.
    FromAttribute,
}

/// What an event dispatch amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The named operator member was invoked.
    Invoked(String),
    /// No operator resolved; the event-type-named member was invoked.
    FellBack(String),
    /// The view was active but exposed no matching member.
    Ignored,
    /// The view was inactive and the event type was not on its always-list.
    Inactive,
    /// No registered view was bound to the event's elements.
    Unbound,
}

/// Resolves events against a single view entry.
pub(crate) struct Dispatcher {
    toggle_naming: ToggleNaming,
}

impl Dispatcher {
    pub(crate) fn new(toggle_naming: ToggleNaming) -> Self {
        Self { toggle_naming }
    }

    /// Dispatch `event` into `entry`'s composed behavior.
    ///
    /// Propagation is halted at this boundary whenever the view handled the
    /// event in any way (including an active view ignoring it); only an
    /// inactive view that is not observing the type leaves the event live.
    pub(crate) fn dispatch(
        &self,
        entry: &ViewEntry,
        tree: &Tree,
        ops: &dyn ViewOps,
        event: &InputEvent,
    ) -> DispatchOutcome {
        if !entry.is_active(tree) {
            return self.dispatch_dormant(entry, tree, ops, event);
        }

        let op_el = find_operator_element(tree, event);
        let member = self.operator_name(tree, op_el);

        if let Some(member) = member {
            if entry.composed().provides(&member) {
                tracing::debug!(
                    target: targets::DISPATCH,
                    view = entry.id(),
                    event = event.event_type(),
                    operator = %member,
                    "dispatching operator"
                );
                let mut cx = entry.cx(tree, ops).with_element(op_el).with_event(event);
                entry.composed().call(&member, &mut cx);
                event.stop_propagation();
                return DispatchOutcome::Invoked(member);
            }
        }

        let fallback = event.event_type().to_owned();
        if entry.composed().provides(&fallback) {
            tracing::debug!(
                target: targets::DISPATCH,
                view = entry.id(),
                event = %fallback,
                "no operator; dispatching event-type member"
            );
            let mut cx = entry.cx(tree, ops).with_element(op_el).with_event(event);
            entry.composed().call(&fallback, &mut cx);
            event.stop_propagation();
            return DispatchOutcome::FellBack(fallback);
        }

        tracing::trace!(
            target: targets::DISPATCH,
            view = entry.id(),
            event = event.event_type(),
            "no matching member; event ignored"
        );
        event.stop_propagation();
        DispatchOutcome::Ignored
    }

    // Reduced dispatch for inactive views: only always-listed event types
    // reach the view, and only through the event-type-named member.
    fn dispatch_dormant(
        &self,
        entry: &ViewEntry,
        tree: &Tree,
        ops: &dyn ViewOps,
        event: &InputEvent,
    ) -> DispatchOutcome {
        let event_type = event.event_type();
        if !entry.always().iter().any(|t| t == event_type) {
            return DispatchOutcome::Inactive;
        }
        if !entry.composed().provides(event_type) {
            event.stop_propagation();
            return DispatchOutcome::Ignored;
        }
        tracing::debug!(
            target: targets::DISPATCH,
            view = entry.id(),
            event = event_type,
            "always-list dispatch to dormant view"
        );
        let mut cx = entry
            .cx(tree, ops)
            .with_element(event.origin())
            .with_event(event);
        entry.composed().call(event_type, &mut cx);
        event.stop_propagation();
        DispatchOutcome::FellBack(event_type.to_owned())
    }

    // The member name the operator element binds, if any. An explicit
    // operator attribute wins; a toggle marker forces the configured
    // toggle naming.
    fn operator_name(&self, tree: &Tree, op_el: trellis_core::ElementId) -> Option<String> {
        if let Some(op) = tree.attr(op_el, contract::OPERATOR).filter(|v| !v.is_empty()) {
            return Some(op);
        }
        if tree.has_attr(op_el, contract::TOGGLE) {
            let name = match self.toggle_naming {
                ToggleNaming::Fixed => String::new(),
                ToggleNaming::FromAttribute => {
                    tree.attr(op_el, contract::TOGGLE).unwrap_or_default()
                }
            };
            return Some(if name.is_empty() {
                "toggle".to_owned()
            } else {
                name
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_naming_resolution() {
        let tree = Tree::new();
        let el = tree.create_element(None).unwrap();
        tree.set_attr(el, contract::TOGGLE, "switch_tab").unwrap();

        let fixed = Dispatcher::new(ToggleNaming::Fixed);
        assert_eq!(fixed.operator_name(&tree, el), Some("toggle".into()));

        let named = Dispatcher::new(ToggleNaming::FromAttribute);
        assert_eq!(named.operator_name(&tree, el), Some("switch_tab".into()));

        tree.set_attr(el, contract::TOGGLE, "").unwrap();
        assert_eq!(named.operator_name(&tree, el), Some("toggle".into()));
    }

    #[test]
    fn explicit_operator_beats_toggle_marker() {
        let tree = Tree::new();
        let el = tree.create_element(None).unwrap();
        tree.set_attr(el, contract::TOGGLE, "switch_tab").unwrap();
        tree.set_attr(el, contract::OPERATOR, "select").unwrap();

        let dispatcher = Dispatcher::new(ToggleNaming::FromAttribute);
        assert_eq!(dispatcher.operator_name(&tree, el), Some("select".into()));
    }
}
