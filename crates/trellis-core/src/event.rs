//! Interaction events fed into the engine by a host event source.
//!
//! An [`InputEvent`] records where an interaction originated and where it was
//! captured; the engine reconstructs the bubbling path between the two when
//! the host cannot supply it directly.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::element::ElementId;

/// A raw interaction event.
///
/// The event type is a free-form name (`"click"`, `"change"`, ...), matching
/// the declarative `data-events` lists on elements. `capture` is the element
/// whose listener observed the event (the `currentTarget` analog); hosts with
/// a native composed path can attach it verbatim via [`InputEvent::with_path`].
#[derive(Debug)]
pub struct InputEvent {
    event_type: String,
    origin: ElementId,
    capture: Option<ElementId>,
    path: Option<Vec<ElementId>>,
    stopped: AtomicBool,
}

impl InputEvent {
    /// Create an event of the given type originating at `origin`.
    pub fn new(event_type: impl Into<String>, origin: ElementId) -> Self {
        Self {
            event_type: event_type.into(),
            origin,
            capture: None,
            path: None,
            stopped: AtomicBool::new(false),
        }
    }

    /// Set the capture-point element (where the listener was installed).
    pub fn with_capture(mut self, capture: ElementId) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Attach a host-provided composed path, used verbatim during resolution.
    pub fn with_path(mut self, path: Vec<ElementId>) -> Self {
        self.path = Some(path);
        self
    }

    /// The event type name.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The element the interaction originated at.
    pub fn origin(&self) -> ElementId {
        self.origin
    }

    /// The capture-point element, if the event bubbled.
    pub fn capture(&self) -> Option<ElementId> {
        self.capture
    }

    /// The host-provided composed path, if any.
    pub fn path(&self) -> Option<&[ElementId]> {
        self.path.as_deref()
    }

    /// Halt further propagation of this event.
    pub fn stop_propagation(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Whether propagation has been halted.
    pub fn propagation_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn stop_propagation_is_sticky() {
        let tree = Tree::new();
        let el = tree.create_element(None).unwrap();
        let event = InputEvent::new("click", el);
        assert!(!event.propagation_stopped());
        event.stop_propagation();
        event.stop_propagation();
        assert!(event.propagation_stopped());
    }
}
