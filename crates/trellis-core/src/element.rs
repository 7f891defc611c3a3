//! Element identifiers and per-element data.

use std::collections::HashMap;

use slotmap::new_key_type;

new_key_type! {
    /// A unique identifier for an element in the tree.
    ///
    /// `ElementId`s are stable handles that remain valid as the tree changes
    /// around them. They become invalid when the element is removed.
    pub struct ElementId;
}

impl ElementId {
    /// Convert the ElementId to a raw u64 value.
    ///
    /// Useful for interop with host event sources that need a numeric handle.
    /// The raw value can be converted back using [`ElementId::from_raw`].
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Create an ElementId from a raw u64 value.
    ///
    /// Note: this does not check that the element still exists in a tree.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// Internal data stored in the tree for each element.
pub(crate) struct ElementData {
    /// Parent element (if any).
    pub(crate) parent: Option<ElementId>,
    /// Child elements in document order.
    pub(crate) children: Vec<ElementId>,
    /// Declarative attributes (operator bindings, module lists, event lists).
    pub(crate) attrs: HashMap<String, String>,
    /// The activation marker (the `class="active"` analog).
    pub(crate) active: bool,
    /// The hidden marker (the `hidden` attribute analog).
    pub(crate) hidden: bool,
}

impl ElementData {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            attrs: HashMap::new(),
            active: false,
            hidden: false,
        }
    }
}
