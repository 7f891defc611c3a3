//! Trellis: view composition and event routing over an element tree.
//!
//! Views are subtrees of UI elements that opt into behavior declaratively:
//! a root carries `data-view` naming the behavior modules to compose, and
//! descendants carry `data-events`/`data-operator` attributes naming which
//! interactions invoke which composed member. The engine supplies:
//!
//! - **Delegate composition** ([`Composed`]): behavior modules layered over
//!   the [`CoreView`] base with override/fallthrough chaining
//! - **Event routing** ([`ViewRegistry::handle_event`]): bubbling-path
//!   resolution to the nearest operator element and dispatch into the
//!   composed view
//! - **View lifecycle**: open/close/refresh transitions with re-entrancy
//!   safe hook sequencing and cascading close of nested views
//!
//! # Example
//!
//! ```
//! use trellis::{contract, CallbackDelegate, InputEvent, Tree, Value, ViewRegistry};
//!
//! let tree = Tree::new();
//! let stage = tree.create_element(None).unwrap();
//! let menu = tree.create_element(Some(stage)).unwrap();
//! tree.set_attr(menu, contract::VIEW, "menu").unwrap();
//! tree.set_attr(menu, contract::ROLE, contract::ROLE_GROUP).unwrap();
//! tree.set_attr(menu, contract::EVENTS, "click").unwrap();
//! let button = tree.create_element(Some(menu)).unwrap();
//! tree.set_attr(button, contract::OPERATOR, "select").unwrap();
//!
//! let registry = ViewRegistry::new(tree.clone());
//! registry
//!     .register_module("menu", || {
//!         Box::new(CallbackDelegate::new().on("select", |cx| {
//!             cx.set_data("picked", true.into());
//!             Value::Null
//!         }))
//!     })
//!     .unwrap();
//! registry.scan();
//!
//! registry.open_view("menu");
//! assert!(tree.is_active(menu));
//!
//! let click = InputEvent::new("click", button).with_capture(menu);
//! registry.handle_event(&click);
//! assert!(click.propagation_stopped());
//! ```

pub mod contract;
pub mod logging;

mod compose;
mod dispatch;
mod error;
mod path;
mod registry;
mod view;


pub use compose::{
    CallbackDelegate, ChainPolicy, Composed, Delegate, InertOps, Value, ViewCx, ViewOps,
};
pub use dispatch::{DispatchOutcome, ToggleNaming};
pub use error::{Error, Result};
pub use path::{find_operator_element, resolve_path};
pub use registry::{RegistryConfig, ViewRegistry};
pub use view::{CoreView, ViewEntry, BASE_MEMBERS};

pub use trellis_core::{ElementId, InputEvent, Predicate, Tree, TreeError, TreeResult, TreeStore};

/// Commonly used items.
pub mod prelude {
    pub use crate::compose::{CallbackDelegate, ChainPolicy, Delegate, Value, ViewCx};
    pub use crate::dispatch::{DispatchOutcome, ToggleNaming};
    pub use crate::registry::{RegistryConfig, ViewRegistry};
    pub use trellis_core::{ElementId, InputEvent, Predicate, Tree};
}
