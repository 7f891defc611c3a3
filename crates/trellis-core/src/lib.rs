//! Core element-tree systems for Trellis.
//!
//! This crate provides the structural collaborators the Trellis engine
//! dispatches against:
//!
//! - **Element Tree**: arena-backed parent/child store with stable IDs
//! - **Attributes**: the declarative contract (`data-view`, `data-operator`, ...)
//! - **Visibility Markers**: the `active` and `hidden` element flags
//! - **Queries**: composable predicates evaluated in document order
//! - **Interaction Events**: origin/capture pairs with propagation control
//!
//! # Example
//!
//! ```
//! use trellis_core::{InputEvent, Predicate, Tree};
//!
//! let tree = Tree::new();
//! let root = tree.create_element(None).unwrap();
//! let button = tree.create_element(Some(root)).unwrap();
//! tree.set_attr(button, "data-operator", "select").unwrap();
//!
//! let hits = tree.query_all(root, &Predicate::has_attr("data-operator"));
//! assert_eq!(hits, vec![button]);
//!
//! let event = InputEvent::new("click", button).with_capture(root);
//! assert_eq!(event.event_type(), "click");
//! ```

mod element;
mod error;
mod event;
mod query;
mod tree;

pub use element::ElementId;
pub use error::{TreeError, TreeResult};
pub use event::InputEvent;
pub use query::Predicate;
pub use tree::{Tree, TreeStore};
