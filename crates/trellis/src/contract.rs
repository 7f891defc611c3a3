//! The declarative contract consumed from UI elements.
//!
//! Elements opt into the engine entirely through attributes; these constants
//! name the attributes the engine reads and writes.

/// Marks an element as a view root; value is the space-separated, ordered
/// list of behavior-module names to compose.
pub const VIEW: &str = "data-view";

/// Space-separated event type names an element wants operators bound for.
pub const EVENTS: &str = "data-events";

/// Names the composed-view method to invoke when an event resolves here.
pub const OPERATOR: &str = "data-operator";

/// Marks a tab/panel-switch control; see [`crate::ToggleNaming`] for how the
/// value participates in operator resolution.
pub const TOGGLE: &str = "data-toggle";

/// Space-separated event types a view observes even while inactive.
pub const ALWAYS: &str = "data-always";

/// Names the panel a toggle control reveals.
pub const CONTROLS: &str = "aria-controls";

/// Fallback panel/view link for toggle and change operators; a leading `#`
/// is stripped.
pub const HREF: &str = "href";

/// Element role attribute.
pub const ROLE: &str = "role";

/// Role value marking a view root (together with [`VIEW`]).
pub const ROLE_GROUP: &str = "group";

/// Role value bounding the scope of a toggle operation.
pub const ROLE_TABLIST: &str = "tablist";

/// Element identifier attribute.
pub const ID: &str = "id";
