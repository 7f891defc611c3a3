//! Logging and debugging facilities.
//!
//! The engine instruments itself with the `tracing` crate; install a
//! subscriber in the host application to see the output:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! [`ViewTableDebug`] renders the registry's current view table for debug
//! output:
//!
//! ```ignore
//! println!("{}", ViewTableDebug::new(&registry));
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::registry::ViewRegistry;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Delegate composition target.
    pub const COMPOSE: &str = "trellis::compose";
    /// Operator dispatch target.
    pub const DISPATCH: &str = "trellis::dispatch";
    /// View lifecycle target.
    pub const VIEW: &str = "trellis::view";
    /// View registry target.
    pub const REGISTRY: &str = "trellis::registry";
}

/// Debug utility rendering a registry's view table, one view per line.
pub struct ViewTableDebug<'a> {
    registry: &'a ViewRegistry,
}

impl<'a> ViewTableDebug<'a> {
    pub fn new(registry: &'a ViewRegistry) -> Self {
        Self { registry }
    }
}

impl fmt::Display for ViewTableDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.registry.debug_rows();
        writeln!(f, "View table ({} views):", rows.len())?;
        if rows.is_empty() {
            writeln!(f, "  (empty)")?;
            return Ok(());
        }
        for row in rows {
            let mut line = format!(
                "  #{} [{}]",
                row.id,
                if row.active { "active" } else { "dormant" }
            );
            if !row.modules.is_empty() {
                write!(line, " modules={}", row.modules.join("+")).expect("write to String");
            }
            if !row.always.is_empty() {
                write!(line, " always={}", row.always.join(",")).expect("write to String");
            }
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// One line of [`ViewTableDebug`] output.
pub(crate) struct ViewDebugRow {
    pub(crate) id: String,
    pub(crate) active: bool,
    pub(crate) modules: Vec<String>,
    pub(crate) always: Vec<String>,
}
