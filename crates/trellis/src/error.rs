//! Error types for the engine.
//!
//! Most failure conditions in this crate are deliberately silent (missing
//! handlers, unknown view identifiers, redirected transitions); only
//! programmer errors caught at composition or registration time surface here.

use trellis_core::TreeError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing or registering views.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Attempted to assign a member that the view base defines.
    #[error("member '{name}' belongs to the view base and is read-only through the composed facade")]
    ProtectedMember { name: String },

    /// Attempted to register a behavior module under an empty name.
    #[error("behavior module name must not be empty")]
    EmptyModuleName,

    /// An underlying tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
