//! Error types for the element tree.

use std::fmt;

/// Errors that can occur during tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The element ID is invalid or the element has been removed.
    InvalidElementId,
    /// Attempted to attach an element under itself or one of its descendants.
    CircularParentage,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidElementId => write!(f, "Invalid or removed element ID"),
            Self::CircularParentage => {
                write!(f, "Cannot attach an element under itself or its descendants")
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// Result type for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;
