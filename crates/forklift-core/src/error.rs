//! Errors surfaced to the control surface.
//!
//! None of them is fatal: a rejected command leaves the operation exactly as
//! it was.

use core::fmt;

use forklift_navigation::NavigationError;
use warehouse_layout::LayoutError;

/// Error type for operation commands and setup.
#[derive(Debug, PartialEq)]
pub enum OperationError {
    /// A source or destination address is outside the grid.
    InvalidAddress(LayoutError),
    /// The command is not accepted in the current phase.
    InvalidCommand(&'static str),
    /// Planner or motion parameters were rejected.
    InvalidSetup(NavigationError),
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::InvalidAddress(e) => write!(f, "{}", e),
            OperationError::InvalidCommand(msg) => write!(f, "Invalid command: {}", msg),
            OperationError::InvalidSetup(e) => write!(f, "Invalid setup: {}", e),
        }
    }
}

impl core::error::Error for OperationError {}

impl From<LayoutError> for OperationError {
    fn from(e: LayoutError) -> Self {
        OperationError::InvalidAddress(e)
    }
}

impl From<NavigationError> for OperationError {
    fn from(e: NavigationError) -> Self {
        OperationError::InvalidSetup(e)
    }
}
