#![warn(missing_docs)]

//! Error types for the warehouse layout library.
//!
//! This module defines the errors raised while building a layout or
//! resolving an address against it.

use core::fmt;

/// Errors that can occur when validating a layout or an address.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// An address component is outside the configured grid.
    /// Components are 1-based, so both `0` and values above the bound are rejected.
    InvalidAddress {
        /// Name of the offending component (`street`, `rack`, `level` or `slot`).
        field: &'static str,
        /// The rejected value.
        value: u32,
        /// The inclusive upper bound for the component.
        max: u32,
    },
    /// Error for invalid grid dimensions.
    /// This variant is returned when any grid count is zero.
    InvalidDimensions(&'static str),
    /// Error for invalid rack geometry.
    /// This variant is returned when a rack measurement is not positive.
    InvalidRackGeometry(&'static str),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidAddress { field, value, max } => {
                write!(f, "Invalid address: {} {} is outside 1..={}", field, value, max)
            }
            LayoutError::InvalidDimensions(msg) => write!(f, "Invalid grid dimensions: {}", msg),
            LayoutError::InvalidRackGeometry(msg) => write!(f, "Invalid rack geometry: {}", msg),
        }
    }
}

impl core::error::Error for LayoutError {}
