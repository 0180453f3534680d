//! This module defines the error types used by the `forklift-navigation` crate.

#![warn(missing_docs)]

/// Error type for navigation setup.
///
/// This enum covers invalid planner and motion parameters. Planning and
/// executing a route cannot fail once the parameters are accepted.
#[derive(Debug, PartialEq)]
pub enum NavigationError {
    /// Error for an invalid motion profile.
    /// This variant is returned when a speed, rate or threshold is out of range.
    InvalidProfile(&'static str),
    /// Error for invalid highway parameters.
    /// This variant is returned when the highway tolerance is negative or not finite.
    InvalidHighway(&'static str),
}

impl core::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NavigationError::InvalidProfile(msg) => write!(f, "Invalid motion profile: {}", msg),
            NavigationError::InvalidHighway(msg) => write!(f, "Invalid highway parameters: {}", msg),
        }
    }
}

impl core::error::Error for NavigationError {}
