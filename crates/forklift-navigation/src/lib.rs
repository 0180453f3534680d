//! Route planning and per-tick motion for a single forklift.
//!
//! The [`planner`] module turns a start point and an aisle target into a
//! Manhattan-style [`Route`] over the highway; the [`motion`] module consumes
//! that route one tick at a time and drives the fork lift.

pub mod error;
pub mod motion;
pub mod planner;

pub use error::NavigationError;
pub use motion::{normalize_angle, ForkliftPose, LiftStatus, MotionExecutor, MotionProfile, MotionStatus};
pub use planner::{HighwayPlanner, Route};
pub use warehouse_layout::Position3;
