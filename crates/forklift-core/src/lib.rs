//! Pick-and-place sequencing for a warehouse forklift.
//!
//! [`Operation`] walks the ten [`OperationPhase`]s of a run: drive to the
//! source aisle, lift, pick, lower, drive to the destination, lift, drop, lower
//! and return home. It is advanced by explicit ticks and by handling delays the
//! driver schedules on its behalf, so it runs the same under a render loop, an
//! async runtime or a test.

pub mod error;
pub mod operation;
pub mod phase;

pub use error::OperationError;
pub use operation::{
    Operation, OperationConfig, OperationEvent, OperationParams, OperationSnapshot, ScheduledAdvance,
};
pub use phase::OperationPhase;

pub use forklift_navigation::{ForkliftPose, HighwayPlanner, MotionProfile};
pub use warehouse_layout::{Layout, LayoutConfig, Position3, RackDimensions, WarehouseAddress};
