use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The step of the pick-and-place cycle the forklift is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OperationPhase {
    #[default]
    Idle, // Parked, forks down, waiting for a start command.
    MovingToSource, // Following the route to the source aisle standoff.
    LiftingSrc,     // Raising the forks to the source slot.
    Picking,        // Package attached, waiting out the handling delay.
    LoweringSrc,    // Dropping the forks to travel height.
    MovingToDest,   // Following the route to the destination aisle standoff.
    LiftingDest,    // Raising the forks to the destination slot.
    Dropping,       // Package detached, waiting out the handling delay.
    LoweringDest,   // Forks back to the floor.
    Returning,      // Following the route home.
}

impl OperationPhase {
    /// Every phase in cycle order.
    pub const CYCLE: [OperationPhase; 10] = [
        OperationPhase::Idle,
        OperationPhase::MovingToSource,
        OperationPhase::LiftingSrc,
        OperationPhase::Picking,
        OperationPhase::LoweringSrc,
        OperationPhase::MovingToDest,
        OperationPhase::LiftingDest,
        OperationPhase::Dropping,
        OperationPhase::LoweringDest,
        OperationPhase::Returning,
    ];

    /// The phase that follows this one in a normal cycle.
    pub fn next(&self) -> OperationPhase {
        match self {
            OperationPhase::Idle => OperationPhase::MovingToSource,
            OperationPhase::MovingToSource => OperationPhase::LiftingSrc,
            OperationPhase::LiftingSrc => OperationPhase::Picking,
            OperationPhase::Picking => OperationPhase::LoweringSrc,
            OperationPhase::LoweringSrc => OperationPhase::MovingToDest,
            OperationPhase::MovingToDest => OperationPhase::LiftingDest,
            OperationPhase::LiftingDest => OperationPhase::Dropping,
            OperationPhase::Dropping => OperationPhase::LoweringDest,
            OperationPhase::LoweringDest => OperationPhase::Returning,
            OperationPhase::Returning => OperationPhase::Idle,
        }
    }

    /// True for the phases that consume a route.
    pub fn is_moving(&self) -> bool {
        matches!(
            self,
            OperationPhase::MovingToSource | OperationPhase::MovingToDest | OperationPhase::Returning
        )
    }

    /// True for the phases that wait for the forks to settle.
    pub fn is_lifting(&self) -> bool {
        matches!(
            self,
            OperationPhase::LiftingSrc
                | OperationPhase::LoweringSrc
                | OperationPhase::LiftingDest
                | OperationPhase::LoweringDest
        )
    }

    /// True for the timed pick and drop phases.
    pub fn is_handling(&self) -> bool {
        matches!(self, OperationPhase::Picking | OperationPhase::Dropping)
    }

    /// Upper-case name as used in logs and status labels.
    pub fn name(&self) -> &'static str {
        match self {
            OperationPhase::Idle => "IDLE",
            OperationPhase::MovingToSource => "MOVING_TO_SOURCE",
            OperationPhase::LiftingSrc => "LIFTING_SRC",
            OperationPhase::Picking => "PICKING",
            OperationPhase::LoweringSrc => "LOWERING_SRC",
            OperationPhase::MovingToDest => "MOVING_TO_DEST",
            OperationPhase::LiftingDest => "LIFTING_DEST",
            OperationPhase::Dropping => "DROPPING",
            OperationPhase::LoweringDest => "LOWERING_DEST",
            OperationPhase::Returning => "RETURNING",
        }
    }
}

/// Operator-facing status label.
impl fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationPhase::Idle => write!(f, "AWAITING COMMAND"),
            other => write!(f, "{}", other.name().replace('_', " ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_walks_the_cycle() {
        for (i, phase) in OperationPhase::CYCLE.iter().enumerate() {
            let expected = OperationPhase::CYCLE[(i + 1) % OperationPhase::CYCLE.len()];
            assert_eq!(phase.next(), expected);
        }
    }

    #[test]
    fn test_phase_classes_are_disjoint() {
        for phase in OperationPhase::CYCLE {
            let classes = [phase.is_moving(), phase.is_lifting(), phase.is_handling()];
            let count = classes.iter().filter(|c| **c).count();
            if phase == OperationPhase::Idle {
                assert_eq!(count, 0);
            } else {
                assert_eq!(count, 1, "{:?}", phase);
            }
        }
    }

    #[test]
    fn test_status_label() {
        assert_eq!(OperationPhase::Idle.to_string(), "AWAITING COMMAND");
        assert_eq!(OperationPhase::MovingToSource.to_string(), "MOVING TO SOURCE");
        assert_eq!(OperationPhase::LoweringDest.to_string(), "LOWERING DEST");
    }
}
