use std::collections::VecDeque;
use std::fmt;

use tracing::debug;
use warehouse_layout::Position3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::NavigationError;

/// An ordered queue of waypoints, consumed front to back.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Route {
    waypoints: VecDeque<Position3>,
}

impl Route {
    /// Creates an empty route.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next waypoint to reach, if any.
    pub fn front(&self) -> Option<&Position3> {
        self.waypoints.front()
    }

    /// Removes and returns the next waypoint.
    pub fn pop_front(&mut self) -> Option<Position3> {
        self.waypoints.pop_front()
    }

    /// Appends a waypoint at the end of the route.
    pub fn push(&mut self, waypoint: Position3) {
        self.waypoints.push_back(waypoint);
    }

    /// Drops every queued waypoint.
    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    /// Number of waypoints left.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns true if no waypoint is left.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Iterates over the remaining waypoints in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &Position3> {
        self.waypoints.iter()
    }

    /// Length of the polyline starting at `from` and visiting every waypoint.
    pub fn total_length(&self, from: Position3) -> f64 {
        let mut previous = from;
        let mut total = 0.0;
        for waypoint in &self.waypoints {
            total += previous.distance_to(waypoint);
            previous = *waypoint;
        }
        total
    }
}

impl FromIterator<Position3> for Route {
    fn from_iter<I: IntoIterator<Item = Position3>>(iter: I) -> Self {
        Route { waypoints: iter.into_iter().collect() }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Route [")?;
        for (i, waypoint) in self.waypoints.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", waypoint)?;
        }
        write!(f, "]")
    }
}

/// Fixed three-leg planner over a single highway.
///
/// The highway is the line `z = highway_z`; aisles run along `z` from it. A
/// route backs out of the current aisle onto the highway, follows the highway
/// along `x` to the target aisle, then enters it. Consecutive waypoints differ
/// in one floor axis only, except for the final approach inside the aisle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HighwayPlanner {
    /// Along-aisle coordinate of the highway.
    pub highway_z: f64,
    /// Margin past the highway before a start counts as inside an aisle.
    pub tolerance: f64,
    /// A start this close to the target (in the floor plane) needs no detour.
    pub reached_threshold: f64,
}

impl Default for HighwayPlanner {
    fn default() -> Self {
        HighwayPlanner {
            highway_z: -12.0,
            tolerance: 1.0,
            reached_threshold: 0.1,
        }
    }
}

impl HighwayPlanner {
    /// Construct a planner.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidHighway)` if a value is not finite or
    /// `tolerance` / `reached_threshold` is negative.
    pub fn new(highway_z: f64, tolerance: f64, reached_threshold: f64) -> Result<Self, NavigationError> {
        if !highway_z.is_finite() || !tolerance.is_finite() || !reached_threshold.is_finite() {
            return Err(NavigationError::InvalidHighway("values must be finite"));
        }
        if tolerance < 0.0 {
            return Err(NavigationError::InvalidHighway("tolerance must be non-negative"));
        }
        if reached_threshold < 0.0 {
            return Err(NavigationError::InvalidHighway("reached threshold must be non-negative"));
        }
        Ok(HighwayPlanner { highway_z, tolerance, reached_threshold })
    }

    /// True if `position` lies deeper in an aisle than the highway lane.
    pub fn is_in_aisle(&self, position: &Position3) -> bool {
        position.z > self.highway_z + self.tolerance
    }

    /// Plans the route from `start` to `target`.
    ///
    /// When `start` is already at the target the route is the target alone.
    pub fn plan_path(&self, start: Position3, target: Position3) -> Route {
        let mut route = Route::new();

        if start.horizontal_distance_to(&target) <= self.reached_threshold {
            route.push(target);
            debug!(%start, %target, "Already at target, single-waypoint route");
            return route;
        }

        if self.is_in_aisle(&start) {
            route.push(Position3::new(start.x, 0.0, self.highway_z));
        }
        route.push(Position3::new(target.x, 0.0, self.highway_z));
        route.push(target);

        debug!(%start, %target, waypoints = route.len(), "Planned highway route");
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    fn waypoints(route: &Route) -> Vec<Position3> {
        route.iter().copied().collect()
    }

    #[test]
    fn test_plan_from_aisle_backs_out_first() {
        let planner = HighwayPlanner::default();
        let start = Position3::new(0.0, 0.0, -5.0);
        let target = Position3::new(7.5, 0.0, 2.075);
        let route = planner.plan_path(start, target);
        assert_eq!(
            waypoints(&route),
            vec![
                Position3::new(0.0, 0.0, -12.0),
                Position3::new(7.5, 0.0, -12.0),
                target,
            ]
        );
    }

    #[test]
    fn test_plan_from_highway_skips_back_out() {
        let planner = HighwayPlanner::default();
        // inside the tolerance band counts as on the highway
        let start = Position3::new(3.0, 0.0, -11.5);
        let target = Position3::new(-2.5, 0.0, -0.375);
        let route = planner.plan_path(start, target);
        assert_eq!(
            waypoints(&route),
            vec![Position3::new(-2.5, 0.0, -12.0), target]
        );
    }

    #[test]
    fn test_plan_is_axis_aligned() {
        let planner = HighwayPlanner::default();
        let start = Position3::new(12.5, 0.0, 20.0);
        let target = Position3::new(2.5, 0.0, 5.0);
        let route = planner.plan_path(start, target);
        let mut previous = start;
        let legs: Vec<Position3> = waypoints(&route);
        // every leg except the last changes a single floor axis
        for waypoint in &legs[..legs.len() - 1] {
            let dx = (waypoint.x - previous.x).abs() > EPSILON;
            let dz = (waypoint.z - previous.z).abs() > EPSILON;
            assert!(!(dx && dz), "diagonal leg {} -> {}", previous, waypoint);
            previous = *waypoint;
        }
    }

    #[test]
    fn test_plan_to_self_stays_put() {
        let planner = HighwayPlanner::default();
        for p in [
            Position3::new(7.5, 0.0, 2.075),
            Position3::new(0.0, 0.0, -12.0),
            Position3::new(-2.5, 0.0, -30.0),
        ] {
            let route = planner.plan_path(p, p);
            assert!(!route.is_empty());
            for waypoint in route.iter() {
                assert!(waypoint.distance_to(&p) <= planner.reached_threshold);
            }
        }
    }

    #[test]
    fn test_route_total_length() {
        let planner = HighwayPlanner::default();
        let start = Position3::new(0.0, 0.0, -5.0);
        let route = planner.plan_path(start, Position3::new(10.0, 0.0, 0.0));
        // 7 out, 10 along, 12 in
        assert!((route.total_length(start) - 29.0).abs() < EPSILON);
    }

    #[test]
    fn test_invalid_highway() {
        assert_eq!(
            HighwayPlanner::new(-12.0, -1.0, 0.1),
            Err(NavigationError::InvalidHighway("tolerance must be non-negative"))
        );
        assert!(HighwayPlanner::new(f64::NAN, 1.0, 0.1).is_err());
        assert!(HighwayPlanner::new(-12.0, 1.0, 0.1).is_ok());
    }
}
