use std::f64::consts::PI;
use std::fmt;

use tracing::debug;
use warehouse_layout::Position3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::NavigationError;
use crate::planner::Route;

/// Normalize an angle into `(-PI, PI]`.
///
/// A raw heading delta of -190° becomes +170°, so interpolation always turns
/// the short way round. Non-finite input comes back as NaN.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return f64::NAN;
    }
    let a = angle.rem_euclid(2.0 * PI);
    if a > PI { a - 2.0 * PI } else { a }
}

/// Per-tick motion constants.
///
/// Rates are applied once per tick regardless of the tick duration, so the
/// apparent speed follows the tick rate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionProfile {
    /// Distance travelled per tick.
    pub move_speed: f64,
    /// Fraction of the remaining heading error closed per tick, in `(0, 1]`.
    pub turn_rate: f64,
    /// Fork travel per tick.
    pub lift_speed: f64,
    /// A waypoint closer than this is reached.
    pub reached_threshold: f64,
    /// A lift error at or below this is settled.
    pub lift_settle_threshold: f64,
}

impl Default for MotionProfile {
    fn default() -> Self {
        MotionProfile {
            move_speed: 0.25,
            turn_rate: 0.1,
            lift_speed: 0.08,
            reached_threshold: 0.1,
            lift_settle_threshold: 0.05,
        }
    }
}

impl MotionProfile {
    /// Check every constant.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidProfile)` naming the first bad value.
    pub fn check(&self) -> Result<(), NavigationError> {
        if !(self.move_speed > 0.0) {
            return Err(NavigationError::InvalidProfile("move speed must be positive"));
        }
        if !(self.turn_rate > 0.0 && self.turn_rate <= 1.0) {
            return Err(NavigationError::InvalidProfile("turn rate must be in (0, 1]"));
        }
        if !(self.lift_speed > 0.0) {
            return Err(NavigationError::InvalidProfile("lift speed must be positive"));
        }
        if !(self.reached_threshold > 0.0) {
            return Err(NavigationError::InvalidProfile("reached threshold must be positive"));
        }
        if !(self.lift_settle_threshold > 0.0) {
            return Err(NavigationError::InvalidProfile("lift settle threshold must be positive"));
        }
        Ok(())
    }
}

/// Physical state of the forklift.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForkliftPose {
    /// Chassis position on the floor.
    pub position: Position3,
    /// Yaw in radians, `(-PI, PI]`, zero facing `+z`.
    pub heading: f64,
    /// Fork height above the floor.
    pub lift_height: f64,
    /// Waypoints still to visit.
    pub route: Route,
    /// True while a package rides on the forks.
    pub carrying: bool,
}

impl ForkliftPose {
    /// A pose parked at `position`, forks down, nothing queued.
    pub fn at(position: Position3) -> Self {
        ForkliftPose { position, ..Self::default() }
    }
}

impl fmt::Display for ForkliftPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} heading {:.2} rad, lift {:.2}{}",
            self.position,
            self.heading,
            self.lift_height,
            if self.carrying { ", loaded" } else { "" }
        )
    }
}

/// Outcome of one translate/rotate step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionStatus {
    /// Still travelling toward the front waypoint.
    Moving,
    /// The carried waypoint was consumed and more remain.
    WaypointReached(Position3),
    /// The route is empty.
    Arrived,
}

/// Outcome of one lift step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftStatus {
    /// The forks moved toward the target.
    Moving,
    /// The forks are at the target.
    Settled,
}

/// Owns the forklift pose and advances it one tick at a time.
#[derive(Debug, Clone)]
pub struct MotionExecutor {
    profile: MotionProfile,
    pose: ForkliftPose,
}

impl MotionExecutor {
    /// Construct an executor parked at `home`.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidProfile)` if `profile` fails [`MotionProfile::check`].
    pub fn new(profile: MotionProfile, home: Position3) -> Result<Self, NavigationError> {
        profile.check()?;
        Ok(MotionExecutor { profile, pose: ForkliftPose::at(home) })
    }

    /// Returns the motion constants.
    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Returns the current pose.
    pub fn pose(&self) -> &ForkliftPose {
        &self.pose
    }

    /// Replace the queued route.
    pub fn set_route(&mut self, route: Route) {
        self.pose.route = route;
    }

    /// Discard every queued waypoint. The chassis stays where it is.
    pub fn clear_route(&mut self) {
        self.pose.route.clear();
    }

    /// Attach or detach the package.
    pub fn set_carrying(&mut self, carrying: bool) {
        self.pose.carrying = carrying;
    }

    /// Advance toward the front waypoint by one tick.
    ///
    /// Turns a fixed fraction of the heading error and moves at most
    /// `move_speed`, never past the waypoint. A waypoint within the reached
    /// threshold is popped instead of moving. `Arrived` is returned only once
    /// the route is empty.
    pub fn step_motion(&mut self) -> MotionStatus {
        let Some(next) = self.pose.route.front().copied() else {
            return MotionStatus::Arrived;
        };

        let offset = next - self.pose.position;
        let distance = offset.length();

        if distance > self.profile.reached_threshold {
            let desired = self.pose.position.yaw_to(&next);
            let delta = normalize_angle(desired - self.pose.heading);
            self.pose.heading = normalize_angle(self.pose.heading + delta * self.profile.turn_rate);

            let step = self.profile.move_speed.min(distance);
            self.pose.position = self.pose.position + offset.scale(step / distance);
            return MotionStatus::Moving;
        }

        self.pose.route.pop_front();
        debug!(waypoint = %next, remaining = self.pose.route.len(), "Waypoint reached");
        if self.pose.route.is_empty() {
            MotionStatus::Arrived
        } else {
            MotionStatus::WaypointReached(next)
        }
    }

    /// Move the forks one tick toward `target`.
    ///
    /// Once the error is within the settle threshold the height snaps to
    /// `target` and `Settled` is returned.
    pub fn step_lift(&mut self, target: f64) -> LiftStatus {
        let error = target - self.pose.lift_height;
        if error.abs() > self.profile.lift_settle_threshold {
            let step = error.clamp(-self.profile.lift_speed, self.profile.lift_speed);
            self.pose.lift_height += step;
            return LiftStatus::Moving;
        }
        self.pose.lift_height = target;
        LiftStatus::Settled
    }
}
