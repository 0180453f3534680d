use std::time::Duration;

use forklift_navigation::{
    ForkliftPose, HighwayPlanner, LiftStatus, MotionExecutor, MotionProfile, MotionStatus,
};
use tracing::{debug, info, warn};
use warehouse_layout::{Layout, Position3, WarehouseAddress};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::OperationError;
use crate::phase::OperationPhase;

/// Source and destination of one pick-and-place run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OperationConfig {
    /// Slot the package is picked from.
    pub source: WarehouseAddress,
    /// Slot the package is dropped into.
    pub dest: WarehouseAddress,
}

impl Default for OperationConfig {
    fn default() -> Self {
        OperationConfig {
            source: WarehouseAddress::new(3, 2, 1, 2),
            dest: WarehouseAddress::new(1, 1, 1, 1),
        }
    }
}

impl OperationConfig {
    /// The same run in the opposite direction.
    pub fn swapped(&self) -> Self {
        OperationConfig { source: self.dest, dest: self.source }
    }
}

/// Fixed handling constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationParams {
    /// Forks stop this far below the slot centroid to slide under the package.
    pub pick_offset: f64,
    /// Fork height while driving with a package.
    pub travel_height: f64,
    /// Time spent in the pick and drop phases.
    pub handling_delay: Duration,
    /// Where the forklift parks and returns to.
    pub home: Position3,
}

impl Default for OperationParams {
    fn default() -> Self {
        OperationParams {
            pick_offset: 0.5,
            travel_height: 0.2,
            handling_delay: Duration::from_millis(500),
            home: Position3::new(0.0, 0.0, -5.0),
        }
    }
}

/// A delayed phase advance, valid only for the run and phase it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAdvance {
    /// Reset generation at the time of scheduling.
    pub generation: u64,
    /// Phase the advance leaves.
    pub phase: OperationPhase,
    /// How long to wait before calling [`Operation::fire`].
    pub delay: Duration,
}

/// Side-channel notifications produced by commands and ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationEvent {
    /// The phase changed.
    PhaseChanged {
        /// Phase left.
        from: OperationPhase,
        /// Phase entered.
        to: OperationPhase,
    },
    /// An intermediate waypoint was consumed; carries the planned waypoint.
    WaypointReached(Position3),
    /// The package is now on the forks.
    PackageAttached,
    /// The package left the forks.
    PackageDetached,
    /// The driver must call [`Operation::fire`] with this advance once its delay elapses.
    HandlingScheduled(ScheduledAdvance),
}

/// Compact view of the operation for status displays and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OperationSnapshot {
    /// Current phase.
    pub phase: OperationPhase,
    /// Vehicle position on the floor.
    pub position: Position3,
    /// Yaw in radians, zero along +z.
    pub heading: f64,
    /// Fork height above the floor.
    pub lift_height: f64,
    /// Whether the package is on the forks.
    pub carrying: bool,
    /// Waypoints still queued.
    pub waypoints_left: usize,
    /// Runs that made it back home.
    pub runs_completed: u64,
}

// Resolved once per configuration so ticks never touch the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Targets {
    source_standoff: Position3,
    source_lift: f64,
    dest_standoff: Position3,
    dest_lift: f64,
}

impl Targets {
    fn resolve(layout: &Layout, config: &OperationConfig, params: &OperationParams) -> Result<Self, OperationError> {
        let source_slot = layout.position_of(&config.source)?;
        let dest_slot = layout.position_of(&config.dest)?;
        Ok(Targets {
            source_standoff: layout.aisle_standoff_of(&config.source)?,
            source_lift: source_slot.y - params.pick_offset,
            dest_standoff: layout.aisle_standoff_of(&config.dest)?,
            dest_lift: dest_slot.y - params.pick_offset,
        })
    }
}

/// The pick-and-place state machine for one forklift.
///
/// Driven by [`tick`](Operation::tick) once per frame; `start`, `reset` and
/// `configure` come from the control surface and handling delays come back
/// through [`fire`](Operation::fire).
#[derive(Debug, Clone)]
pub struct Operation {
    layout: Layout,
    planner: HighwayPlanner,
    executor: MotionExecutor,
    params: OperationParams,
    config: OperationConfig,
    targets: Targets,
    phase: OperationPhase,
    lift_target: f64,
    generation: u64,
    pending: Option<ScheduledAdvance>,
    ticks: u64,
    elapsed: Duration,
    runs_completed: u64,
}

impl Operation {
    /// Build an idle operation parked at `params.home`.
    ///
    /// # Errors
    ///
    /// Returns `Err(OperationError::InvalidAddress)` if either address of `config`
    /// is outside the layout, `Err(OperationError::InvalidSetup)` for a bad profile.
    pub fn new(
        layout: Layout,
        planner: HighwayPlanner,
        profile: MotionProfile,
        params: OperationParams,
        config: OperationConfig,
    ) -> Result<Self, OperationError> {
        let targets = Targets::resolve(&layout, &config, &params)?;
        let executor = MotionExecutor::new(profile, params.home)?;
        Ok(Operation {
            layout,
            planner,
            executor,
            params,
            config,
            targets,
            phase: OperationPhase::Idle,
            lift_target: 0.0,
            generation: 0,
            pending: None,
            ticks: 0,
            elapsed: Duration::ZERO,
            runs_completed: 0,
        })
    }

    /// Default layout, planner, profile and params with the given run.
    ///
    /// # Errors
    ///
    /// See [`Operation::new`].
    pub fn with_config(config: OperationConfig) -> Result<Self, OperationError> {
        Self::new(
            Layout::default(),
            HighwayPlanner::default(),
            MotionProfile::default(),
            OperationParams::default(),
            config,
        )
    }

    /// Returns the current phase.
    pub fn phase(&self) -> OperationPhase {
        self.phase
    }

    /// Returns the vehicle pose.
    pub fn pose(&self) -> &ForkliftPose {
        self.executor.pose()
    }

    /// Returns the active source and destination.
    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// Returns the warehouse layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Returns the handling constants.
    pub fn params(&self) -> &OperationParams {
        &self.params
    }

    /// Returns the reset generation; bumped by every [`reset`](Operation::reset).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The handling delay currently outstanding, if any.
    pub fn pending(&self) -> Option<&ScheduledAdvance> {
        self.pending.as_ref()
    }

    /// Number of [`tick`](Operation::tick) calls so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sum of the deltas passed to [`tick`](Operation::tick).
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Runs that ended with the vehicle back home.
    pub fn runs_completed(&self) -> u64 {
        self.runs_completed
    }

    /// Compact copy of the current state.
    pub fn snapshot(&self) -> OperationSnapshot {
        let pose = self.executor.pose();
        OperationSnapshot {
            phase: self.phase,
            position: pose.position,
            heading: pose.heading,
            lift_height: pose.lift_height,
            carrying: pose.carrying,
            waypoints_left: pose.route.len(),
            runs_completed: self.runs_completed,
        }
    }

    /// Replace the run parameters.
    ///
    /// # Errors
    ///
    /// Returns `Err(OperationError::InvalidCommand)` outside IDLE and
    /// `Err(OperationError::InvalidAddress)` for an address outside the layout.
    /// The previous configuration stays in place on error.
    pub fn configure(&mut self, config: OperationConfig) -> Result<(), OperationError> {
        if self.phase != OperationPhase::Idle {
            warn!(phase = self.phase.name(), "Configuration rejected while running");
            return Err(OperationError::InvalidCommand("configuration can only change while idle"));
        }
        let targets = Targets::resolve(&self.layout, &config, &self.params).inspect_err(|e| {
            warn!(error = %e, "Configuration rejected");
        })?;
        info!(source = %config.source, dest = %config.dest, "Operation configured");
        self.config = config;
        self.targets = targets;
        Ok(())
    }

    /// Begin a run from IDLE.
    ///
    /// # Errors
    ///
    /// Returns `Err(OperationError::InvalidCommand)` outside IDLE.
    pub fn start(&mut self) -> Result<Vec<OperationEvent>, OperationError> {
        if self.phase != OperationPhase::Idle {
            warn!(phase = self.phase.name(), "Start rejected while running");
            return Err(OperationError::InvalidCommand("start is only accepted while idle"));
        }
        info!(source = %self.config.source, dest = %self.config.dest, generation = self.generation, "Operation started");
        let mut events = Vec::new();
        self.enter(OperationPhase::MovingToSource, &mut events);
        Ok(events)
    }

    /// Abandon the current run and return to IDLE where the forklift stands.
    ///
    /// Outstanding handling delays are invalidated.
    pub fn reset(&mut self) -> Vec<OperationEvent> {
        self.generation += 1;
        self.pending = None;
        self.executor.clear_route();
        let mut events = Vec::new();
        if self.phase != OperationPhase::Idle {
            info!(phase = self.phase.name(), generation = self.generation, "Operation reset");
            self.enter(OperationPhase::Idle, &mut events);
        }
        events
    }

    /// Apply a handling delay that has elapsed.
    ///
    /// Advances that belong to an earlier generation or to a phase that is no
    /// longer active are ignored and yield no events.
    pub fn fire(&mut self, advance: ScheduledAdvance) -> Vec<OperationEvent> {
        let mut events = Vec::new();
        if advance.generation != self.generation || advance.phase != self.phase {
            debug!(
                ?advance,
                phase = self.phase.name(),
                generation = self.generation,
                "Ignoring stale handling advance"
            );
            return events;
        }
        self.pending = None;
        self.enter(self.phase.next(), &mut events);
        events
    }

    /// Run one frame.
    ///
    /// Motion and lift rates are per call; `dt` only feeds [`elapsed`](Operation::elapsed).
    pub fn tick(&mut self, dt: Duration) -> Vec<OperationEvent> {
        self.ticks += 1;
        self.elapsed += dt;
        let mut events = Vec::new();

        let phase = self.phase;
        match phase {
            _ if phase.is_moving() => match self.executor.step_motion() {
                MotionStatus::Moving => {}
                MotionStatus::WaypointReached(waypoint) => {
                    if let Some(next) = self.executor.pose().route.front() {
                        debug!(next = %next, "Heading to next waypoint");
                    }
                    events.push(OperationEvent::WaypointReached(waypoint));
                }
                MotionStatus::Arrived => {
                    if phase == OperationPhase::Returning {
                        self.runs_completed += 1;
                    }
                    self.enter(phase.next(), &mut events);
                }
            },
            _ if phase.is_lifting() => {
                if self.executor.step_lift(self.lift_target) == LiftStatus::Settled {
                    debug!(height = self.lift_target, "Forks settled");
                    self.enter(phase.next(), &mut events);
                }
            }
            // IDLE and the handling phases hold the forks where they are meant to be.
            _ => {
                self.executor.step_lift(self.lift_target);
            }
        }

        events
    }

    fn enter(&mut self, next: OperationPhase, events: &mut Vec<OperationEvent>) {
        let from = self.phase;
        self.phase = next;
        info!(from = from.name(), to = next.name(), pose = %self.executor.pose(), "Phase changed");
        events.push(OperationEvent::PhaseChanged { from, to: next });

        if !next.is_moving() {
            self.executor.clear_route();
        }

        match next {
            OperationPhase::Idle => {
                self.lift_target = 0.0;
                self.detach(events);
            }
            OperationPhase::MovingToSource => self.plan_to(self.targets.source_standoff),
            OperationPhase::LiftingSrc => self.lift_target = self.targets.source_lift,
            OperationPhase::Picking => {
                self.executor.set_carrying(true);
                events.push(OperationEvent::PackageAttached);
                self.schedule_handling(events);
            }
            OperationPhase::LoweringSrc => self.lift_target = self.params.travel_height,
            OperationPhase::MovingToDest => self.plan_to(self.targets.dest_standoff),
            OperationPhase::LiftingDest => self.lift_target = self.targets.dest_lift,
            OperationPhase::Dropping => {
                self.detach(events);
                self.schedule_handling(events);
            }
            OperationPhase::LoweringDest => self.lift_target = 0.0,
            OperationPhase::Returning => self.plan_to(self.params.home),
        }
    }

    fn plan_to(&mut self, target: Position3) {
        let start = self.executor.pose().position;
        let route = self.planner.plan_path(start, target);
        info!(%route, "Route planned");
        self.executor.set_route(route);
    }

    fn detach(&mut self, events: &mut Vec<OperationEvent>) {
        if self.executor.pose().carrying {
            self.executor.set_carrying(false);
            events.push(OperationEvent::PackageDetached);
        }
    }

    fn schedule_handling(&mut self, events: &mut Vec<OperationEvent>) {
        let advance = ScheduledAdvance {
            generation: self.generation,
            phase: self.phase,
            delay: self.params.handling_delay,
        };
        self.pending = Some(advance);
        events.push(OperationEvent::HandlingScheduled(advance));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse_layout::LayoutError;
    const EPSILON: f64 = 1e-9;
    const FRAME: Duration = Duration::from_millis(16);
    const MAX_TICKS: usize = 20_000;

    // Drives ticks on a virtual clock, firing handling delays when they fall due.
    struct Harness {
        op: Operation,
        timers: Vec<(Duration, ScheduledAdvance)>,
        visited: Vec<OperationPhase>,
    }

    impl Harness {
        fn new(op: Operation) -> Self {
            let visited = vec![op.phase()];
            Harness { op, timers: Vec::new(), visited }
        }

        fn absorb(&mut self, events: Vec<OperationEvent>) {
            for event in events {
                match event {
                    OperationEvent::PhaseChanged { to, .. } => self.visited.push(to),
                    OperationEvent::HandlingScheduled(advance) => {
                        self.timers.push((self.op.elapsed() + advance.delay, advance))
                    }
                    _ => {}
                }
            }
        }

        fn start(&mut self) {
            let events = self.op.start().unwrap();
            self.absorb(events);
        }

        fn step(&mut self) {
            let events = self.op.tick(FRAME);
            self.absorb(events);
            let now = self.op.elapsed();
            let (due, waiting): (Vec<_>, Vec<_>) = self.timers.drain(..).partition(|(at, _)| *at <= now);
            self.timers = waiting;
            for (_, advance) in due {
                let events = self.op.fire(advance);
                self.absorb(events);
            }
        }

        fn run_until(&mut self, phase: OperationPhase) {
            for _ in 0..MAX_TICKS {
                if self.op.phase() == phase {
                    return;
                }
                self.step();
            }
            panic!("never reached {:?}", phase);
        }

        fn run_cycle(&mut self) {
            self.start();
            for _ in 0..MAX_TICKS {
                self.step();
                if self.op.phase() == OperationPhase::Idle {
                    return;
                }
            }
            panic!("cycle did not finish, stuck in {:?}", self.op.phase());
        }
    }

    fn reference_operation() -> Operation {
        Operation::with_config(OperationConfig {
            source: WarehouseAddress::new(3, 2, 1, 2),
            dest: WarehouseAddress::new(1, 1, 1, 1),
        })
        .unwrap()
    }

    #[test]
    fn test_full_cycle_visits_every_phase_once() {
        let mut harness = Harness::new(reference_operation());
        harness.run_cycle();

        let mut expected = OperationPhase::CYCLE.to_vec();
        expected.push(OperationPhase::Idle);
        assert_eq!(harness.visited, expected);
    }

    #[test]
    fn test_reference_scenario_ends_parked() {
        let mut harness = Harness::new(reference_operation());
        assert_eq!(harness.op.pose().position, Position3::new(0.0, 0.0, -5.0));
        harness.run_cycle();

        let op = &harness.op;
        assert_eq!(op.phase(), OperationPhase::Idle);
        assert_eq!(op.pose().lift_height, 0.0);
        assert!(!op.pose().carrying);
        assert!(op.pose().route.is_empty());
        assert!(op.pose().position.distance_to(&op.params().home) <= 0.1);
        assert_eq!(op.runs_completed(), 1);
        assert!(op.pending().is_none());
    }

    #[test]
    fn test_route_only_queued_while_moving() {
        let mut harness = Harness::new(reference_operation());
        harness.start();
        for _ in 0..MAX_TICKS {
            harness.step();
            let op = &harness.op;
            if !op.phase().is_moving() {
                assert!(op.pose().route.is_empty(), "route left in {:?}", op.phase());
            }
            if op.phase() == OperationPhase::Idle {
                return;
            }
        }
        panic!("cycle did not finish");
    }

    #[test]
    fn test_waypoint_events_carry_planned_waypoints() {
        let mut op = reference_operation();
        let standoff = op.layout().aisle_standoff_of(&op.config().source).unwrap();
        op.start().unwrap();

        let mut reached = Vec::new();
        for _ in 0..MAX_TICKS {
            if op.phase() != OperationPhase::MovingToSource {
                break;
            }
            for event in op.tick(FRAME) {
                if let OperationEvent::WaypointReached(at) = event {
                    reached.push(at);
                }
            }
        }
        // home sits inside an aisle, so the leg backs out before the highway run
        assert_eq!(
            reached,
            vec![Position3::new(0.0, 0.0, -12.0), Position3::new(standoff.x, 0.0, -12.0)]
        );
    }

    #[test]
    fn test_package_carried_between_pick_and_drop() {
        let mut harness = Harness::new(reference_operation());
        harness.start();
        for _ in 0..MAX_TICKS {
            harness.step();
            let op = &harness.op;
            let expect_carrying = matches!(
                op.phase(),
                OperationPhase::Picking
                    | OperationPhase::LoweringSrc
                    | OperationPhase::MovingToDest
                    | OperationPhase::LiftingDest
            );
            assert_eq!(op.pose().carrying, expect_carrying, "{:?}", op.phase());
            if op.phase() == OperationPhase::Idle {
                return;
            }
        }
        panic!("cycle did not finish");
    }

    #[test]
    fn test_lift_targets_follow_slot_level() {
        let mut op = reference_operation();
        op.configure(OperationConfig {
            source: WarehouseAddress::new(2, 5, 3, 1),
            dest: WarehouseAddress::new(4, 1, 2, 2),
        })
        .unwrap();
        let mut harness = Harness::new(op);
        harness.start();
        harness.run_until(OperationPhase::Picking);
        // level 3 centroid is 2.5, minus the pick offset
        assert!((harness.op.pose().lift_height - 2.0).abs() < EPSILON);
        harness.run_until(OperationPhase::MovingToDest);
        assert!((harness.op.pose().lift_height - 0.2).abs() < EPSILON);
        harness.run_until(OperationPhase::Dropping);
        assert!((harness.op.pose().lift_height - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_handling_phase_waits_for_timer() {
        let mut op = reference_operation();
        op.start().unwrap();
        let mut harness = Harness::new(op);
        harness.run_until(OperationPhase::Picking);

        // ticks keep running but never leave PICKING on their own
        let pending = *harness.op.pending().unwrap();
        for _ in 0..100 {
            harness.op.tick(FRAME);
        }
        assert_eq!(harness.op.phase(), OperationPhase::Picking);

        let events = harness.op.fire(pending);
        assert_eq!(
            events,
            vec![OperationEvent::PhaseChanged {
                from: OperationPhase::Picking,
                to: OperationPhase::LoweringSrc,
            }]
        );
        assert!(harness.op.pending().is_none());
    }

    #[test]
    fn test_start_rejected_while_running() {
        let mut op = reference_operation();
        op.start().unwrap();
        assert_eq!(
            op.start(),
            Err(OperationError::InvalidCommand("start is only accepted while idle"))
        );
        assert_eq!(op.phase(), OperationPhase::MovingToSource);
    }

    #[test]
    fn test_configure_rejected_while_running() {
        let mut op = reference_operation();
        let before = *op.config();
        op.start().unwrap();
        let result = op.configure(before.swapped());
        assert!(matches!(result, Err(OperationError::InvalidCommand(_))));
        assert_eq!(*op.config(), before);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut op = reference_operation();
        let result = op.configure(OperationConfig {
            source: WarehouseAddress::new(3, 21, 1, 1),
            dest: WarehouseAddress::new(1, 1, 1, 1),
        });
        assert_eq!(
            result,
            Err(OperationError::InvalidAddress(LayoutError::InvalidAddress {
                field: "rack",
                value: 21,
                max: 20,
            }))
        );
        assert_eq!(*op.config(), OperationConfig::default());

        let result = Operation::with_config(OperationConfig {
            source: WarehouseAddress::new(1, 1, 1, 1),
            dest: WarehouseAddress::new(1, 1, 5, 1),
        });
        assert!(matches!(result, Err(OperationError::InvalidAddress(_))));
    }

    #[test]
    fn test_reset_from_every_phase() {
        for target in OperationPhase::CYCLE.iter().skip(1) {
            let mut harness = Harness::new(reference_operation());
            harness.start();
            harness.run_until(*target);
            let generation = harness.op.generation();

            let events = harness.op.reset();
            assert!(events.contains(&OperationEvent::PhaseChanged { from: *target, to: OperationPhase::Idle }));
            assert_eq!(harness.op.phase(), OperationPhase::Idle);
            assert_eq!(harness.op.generation(), generation + 1);
            assert!(harness.op.pose().route.is_empty());
            assert!(!harness.op.pose().carrying);

            // outstanding timers from before the reset change nothing
            for _ in 0..100 {
                harness.step();
            }
            assert_eq!(harness.op.phase(), OperationPhase::Idle);
            assert_eq!(harness.op.runs_completed(), 0);
        }
    }

    #[test]
    fn test_stale_timer_ignored_in_later_run() {
        let mut harness = Harness::new(reference_operation());
        harness.start();
        harness.run_until(OperationPhase::Picking);
        let stale = *harness.op.pending().unwrap();

        harness.op.reset();
        harness.timers.clear();
        assert!(harness.op.fire(stale).is_empty());
        assert_eq!(harness.op.phase(), OperationPhase::Idle);

        // a later run reaches PICKING again; the old advance must not move it on
        harness.start();
        harness.run_until(OperationPhase::Picking);
        assert!(harness.op.fire(stale).is_empty());
        assert_eq!(harness.op.phase(), OperationPhase::Picking);

        let fresh = *harness.op.pending().unwrap();
        assert_ne!(fresh.generation, stale.generation);
        assert!(!harness.op.fire(fresh).is_empty());
        assert_eq!(harness.op.phase(), OperationPhase::LoweringSrc);
    }

    #[test]
    fn test_reset_keeps_pose_and_allows_restart() {
        let mut harness = Harness::new(reference_operation());
        harness.start();
        for _ in 0..20 {
            harness.step();
        }
        let position = harness.op.pose().position;
        harness.op.reset();
        assert_eq!(harness.op.pose().position, position);

        harness.timers.clear();
        harness.visited.clear();
        harness.run_cycle();
        assert_eq!(harness.op.runs_completed(), 1);
        assert_eq!(harness.visited.first(), Some(&OperationPhase::MovingToSource));
        assert_eq!(harness.visited.last(), Some(&OperationPhase::Idle));
    }

    #[test]
    fn test_idle_lowers_forks() {
        let mut harness = Harness::new(reference_operation());
        harness.start();
        harness.run_until(OperationPhase::MovingToDest);
        assert!(harness.op.pose().lift_height > 0.1);
        harness.op.reset();
        for _ in 0..10 {
            harness.op.tick(FRAME);
        }
        assert_eq!(harness.op.pose().lift_height, 0.0);
    }

    #[test]
    fn test_snapshot_reflects_pose() {
        let mut op = reference_operation();
        op.start().unwrap();
        let snapshot = op.snapshot();
        assert_eq!(snapshot.phase, OperationPhase::MovingToSource);
        assert_eq!(snapshot.waypoints_left, 3);
        assert_eq!(snapshot.position, op.params().home);
        assert!(!snapshot.carrying);
    }
}
