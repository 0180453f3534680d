use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use forklift_core::{Operation, OperationEvent, OperationPhase, OperationSnapshot, ScheduledAdvance};

use crate::blackboard::{Blackboard, clear_faults, raise_fault, record_tick, snapshot};
use crate::bus::{Command, Topic};
use crate::config::SimulationSettings;

/// Owns the [`Operation`] and drives it at the configured tick rate.
///
/// Ticks, commands and elapsed handling delays are all handled on this one
/// task, so the operation is never touched concurrently. Handling delays run
/// as detached sleeps that post back here; the operation drops the ones a
/// reset made stale.
pub async fn run_controller(
    mut op: Operation,
    settings: SimulationSettings,
    bb: Blackboard,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: Topic<OperationSnapshot>,
) -> anyhow::Result<()> {
    info!(tick_hz = settings.tick_hz, "Controller task started.");
    let (timer_tx, mut timer_rx) = mpsc::unbounded_channel::<ScheduledAdvance>();
    let mut ticker = time::interval(settings.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    publish(&op, &bb, &snapshots);
    if settings.auto_start {
        apply(&mut op, Command::Start, &bb, &timer_tx);
    }

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now - last_tick;
                last_tick = now;

                let events = op.tick(dt);
                let finished = events.iter().any(|e| matches!(
                    e,
                    OperationEvent::PhaseChanged { from: OperationPhase::Returning, to: OperationPhase::Idle }
                ));
                dispatch(events, &timer_tx);

                if finished && settings.auto_repeat {
                    info!(runs_completed = op.runs_completed(), "Run complete, repeating in reverse");
                    apply(&mut op, Command::SwapRoute, &bb, &timer_tx);
                    apply(&mut op, Command::Start, &bb, &timer_tx);
                }
                publish(&op, &bb, &snapshots);
            }
            Some(advance) = timer_rx.recv() => {
                dispatch(op.fire(advance), &timer_tx);
            }
            command = commands.recv() => match command {
                Some(command) => {
                    apply(&mut op, command, &bb, &timer_tx);
                    publish(&op, &bb, &snapshots);
                }
                None => {
                    info!("Command channel closed. Controller stopping.");
                    return Ok(());
                }
            },
        }
    }
}

fn apply(
    op: &mut Operation,
    command: Command,
    bb: &Blackboard,
    timer_tx: &mpsc::UnboundedSender<ScheduledAdvance>,
) {
    debug!(?command, phase = op.phase().name(), "Applying command");
    let result = match command {
        Command::Start => op.start().map(|events| dispatch(events, timer_tx)),
        Command::Reset => {
            dispatch(op.reset(), timer_tx);
            clear_faults(bb);
            Ok(())
        }
        Command::Configure(config) => op.configure(config),
        Command::SwapRoute => {
            let swapped = op.config().swapped();
            op.configure(swapped)
        }
    };
    if let Err(e) = result {
        raise_fault(bb, &e.to_string());
    }
}

fn dispatch(events: Vec<OperationEvent>, timer_tx: &mpsc::UnboundedSender<ScheduledAdvance>) {
    for event in events {
        match event {
            OperationEvent::HandlingScheduled(advance) => {
                let tx = timer_tx.clone();
                tokio::spawn(async move {
                    time::sleep(advance.delay).await;
                    // The controller may already be gone at shutdown.
                    let _ = tx.send(advance);
                });
            }
            OperationEvent::WaypointReached(at) => debug!(%at, "Waypoint reached"),
            OperationEvent::PackageAttached => info!("Package attached"),
            OperationEvent::PackageDetached => info!("Package detached"),
            OperationEvent::PhaseChanged { .. } => {}
        }
    }
}

fn publish(op: &Operation, bb: &Blackboard, snapshots: &Topic<OperationSnapshot>) {
    record_tick(bb, op.snapshot(), *op.config());
    snapshots.publish(op.snapshot());
}

/// Periodically logs the blackboard and flags a stalled tick loop.
pub async fn status_task(bb: Blackboard, interval: Duration, stall_timeout: Duration) -> anyhow::Result<()> {
    info!("Status task started.");
    let mut tick = time::interval(interval);
    loop {
        tick.tick().await;
        let state = snapshot(&bb);
        let age = Instant::now() - state.last_tick_ts;
        if age > stall_timeout {
            warn!(?age, "Tick loop stalled!");
            raise_fault(&bb, "tick loop stalled");
        }
        let s = &state.snapshot;
        info!(
            status = %s.phase,
            source = %state.config.source,
            dest = %state.config.dest,
            position = %s.position,
            lift = s.lift_height,
            carrying = s.carrying,
            runs = s.runs_completed,
            faults = state.faults.len(),
            "Forklift status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CommandBus;
    use forklift_core::{OperationConfig, WarehouseAddress};
    use std::sync::Arc;
    use tokio::sync::broadcast::error::RecvError;

    fn fast_settings() -> SimulationSettings {
        SimulationSettings {
            tick_hz: 1000,
            status_interval_ms: 1000,
            stall_timeout_ms: 250,
            auto_start: false,
            auto_repeat: false,
        }
    }

    fn fast_operation() -> Operation {
        let params = forklift_core::OperationParams {
            handling_delay: Duration::from_millis(5),
            ..Default::default()
        };
        Operation::new(
            forklift_core::Layout::default(),
            forklift_core::HighwayPlanner::default(),
            forklift_core::MotionProfile::default(),
            params,
            OperationConfig::default(),
        )
        .unwrap()
    }

    async fn wait_for<F>(rx: &mut tokio::sync::broadcast::Receiver<Arc<OperationSnapshot>>, done: F)
    where
        F: Fn(&OperationSnapshot) -> bool,
    {
        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(s) if done(&s) => return,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => panic!("snapshot topic closed"),
                }
            }
        };
        time::timeout(Duration::from_secs(30), wait).await.expect("timed out waiting for snapshot");
    }

    #[tokio::test]
    async fn test_controller_completes_a_run() {
        let bb: Blackboard = Arc::default();
        let topic = Topic::new(64);
        let mut rx = topic.subscribe();
        let (bus, commands) = CommandBus::channel();
        let handle = tokio::spawn(run_controller(fast_operation(), fast_settings(), bb.clone(), commands, topic));

        assert!(bus.send(Command::Start));
        wait_for(&mut rx, |s| s.runs_completed == 1).await;

        let state = snapshot(&bb);
        assert_eq!(state.snapshot.phase, OperationPhase::Idle);
        assert_eq!(state.snapshot.lift_height, 0.0);
        assert!(!state.snapshot.carrying);

        drop(bus);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_rejected_commands_become_faults() {
        let bb: Blackboard = Arc::default();
        let topic = Topic::new(64);
        let mut rx = topic.subscribe();
        let (bus, commands) = CommandBus::channel();
        // slow enough that the run cannot finish before the reset below
        let settings = SimulationSettings { tick_hz: 100, ..fast_settings() };
        let handle = tokio::spawn(run_controller(fast_operation(), settings, bb.clone(), commands, topic));

        bus.send(Command::Configure(OperationConfig {
            source: WarehouseAddress::new(99, 1, 1, 1),
            dest: WarehouseAddress::new(1, 1, 1, 1),
        }));
        bus.send(Command::Start);
        bus.send(Command::Start);
        wait_for(&mut rx, |s| s.phase == OperationPhase::MovingToSource).await;

        for _ in 0..100 {
            if snapshot(&bb).faults.len() == 2 {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        let faults = snapshot(&bb).faults;
        assert_eq!(faults.len(), 2, "{:?}", faults);
        assert_eq!(snapshot(&bb).config, OperationConfig::default());

        bus.send(Command::Reset);
        wait_for(&mut rx, |s| s.phase == OperationPhase::Idle && s.runs_completed == 0).await;
        assert!(snapshot(&bb).faults.is_empty());

        drop(bus);
        handle.await.unwrap().unwrap();
    }
}
