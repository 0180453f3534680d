use std::time::Duration;

use forklift_core::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = OperationConfig {
        source: WarehouseAddress::new(3, 2, 1, 2),
        dest: WarehouseAddress::new(1, 1, 1, 1),
    };
    let mut op = match Operation::with_config(config) {
        Ok(op) => op,
        Err(e) => {
            eprintln!("Failed to set up operation: {}", e);
            return;
        }
    };

    let frame = Duration::from_millis(16);
    let mut timers: Vec<(Duration, ScheduledAdvance)> = Vec::new();
    let mut events = match op.start() {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Start rejected: {}", e);
            return;
        }
    };

    // Handling delays run on the same virtual clock as the ticks.
    loop {
        for event in events.drain(..) {
            match event {
                OperationEvent::PhaseChanged { to, .. } => {
                    println!("{:>7.2}s  {}", op.elapsed().as_secs_f64(), to)
                }
                OperationEvent::HandlingScheduled(advance) => {
                    timers.push((op.elapsed() + advance.delay, advance))
                }
                _ => {}
            }
        }
        if op.phase() == OperationPhase::Idle {
            break;
        }

        events = op.tick(frame);
        let now = op.elapsed();
        let (due, waiting): (Vec<_>, Vec<_>) = timers.drain(..).partition(|(at, _)| *at <= now);
        timers = waiting;
        for (_, advance) in due {
            events.extend(op.fire(advance));
        }
    }

    println!();
    println!("Cycle complete after {} ticks.", op.ticks());
    println!("Final pose: {}", op.pose());
}
