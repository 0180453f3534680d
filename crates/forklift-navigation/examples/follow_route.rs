use forklift_navigation::*;
use warehouse_layout::{Layout, WarehouseAddress};

fn main() {
    let layout = Layout::default();
    let home = Position3::new(0.0, 0.0, -5.0);
    let address = WarehouseAddress::new(3, 2, 1, 2);

    let target = match layout.aisle_standoff_of(&address) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Cannot resolve {}: {}", address, e);
            return;
        }
    };

    let planner = HighwayPlanner::default();
    let route = planner.plan_path(home, target);
    println!("Planning from {} to slot {} standoff {}", home, address, target);
    println!("  {}", route);
    println!("  Length: {:.2} m", route.total_length(home));

    let mut executor = match MotionExecutor::new(MotionProfile::default(), home) {
        Ok(executor) => executor,
        Err(e) => {
            eprintln!("Failed to initialize executor: {}", e);
            return;
        }
    };
    executor.set_route(route);

    let mut tick = 0u32;
    loop {
        tick += 1;
        match executor.step_motion() {
            MotionStatus::Moving => {
                if tick % 10 == 0 {
                    println!("Tick {:>4}: {}", tick, executor.pose());
                }
            }
            MotionStatus::WaypointReached(at) => println!("Tick {:>4}: waypoint {} reached", tick, at),
            MotionStatus::Arrived => {
                println!("Tick {:>4}: arrived at {}", tick, executor.pose());
                break;
            }
        }
    }

    while executor.step_lift(1.5) == LiftStatus::Moving {
        tick += 1;
    }
    println!("Tick {:>4}: forks settled at {:.2}", tick, executor.pose().lift_height);
}
