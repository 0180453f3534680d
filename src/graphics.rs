use macroquad::prelude::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use forklift_core::{Layout, OperationSnapshot, Position3, WarehouseAddress};

use crate::blackboard::{Blackboard, snapshot};
use crate::bus::{Command, CommandBus};

// Function to configure the macroquad window
pub fn window_conf() -> Conf {
    Conf {
        window_title: "Forklift Operations Center".to_string(),
        window_width: 1024,
        window_height: 768,
        high_dpi: true,
        ..Default::default()
    }
}

const MARGIN: f32 = 40.0;
const HUD_HEIGHT: f32 = 110.0;
const FORKLIFT_SIZE: f32 = 12.0;

/// Top-down mapping from the floor plane (x, z) to screen pixels.
struct Viewport {
    min_x: f64,
    min_z: f64,
    scale: f32,
}

impl Viewport {
    fn fit(layout: &Layout, highway_z: f64, home: Position3) -> Self {
        let dims = layout.dimensions();
        let config = layout.config();
        let min_x = -(dims.rack_depth + layout.aisle_offset() + 3.0);
        let max_x = f64::from(config.streets) * dims.street_pitch();
        let min_z = highway_z.min(home.z) - 2.0;
        let max_z = f64::from(config.racks_per_street) * dims.rack_pitch() + 1.0;

        let sx = (screen_width() - 2.0 * MARGIN) / (max_x - min_x) as f32;
        let sy = (screen_height() - 2.0 * MARGIN - HUD_HEIGHT) / (max_z - min_z) as f32;
        Viewport { min_x, min_z, scale: sx.min(sy) }
    }

    fn project(&self, x: f64, z: f64) -> Vec2 {
        vec2(
            MARGIN + (x - self.min_x) as f32 * self.scale,
            HUD_HEIGHT + MARGIN + (z - self.min_z) as f32 * self.scale,
        )
    }
}

fn draw_racks(layout: &Layout, view: &Viewport, source: &WarehouseAddress, dest: &WarehouseAddress) {
    let dims = layout.dimensions();
    let config = layout.config();
    let depth = dims.rack_depth as f32 * view.scale;
    let width = dims.rack_width as f32 * view.scale;

    for street in 1..=config.streets {
        for rack in 1..=config.racks_per_street {
            let x = f64::from(street - 1) * dims.street_pitch();
            let z = f64::from(rack - 1) * dims.rack_pitch();
            let corner = view.project(x - dims.rack_depth / 2.0, z - dims.rack_width / 2.0);
            let color = if (street, rack) == (source.street, source.rack) {
                RED
            } else if (street, rack) == (dest.street, dest.rack) {
                GREEN
            } else {
                GRAY
            };
            draw_rectangle(corner.x, corner.y, depth, width, color);
            draw_rectangle_lines(corner.x, corner.y, depth, width, 1.0, DARKGRAY);
        }
        let label = view.project(f64::from(street - 1) * dims.street_pitch(), -1.5);
        draw_text(&format!("S{}", street), label.x - 8.0, label.y, 18.0, DARKGRAY);
    }
}

fn draw_forklift(view: &Viewport, s: &OperationSnapshot) {
    let centre = view.project(s.position.x, s.position.z);
    // Yaw is zero along +z, which points down the screen.
    let h = s.heading as f32;
    let dir = vec2(h.sin(), h.cos());
    let side = vec2(dir.y, -dir.x);
    let nose = centre + dir * FORKLIFT_SIZE;
    let left = centre - dir * FORKLIFT_SIZE * 0.6 + side * FORKLIFT_SIZE * 0.6;
    let right = centre - dir * FORKLIFT_SIZE * 0.6 - side * FORKLIFT_SIZE * 0.6;
    draw_triangle(nose, left, right, GOLD);
    draw_triangle_lines(nose, left, right, 1.5, BLACK);
    if s.carrying {
        draw_rectangle(nose.x - 4.0, nose.y - 4.0, 8.0, 8.0, ORANGE);
    }
}

pub async fn run_visualization_loop(
    mut snapshot_rx: broadcast::Receiver<Arc<OperationSnapshot>>,
    commands: CommandBus,
    bb: Blackboard,
    layout: Layout,
    highway_z: f64,
    home: Position3,
) {
    let mut current = OperationSnapshot::default();
    let mut first_snapshot_received = false;

    info!("Visualization loop starting. Space: start, R: reset, N: swap source and destination.");

    loop {
        match snapshot_rx.try_recv() {
            Ok(snapshot_arc) => {
                current = *snapshot_arc;
                first_snapshot_received = true;
                // Drain to the newest snapshot.
                while let Ok(newer) = snapshot_rx.try_recv() {
                    current = *newer;
                }
            }
            Err(broadcast::error::TryRecvError::Empty) => {}
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!("Visualization snapshot receiver lagged by {} messages.", n);
            }
            Err(broadcast::error::TryRecvError::Closed) => {
                error!("Snapshot channel closed. Exiting visualization loop.");
                break;
            }
        }

        if is_key_pressed(KeyCode::Space) {
            commands.send(Command::Start);
        }
        if is_key_pressed(KeyCode::R) {
            commands.send(Command::Reset);
        }
        if is_key_pressed(KeyCode::N) {
            commands.send(Command::SwapRoute);
        }
        if is_key_pressed(KeyCode::Escape) {
            info!("Escape pressed. Closing viewer.");
            break;
        }

        let state = snapshot(&bb);
        let view = Viewport::fit(&layout, highway_z, home);

        clear_background(LIGHTGRAY);

        let west = view.project(view.min_x, highway_z);
        let east = view.project(
            f64::from(layout.config().streets) * layout.dimensions().street_pitch(),
            highway_z,
        );
        draw_line(west.x, west.y, east.x, east.y, 4.0, Color::from_rgba(250, 204, 21, 255));
        let home_px = view.project(home.x, home.z);
        draw_circle_lines(home_px.x, home_px.y, 8.0, 2.0, DARKBLUE);

        draw_racks(&layout, &view, &state.config.source, &state.config.dest);
        if first_snapshot_received {
            draw_forklift(&view, &current);
        }

        draw_text(&format!("Status: {}", current.phase), 10.0, 24.0, 26.0, BLACK);
        draw_text(
            &format!(
                "Source {}  ->  Destination {}   runs: {}",
                state.config.source, state.config.dest, current.runs_completed
            ),
            10.0,
            48.0,
            20.0,
            BLACK,
        );
        draw_text(
            &format!(
                "Forklift: {}  heading {:.2}  lift {:.2}  waypoints {}",
                current.position, current.heading, current.lift_height, current.waypoints_left
            ),
            10.0,
            70.0,
            20.0,
            BLACK,
        );
        if let Some(fault) = state.faults.last() {
            draw_text(&format!("Last fault: {}", fault), 10.0, 92.0, 20.0, RED);
        } else {
            draw_text("Space: start   R: reset   N: swap route   Esc: quit", 10.0, 92.0, 20.0, DARKGRAY);
        }

        next_frame().await
    }
}
