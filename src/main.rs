mod blackboard;
mod bus;
mod config;
mod controller;
mod graphics;

use blackboard::Blackboard;
use bus::{CommandBus, Topic};
use forklift_core::OperationSnapshot;
use graphics::window_conf;

use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Forklift simulator starting. Loading configuration...");

    let settings = match config::load_config() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Cannot start without configuration: {}", e);
            return;
        }
    };
    let operation = match settings.build_operation() {
        Ok(operation) => operation,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return;
        }
    };

    let layout = *operation.layout();

    let tokio_rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start Tokio runtime: {}", e);
            return;
        }
    };

    let bb: Blackboard = Arc::default();
    let snapshot_topic: Topic<OperationSnapshot> = Topic::new(16);
    let snapshot_rx_for_vis = snapshot_topic.subscribe();
    let (command_bus, command_rx) = CommandBus::channel();

    tokio_rt.spawn({
        let bb = Arc::clone(&bb);
        let sim = settings.simulation.clone();
        async move {
            match controller::run_controller(operation, sim, bb, command_rx, snapshot_topic).await {
                Ok(()) => info!("Controller finished."),
                Err(e) => error!("Controller failed: {:?}", e),
            }
        }
    });

    tokio_rt.spawn({
        let bb = Arc::clone(&bb);
        let interval = Duration::from_millis(settings.simulation.status_interval_ms.max(1));
        let stall_timeout = Duration::from_millis(settings.simulation.stall_timeout_ms);
        async move {
            if let Err(e) = controller::status_task(bb, interval, stall_timeout).await {
                error!("Status task failed: {:?}", e);
            }
        }
    });

    graphics::run_visualization_loop(
        snapshot_rx_for_vis,
        command_bus,
        bb,
        layout,
        settings.navigation.highway_z,
        settings.operation.home,
    )
    .await;

    info!("Viewer closed. Shutting down.");
    tokio_rt.shutdown_timeout(Duration::from_millis(500));
}
