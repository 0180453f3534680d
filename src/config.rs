use std::time::Duration;

use anyhow::Context;
use config::{Config, ConfigError, Environment, File, FileFormat};
use forklift_core::{
    HighwayPlanner, Layout, LayoutConfig, MotionProfile, Operation, OperationConfig, OperationParams,
    Position3, RackDimensions,
};
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationSettings {
    pub highway_z: f64,
    pub highway_tolerance: f64,
    pub aisle_offset: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationSettings {
    pub pick_offset: f64,
    pub travel_height: f64,
    pub handling_delay_ms: u64,
    pub home: Position3,
    pub run: OperationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    pub tick_hz: u32,
    pub status_interval_ms: u64,
    /// The status task flags the tick loop as stalled past this age.
    pub stall_timeout_ms: u64,
    /// Start a run as soon as the controller is up.
    pub auto_start: bool,
    /// After each completed run, swap source and destination and go again.
    pub auto_repeat: bool,
}

impl SimulationSettings {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

/// Everything read from `config/default.toml` and `FORKLIFT__*` overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub layout: LayoutConfig,
    pub dimensions: RackDimensions,
    pub navigation: NavigationSettings,
    pub motion: MotionProfile,
    pub operation: OperationSettings,
    pub simulation: SimulationSettings,
}

impl Settings {
    pub fn warehouse(&self) -> anyhow::Result<Layout> {
        Layout::new(self.layout, self.dimensions, self.navigation.aisle_offset)
            .context("invalid warehouse layout")
    }

    pub fn planner(&self) -> anyhow::Result<HighwayPlanner> {
        HighwayPlanner::new(
            self.navigation.highway_z,
            self.navigation.highway_tolerance,
            self.motion.reached_threshold,
        )
        .context("invalid highway settings")
    }

    pub fn params(&self) -> OperationParams {
        OperationParams {
            pick_offset: self.operation.pick_offset,
            travel_height: self.operation.travel_height,
            handling_delay: Duration::from_millis(self.operation.handling_delay_ms),
            home: self.operation.home,
        }
    }

    /// Build the idle operation described by these settings.
    pub fn build_operation(&self) -> anyhow::Result<Operation> {
        let operation = Operation::new(
            self.warehouse()?,
            self.planner()?,
            self.motion,
            self.params(),
            self.operation.run,
        )
        .context("invalid operation settings")?;
        Ok(operation)
    }
}

pub fn load_config() -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix("FORKLIFT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|config| config.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!(
                streets = settings.layout.streets,
                racks_per_street = settings.layout.racks_per_street,
                levels = settings.layout.levels,
                slots_per_level = settings.layout.slots_per_level,
                tick_hz = settings.simulation.tick_hz,
                "Successfully loaded configuration"
            );
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
