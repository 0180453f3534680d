use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use forklift_core::{OperationConfig, OperationSnapshot};

const MAX_FAULTS: usize = 10;

#[derive(Clone)]
pub struct State {
    pub snapshot: OperationSnapshot,
    pub config: OperationConfig,
    pub last_tick_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            snapshot: OperationSnapshot::default(),
            config: OperationConfig::default(),
            last_tick_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn record_tick(bb: &Blackboard, snapshot: OperationSnapshot, config: OperationConfig) {
    let mut g = bb.write();
    g.snapshot = snapshot;
    g.config = config;
    g.last_tick_ts = Instant::now();
}

/// Keeps the most recent distinct faults, oldest dropped first.
pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if g.faults.iter().any(|s| s == msg) {
        return;
    }
    if g.faults.len() >= MAX_FAULTS {
        g.faults.remove(0);
    }
    g.faults.push(msg.to_string());
}

pub fn clear_faults(bb: &Blackboard) {
    bb.write().faults.clear();
}
