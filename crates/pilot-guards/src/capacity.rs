//! Per-pod capacity ledger: the active-load counter and the cooling-state
//! mirror the pipeline consults for the growth-during-repair guard.

use serde::{Deserialize, Serialize};

use pilot_core::constants::{DEFAULT_MAX_CONCURRENT_ACTIONS, DEFAULT_RECOVERY_RATE};
use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store};

/// Shared by the capacity mirror and the cooling window assessment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoolingMode {
    #[default]
    Normal,
    Cooling,
    Repair,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CapacityEvent {
    Configure {
        event_id: String,
        stamp: Stamp,
        max_concurrent_actions: u32,
        recovery_rate: u32,
    },
    LoadInc { event_id: String, stamp: Stamp },
    LoadDec { event_id: String, stamp: Stamp },
    Defer { event_id: String, stamp: Stamp },
    Pause { event_id: String, stamp: Stamp },
    Resume { event_id: String, stamp: Stamp },
    CoolingEnter { event_id: String, stamp: Stamp },
    CoolingExit { event_id: String, stamp: Stamp },
    RepairEnter { event_id: String, stamp: Stamp },
    RepairExit { event_id: String, stamp: Stamp },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapacityState {
    pub max_concurrent_actions: u32,
    /// Never negative: decrements saturate at zero.
    pub active_load: u32,
    pub recovery_rate: u32,
    pub cooling_state: CoolingMode,
    pub defer_count: u32,
}

impl Default for CapacityState {
    fn default() -> Self {
        Self {
            max_concurrent_actions: DEFAULT_MAX_CONCURRENT_ACTIONS,
            active_load: 0,
            recovery_rate: DEFAULT_RECOVERY_RATE,
            cooling_state: CoolingMode::Normal,
            defer_count: 0,
        }
    }
}

pub fn fold(events: &[CapacityEvent]) -> CapacityState {
    let mut state = CapacityState::default();
    for event in events {
        match event {
            CapacityEvent::Configure { max_concurrent_actions, recovery_rate, .. } => {
                state.max_concurrent_actions = *max_concurrent_actions;
                state.recovery_rate = *recovery_rate;
            }
            CapacityEvent::LoadInc { .. } => state.active_load += 1,
            CapacityEvent::LoadDec { .. } => {
                state.active_load = state.active_load.saturating_sub(1)
            }
            CapacityEvent::Defer { .. } => state.defer_count += 1,
            CapacityEvent::Pause { .. } | CapacityEvent::CoolingEnter { .. } => {
                state.cooling_state = CoolingMode::Cooling
            }
            CapacityEvent::RepairEnter { .. } => state.cooling_state = CoolingMode::Repair,
            CapacityEvent::Resume { .. }
            | CapacityEvent::CoolingExit { .. }
            | CapacityEvent::RepairExit { .. } => state.cooling_state = CoolingMode::Normal,
        }
    }
    state
}

pub fn load(store: &Store, pod: &str) -> CapacityState {
    fold(&store.read_events(Family::Capacity, pod))
}

fn append(store: &Store, pod: &str, kind: &str, build: impl FnOnce(String, Stamp) -> CapacityEvent) {
    let stamp = store.next_stamp(Family::Capacity, pod);
    let event = build(event_id(pod, &stamp, kind), stamp);
    store.append_event(Family::Capacity, pod, &event);
}

pub fn configure(store: &Store, pod: &str, max_concurrent_actions: u32, recovery_rate: u32) {
    append(store, pod, "configure", |event_id, stamp| CapacityEvent::Configure {
        event_id,
        stamp,
        max_concurrent_actions,
        recovery_rate,
    });
}

pub fn load_inc(store: &Store, pod: &str) {
    append(store, pod, "load_inc", |event_id, stamp| CapacityEvent::LoadInc { event_id, stamp });
}

pub fn load_dec(store: &Store, pod: &str) {
    append(store, pod, "load_dec", |event_id, stamp| CapacityEvent::LoadDec { event_id, stamp });
}

pub fn record_defer(store: &Store, pod: &str) {
    append(store, pod, "defer", |event_id, stamp| CapacityEvent::Defer { event_id, stamp });
}

pub fn pause(store: &Store, pod: &str) {
    append(store, pod, "pause", |event_id, stamp| CapacityEvent::Pause { event_id, stamp });
}

pub fn resume(store: &Store, pod: &str) {
    append(store, pod, "resume", |event_id, stamp| CapacityEvent::Resume { event_id, stamp });
}

pub fn enter_cooling(store: &Store, pod: &str) {
    append(store, pod, "cooling_enter", |event_id, stamp| CapacityEvent::CoolingEnter {
        event_id,
        stamp,
    });
}

pub fn exit_cooling(store: &Store, pod: &str) {
    append(store, pod, "cooling_exit", |event_id, stamp| CapacityEvent::CoolingExit {
        event_id,
        stamp,
    });
}

pub fn enter_repair(store: &Store, pod: &str) {
    append(store, pod, "repair_enter", |event_id, stamp| CapacityEvent::RepairEnter {
        event_id,
        stamp,
    });
}

pub fn exit_repair(store: &Store, pod: &str) {
    append(store, pod, "repair_exit", |event_id, stamp| CapacityEvent::RepairExit {
        event_id,
        stamp,
    });
}

/// Repair can only be left once the pod has fully drained.
pub fn can_exit_repair(state: &CapacityState) -> bool {
    state.cooling_state == CoolingMode::Repair && state.active_load == 0
}
