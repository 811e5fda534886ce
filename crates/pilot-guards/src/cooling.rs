//! Per-pod cooling windows.
//!
//! A window accumulates deferral and burnout signals; the assessment derives
//! a cooling mode from them in strict priority order, and `reassess` mirrors
//! mode changes onto the capacity ledger so both ledgers agree. Repair is a
//! latch: entering is automatic, leaving requires the pod to have drained.

use serde::{Deserialize, Serialize};
use tracing::info;

use pilot_core::constants::{
    DEFAULT_DEFERRAL_THRESHOLD, DEFAULT_REPAIR_THRESHOLD, DEFAULT_WINDOW_MAX_NEW,
};
use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store};

use crate::capacity::{self, CoolingMode};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoolingEvent {
    /// Opens a new window, resetting all counters.
    Configure {
        event_id: String,
        stamp: Stamp,
        window_id: String,
        max_new: u32,
        deferral_threshold: u32,
        repair_threshold: u32,
    },
    NewItem { event_id: String, stamp: Stamp },
    Deferral { event_id: String, stamp: Stamp },
    Burnout { event_id: String, stamp: Stamp },
    Pause { event_id: String, stamp: Stamp },
    Resume { event_id: String, stamp: Stamp },
    RepairEnter { event_id: String, stamp: Stamp },
    RepairExit { event_id: String, stamp: Stamp },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoolingWindowState {
    pub window_id: String,
    pub max_new: u32,
    pub new_count: u32,
    pub deferral_count: u32,
    pub burnout_signals: u32,
    pub paused: bool,
    /// The recorded repair latch; the effective mode comes from [`assess`].
    pub cooling_state: CoolingMode,
    pub deferral_threshold: u32,
    pub repair_threshold: u32,
}

impl Default for CoolingWindowState {
    fn default() -> Self {
        Self {
            window_id: "w:default".to_string(),
            max_new: DEFAULT_WINDOW_MAX_NEW,
            new_count: 0,
            deferral_count: 0,
            burnout_signals: 0,
            paused: false,
            cooling_state: CoolingMode::Normal,
            deferral_threshold: DEFAULT_DEFERRAL_THRESHOLD,
            repair_threshold: DEFAULT_REPAIR_THRESHOLD,
        }
    }
}

pub fn fold(events: &[CoolingEvent]) -> CoolingWindowState {
    let mut state = CoolingWindowState::default();
    for event in events {
        match event {
            CoolingEvent::Configure {
                window_id,
                max_new,
                deferral_threshold,
                repair_threshold,
                ..
            } => {
                state = CoolingWindowState {
                    window_id: window_id.clone(),
                    max_new: *max_new,
                    deferral_threshold: *deferral_threshold,
                    repair_threshold: *repair_threshold,
                    // The repair latch survives window turnover.
                    cooling_state: state.cooling_state,
                    ..CoolingWindowState::default()
                };
            }
            CoolingEvent::NewItem { .. } => state.new_count += 1,
            CoolingEvent::Deferral { .. } => state.deferral_count += 1,
            CoolingEvent::Burnout { .. } => state.burnout_signals += 1,
            CoolingEvent::Pause { .. } => state.paused = true,
            CoolingEvent::Resume { .. } => state.paused = false,
            CoolingEvent::RepairEnter { .. } => state.cooling_state = CoolingMode::Repair,
            CoolingEvent::RepairExit { .. } => state.cooling_state = CoolingMode::Normal,
        }
    }
    state
}

pub fn load(store: &Store, pod: &str) -> CoolingWindowState {
    fold(&store.read_events(Family::Cooling, pod))
}

/// Assessment priority: active repair > paused > burnout > repair threshold >
/// deferral threshold > window saturation > normal.
pub fn assess(state: &CoolingWindowState) -> CoolingMode {
    if state.cooling_state == CoolingMode::Repair {
        return CoolingMode::Repair;
    }
    if state.paused {
        return CoolingMode::Cooling;
    }
    if state.burnout_signals > 0 {
        return CoolingMode::Cooling;
    }
    if state.deferral_count >= state.repair_threshold {
        return CoolingMode::Repair;
    }
    if state.deferral_count >= state.deferral_threshold {
        return CoolingMode::Cooling;
    }
    if state.new_count >= state.max_new {
        return CoolingMode::Cooling;
    }
    CoolingMode::Normal
}

/// Read-only view of the assessed mode.
pub fn get_cooling_state(store: &Store, pod: &str) -> CoolingMode {
    assess(&load(store, pod))
}

fn append(store: &Store, pod: &str, kind: &str, build: impl FnOnce(String, Stamp) -> CoolingEvent) {
    let stamp = store.next_stamp(Family::Cooling, pod);
    let event = build(event_id(pod, &stamp, kind), stamp);
    store.append_event(Family::Cooling, pod, &event);
}

pub fn open_window(
    store: &Store,
    pod: &str,
    window_id: &str,
    max_new: u32,
    deferral_threshold: u32,
    repair_threshold: u32,
) {
    let window_id = window_id.to_string();
    append(store, pod, "configure", |event_id, stamp| CoolingEvent::Configure {
        event_id,
        stamp,
        window_id,
        max_new,
        deferral_threshold,
        repair_threshold,
    });
}

pub fn record_new(store: &Store, pod: &str) {
    append(store, pod, "new_item", |event_id, stamp| CoolingEvent::NewItem { event_id, stamp });
}

pub fn record_deferral(store: &Store, pod: &str) {
    append(store, pod, "deferral", |event_id, stamp| CoolingEvent::Deferral { event_id, stamp });
}

pub fn record_burnout(store: &Store, pod: &str) {
    append(store, pod, "burnout", |event_id, stamp| CoolingEvent::Burnout { event_id, stamp });
}

pub fn pause(store: &Store, pod: &str) {
    append(store, pod, "pause", |event_id, stamp| CoolingEvent::Pause { event_id, stamp });
}

pub fn resume(store: &Store, pod: &str) {
    append(store, pod, "resume", |event_id, stamp| CoolingEvent::Resume { event_id, stamp });
}

/// Recompute the assessment and mirror any mode change onto the capacity
/// ledger. Repair is only entered here, never left — see [`try_exit_repair`].
pub fn reassess(store: &Store, pod: &str) -> CoolingMode {
    let window = load(store, pod);
    let assessed = assess(&window);
    let cap = capacity::load(store, pod);
    if assessed != cap.cooling_state {
        info!(pod, from = ?cap.cooling_state, to = ?assessed, "cooling reassessment");
        match assessed {
            CoolingMode::Repair => {
                capacity::enter_repair(store, pod);
                if window.cooling_state != CoolingMode::Repair {
                    append(store, pod, "repair_enter", |event_id, stamp| {
                        CoolingEvent::RepairEnter { event_id, stamp }
                    });
                }
            }
            CoolingMode::Cooling => capacity::enter_cooling(store, pod),
            CoolingMode::Normal => {
                // Repair never auto-clears; only cooling does.
                if cap.cooling_state == CoolingMode::Cooling {
                    capacity::exit_cooling(store, pod);
                }
            }
        }
    }
    assessed
}

/// Leave repair on both ledgers, but only once the pod has drained.
pub fn try_exit_repair(store: &Store, pod: &str) -> bool {
    let cap = capacity::load(store, pod);
    if !capacity::can_exit_repair(&cap) {
        return false;
    }
    capacity::exit_repair(store, pod);
    if load(store, pod).cooling_state == CoolingMode::Repair {
        append(store, pod, "repair_exit", |event_id, stamp| CoolingEvent::RepairExit {
            event_id,
            stamp,
        });
    }
    true
}
