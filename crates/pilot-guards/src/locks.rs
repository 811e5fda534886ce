//! Advisory soft locks: per-resource exclusive holder on a global ledger.
//!
//! Advisory only — the orchestrator checks then acquires. Within one process
//! the core is single-threaded, so check-then-acquire cannot race; a
//! cross-process deployment needs a compare-and-set layer on the KV store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store, GLOBAL_SCOPE};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SoftLockEvent {
    Acquire {
        event_id: String,
        stamp: Stamp,
        resource_id: String,
        holder_pod: String,
        auto_release: bool,
    },
    Release {
        event_id: String,
        stamp: Stamp,
        resource_id: String,
        holder_pod: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pod_id: String,
    pub auto_release: bool,
    pub acquired_at: Stamp,
}

pub fn table(events: &[SoftLockEvent]) -> BTreeMap<String, LockHolder> {
    let mut held: BTreeMap<String, LockHolder> = BTreeMap::new();
    for event in events {
        match event {
            SoftLockEvent::Acquire { resource_id, holder_pod, auto_release, stamp, .. } => {
                held.insert(
                    resource_id.clone(),
                    LockHolder {
                        pod_id: holder_pod.clone(),
                        auto_release: *auto_release,
                        acquired_at: stamp.clone(),
                    },
                );
            }
            SoftLockEvent::Release { resource_id, .. } => {
                held.remove(resource_id);
            }
        }
    }
    held
}

pub fn holder(store: &Store, resource_id: &str) -> Option<LockHolder> {
    table(&store.read_events(Family::SoftLocks, GLOBAL_SCOPE)).remove(resource_id)
}

pub fn acquire(store: &Store, resource_id: &str, pod_id: &str, auto_release: bool) {
    let stamp = store.next_stamp(Family::SoftLocks, GLOBAL_SCOPE);
    let event = SoftLockEvent::Acquire {
        event_id: event_id(resource_id, &stamp, "acquire"),
        stamp,
        resource_id: resource_id.to_string(),
        holder_pod: pod_id.to_string(),
        auto_release,
    };
    store.append_event(Family::SoftLocks, GLOBAL_SCOPE, &event);
}

pub fn release(store: &Store, resource_id: &str, pod_id: &str) {
    let stamp = store.next_stamp(Family::SoftLocks, GLOBAL_SCOPE);
    let event = SoftLockEvent::Release {
        event_id: event_id(resource_id, &stamp, "release"),
        stamp,
        resource_id: resource_id.to_string(),
        holder_pod: pod_id.to_string(),
    };
    store.append_event(Family::SoftLocks, GLOBAL_SCOPE, &event);
}
