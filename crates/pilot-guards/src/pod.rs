//! Identity → pod assignment ledger. The pipeline defaults its pod scope from
//! this when a caller omits `pod_id`. Dissolution is terminal: a dissolved
//! assignment never takes new pods.

use serde::{Deserialize, Serialize};

use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PodEvent {
    Assign { event_id: String, stamp: Stamp, pod_id: String },
    Unassign { event_id: String, stamp: Stamp },
    Dissolve { event_id: String, stamp: Stamp },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PodAssignment {
    pub pod_id: Option<String>,
    pub dissolved: bool,
}

pub fn fold(events: &[PodEvent]) -> PodAssignment {
    let mut state = PodAssignment::default();
    for event in events {
        match event {
            PodEvent::Assign { pod_id, .. } if !state.dissolved => {
                state.pod_id = Some(pod_id.clone())
            }
            PodEvent::Assign { .. } => {}
            PodEvent::Unassign { .. } => state.pod_id = None,
            PodEvent::Dissolve { .. } => {
                state.pod_id = None;
                state.dissolved = true;
            }
        }
    }
    state
}

pub fn current_pod(store: &Store, identity: &str) -> Option<String> {
    fold(&store.read_events(Family::Pod, identity)).pod_id
}

fn append(store: &Store, identity: &str, kind: &str, build: impl FnOnce(String, Stamp) -> PodEvent) {
    let stamp = store.next_stamp(Family::Pod, identity);
    let event = build(event_id(identity, &stamp, kind), stamp);
    store.append_event(Family::Pod, identity, &event);
}

pub fn assign(store: &Store, identity: &str, pod_id: &str) {
    let pod_id = pod_id.to_string();
    append(store, identity, "assign", |event_id, stamp| PodEvent::Assign {
        event_id,
        stamp,
        pod_id,
    });
}

pub fn unassign(store: &Store, identity: &str) {
    append(store, identity, "unassign", |event_id, stamp| PodEvent::Unassign { event_id, stamp });
}

pub fn dissolve(store: &Store, identity: &str) {
    append(store, identity, "dissolve", |event_id, stamp| PodEvent::Dissolve { event_id, stamp });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_assignment_wins() {
        let store = Store::memory();
        assert_eq!(current_pod(&store, "u:1"), None);
        assign(&store, "u:1", "pod-a");
        assign(&store, "u:1", "pod-b");
        assert_eq!(current_pod(&store, "u:1"), Some("pod-b".to_string()));
        unassign(&store, "u:1");
        assert_eq!(current_pod(&store, "u:1"), None);
    }

    #[test]
    fn dissolution_is_sticky() {
        let store = Store::memory();
        assign(&store, "u:1", "pod-a");
        dissolve(&store, "u:1");
        assign(&store, "u:1", "pod-b");
        let state = fold(&store.read_events(Family::Pod, "u:1"));
        assert!(state.dissolved);
        assert_eq!(state.pod_id, None, "a dissolved assignment never revives");
    }
}
