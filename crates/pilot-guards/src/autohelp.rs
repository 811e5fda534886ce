//! Per-thread auto-help signal: one outstanding signal at a time.

use serde::{Deserialize, Serialize};

use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutoHelpEvent {
    AutoHelp { event_id: String, stamp: Stamp },
    Ack { event_id: String, stamp: Stamp },
}

pub fn has_unacked(events: &[AutoHelpEvent]) -> bool {
    let mut unacked = false;
    for event in events {
        match event {
            AutoHelpEvent::AutoHelp { .. } => unacked = true,
            AutoHelpEvent::Ack { .. } => unacked = false,
        }
    }
    unacked
}

pub fn load_unacked(store: &Store, thread: &str) -> bool {
    has_unacked(&store.read_events(Family::AutoHelp, thread))
}

pub fn record_signal(store: &Store, thread: &str) {
    let stamp = store.next_stamp(Family::AutoHelp, thread);
    let event = AutoHelpEvent::AutoHelp {
        event_id: event_id(thread, &stamp, "auto_help"),
        stamp,
    };
    store.append_event(Family::AutoHelp, thread, &event);
}

pub fn acknowledge(store: &Store, thread: &str) {
    let stamp = store.next_stamp(Family::AutoHelp, thread);
    let event = AutoHelpEvent::Ack { event_id: event_id(thread, &stamp, "ack"), stamp };
    store.append_event(Family::AutoHelp, thread, &event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_blocks_until_acknowledged() {
        let store = Store::memory();
        assert!(!load_unacked(&store, "t1"));
        record_signal(&store, "t1");
        assert!(load_unacked(&store, "t1"));
        acknowledge(&store, "t1");
        assert!(!load_unacked(&store, "t1"));
        record_signal(&store, "t1");
        assert!(load_unacked(&store, "t1"));
    }
}
