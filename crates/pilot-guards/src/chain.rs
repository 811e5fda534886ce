//! Per-thread action chain: attempt depth since the last reset.

use serde::{Deserialize, Serialize};

use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent {
    Reset { event_id: String, stamp: Stamp },
    Attempt { event_id: String, stamp: Stamp },
    Blocked { event_id: String, stamp: Stamp },
    Complete { event_id: String, stamp: Stamp },
}

/// Attempts strictly after the last reset.
pub fn depth(events: &[ChainEvent]) -> u32 {
    let mut depth = 0;
    for event in events {
        match event {
            ChainEvent::Reset { .. } => depth = 0,
            ChainEvent::Attempt { .. } => depth += 1,
            ChainEvent::Blocked { .. } | ChainEvent::Complete { .. } => {}
        }
    }
    depth
}

pub fn load_depth(store: &Store, thread: &str) -> u32 {
    depth(&store.read_events(Family::Chain, thread))
}

fn append(store: &Store, thread: &str, kind: &str, build: impl FnOnce(String, Stamp) -> ChainEvent) {
    let stamp = store.next_stamp(Family::Chain, thread);
    let event = build(event_id(thread, &stamp, kind), stamp);
    store.append_event(Family::Chain, thread, &event);
}

pub fn record_attempt(store: &Store, thread: &str) {
    append(store, thread, "attempt", |event_id, stamp| ChainEvent::Attempt { event_id, stamp });
}

pub fn record_blocked(store: &Store, thread: &str) {
    append(store, thread, "blocked", |event_id, stamp| ChainEvent::Blocked { event_id, stamp });
}

pub fn record_complete(store: &Store, thread: &str) {
    append(store, thread, "complete", |event_id, stamp| ChainEvent::Complete { event_id, stamp });
}

pub fn reset(store: &Store, thread: &str) {
    append(store, thread, "reset", |event_id, stamp| ChainEvent::Reset { event_id, stamp });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_attempts_since_last_reset() {
        let store = Store::memory();
        record_attempt(&store, "t1");
        record_attempt(&store, "t1");
        record_complete(&store, "t1");
        assert_eq!(load_depth(&store, "t1"), 2);

        reset(&store, "t1");
        assert_eq!(load_depth(&store, "t1"), 0);

        record_attempt(&store, "t1");
        assert_eq!(load_depth(&store, "t1"), 1);
    }

    #[test]
    fn blocked_events_do_not_deepen_the_chain() {
        let store = Store::memory();
        record_attempt(&store, "t1");
        record_blocked(&store, "t1");
        record_blocked(&store, "t1");
        assert_eq!(load_depth(&store, "t1"), 1);
    }
}
