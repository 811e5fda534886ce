//! Retry decay: cooldown steps grow with failures and never shrink.

use serde::{Deserialize, Serialize};

use pilot_core::constants::RETRY_BASE_COOLDOWN_STEPS;
use pilot_core::{OutcomeKind, Stamp};
use pilot_store::{event_id, Family, Store, GLOBAL_SCOPE};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryEvent {
    Outcome {
        event_id: String,
        stamp: Stamp,
        retry_key: String,
        result: OutcomeKind,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    pub attempts: u32,
    pub failures: u32,
}

impl RetryState {
    /// Zero until the first failure, then base + failures. Monotone
    /// non-decreasing over any event sequence.
    pub fn required_cooldown_steps(&self) -> u32 {
        if self.failures > 0 {
            RETRY_BASE_COOLDOWN_STEPS + self.failures
        } else {
            0
        }
    }
}

pub fn fold(events: &[RetryEvent], key: &str) -> RetryState {
    let mut state = RetryState::default();
    for RetryEvent::Outcome { retry_key, result, .. } in events {
        if retry_key != key {
            continue;
        }
        state.attempts += 1;
        if *result != OutcomeKind::Executed {
            state.failures += 1;
        }
    }
    state
}

pub fn load(store: &Store, key: &str) -> RetryState {
    fold(&store.read_events(Family::RetryDecay, GLOBAL_SCOPE), key)
}

pub fn record(store: &Store, key: &str, result: OutcomeKind) {
    let stamp = store.next_stamp(Family::RetryDecay, GLOBAL_SCOPE);
    let event = RetryEvent::Outcome {
        event_id: event_id(key, &stamp, "outcome"),
        stamp,
        retry_key: key.to_string(),
        result,
    };
    store.append_event(Family::RetryDecay, GLOBAL_SCOPE, &event);
}

pub fn cooldown_active(state: &RetryState, steps_waited: u32) -> bool {
    steps_waited < state.required_cooldown_steps()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executed_outcomes_count_attempts_only() {
        let store = Store::memory();
        record(&store, "k1", OutcomeKind::Executed);
        let state = load(&store, "k1");
        assert_eq!(state.attempts, 1);
        assert_eq!(state.failures, 0);
        assert_eq!(state.required_cooldown_steps(), 0);
    }

    #[test]
    fn cooldown_grows_monotonically_with_failures() {
        let store = Store::memory();
        let mut previous = 0;
        for result in [
            OutcomeKind::Deferred,
            OutcomeKind::Executed,
            OutcomeKind::Halted,
            OutcomeKind::Deferred,
        ] {
            record(&store, "k1", result);
            let steps = load(&store, "k1").required_cooldown_steps();
            assert!(steps >= previous, "cooldown may never shrink");
            previous = steps;
        }
        // Three non-executed outcomes: base + 3.
        assert_eq!(previous, RETRY_BASE_COOLDOWN_STEPS + 3);
    }

    #[test]
    fn keys_are_independent() {
        let store = Store::memory();
        record(&store, "k1", OutcomeKind::Halted);
        assert_eq!(load(&store, "k2"), RetryState::default());
    }

    #[test]
    fn cooldown_clears_once_enough_steps_pass() {
        let store = Store::memory();
        record(&store, "k1", OutcomeKind::Deferred);
        let state = load(&store, "k1");
        assert!(cooldown_active(&state, 0));
        assert!(!cooldown_active(&state, state.required_cooldown_steps()));
    }
}
