//! Per-key send throttle.
//!
//! Precedence when evaluating a key: cooldown > deliverability flags >
//! daily cap > hourly cap. Warmup shrinks the effective caps before any cap
//! check. Throttle state is owned by the host and passed in per call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use pilot_core::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warmup {
    /// Daily ramp limit while the sending domain warms up.
    pub ramp_limit: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyCounts {
    pub sent_today: u32,
    pub sent_this_hour: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<Timestamp>,
    pub bounce_flagged: bool,
    pub complaint_flagged: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrottleState {
    pub per_day_cap: u32,
    pub per_hour_cap: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup: Option<Warmup>,
    #[serde(default)]
    pub counts_by_key: BTreeMap<String, KeyCounts>,
}

impl ThrottleState {
    pub fn new(per_day_cap: u32, per_hour_cap: u32) -> Self {
        Self { per_day_cap, per_hour_cap, warmup: None, counts_by_key: BTreeMap::new() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDenial {
    CooldownActive,
    DeliverabilityHold,
    DailyCapReached,
    HourlyCapReached,
}

impl ThrottleDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleDenial::CooldownActive => "COOLDOWN_ACTIVE",
            ThrottleDenial::DeliverabilityHold => "DELIVERABILITY_HOLD",
            ThrottleDenial::DailyCapReached => "DAILY_CAP_REACHED",
            ThrottleDenial::HourlyCapReached => "HOURLY_CAP_REACHED",
        }
    }
}

impl fmt::Display for ThrottleDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effective (daily, hourly) caps with warmup applied:
/// daily `min(cap, ramp)`, hourly `min(cap, max(ramp/24, 1))`.
pub fn effective_caps(state: &ThrottleState) -> (u32, u32) {
    match state.warmup {
        Some(Warmup { ramp_limit }) => (
            state.per_day_cap.min(ramp_limit),
            state.per_hour_cap.min((ramp_limit / 24).max(1)),
        ),
        None => (state.per_day_cap, state.per_hour_cap),
    }
}

pub fn check(state: &ThrottleState, key: &str, now: Timestamp) -> Result<(), ThrottleDenial> {
    let default = KeyCounts::default();
    let counts = state.counts_by_key.get(key).unwrap_or(&default);

    if let Some(until) = counts.cooldown_until {
        if now < until {
            return Err(ThrottleDenial::CooldownActive);
        }
    }
    if counts.bounce_flagged || counts.complaint_flagged {
        return Err(ThrottleDenial::DeliverabilityHold);
    }
    let (day_cap, hour_cap) = effective_caps(state);
    if counts.sent_today >= day_cap {
        return Err(ThrottleDenial::DailyCapReached);
    }
    if counts.sent_this_hour >= hour_cap {
        return Err(ThrottleDenial::HourlyCapReached);
    }
    Ok(())
}

pub fn record_send(state: &mut ThrottleState, key: &str) {
    let counts = state.counts_by_key.entry(key.to_string()).or_default();
    counts.sent_today += 1;
    counts.sent_this_hour += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_beats_deliverability_beats_caps() {
        let mut state = ThrottleState::new(1, 1);
        let counts = state.counts_by_key.entry("k".into()).or_default();
        counts.cooldown_until = Some(100);
        counts.bounce_flagged = true;
        counts.sent_today = 5;
        counts.sent_this_hour = 5;

        assert_eq!(check(&state, "k", 50), Err(ThrottleDenial::CooldownActive));
        // Cooldown elapsed: deliverability is next.
        assert_eq!(check(&state, "k", 100), Err(ThrottleDenial::DeliverabilityHold));

        let counts = state.counts_by_key.entry("k".into()).or_default();
        counts.bounce_flagged = false;
        assert_eq!(check(&state, "k", 100), Err(ThrottleDenial::DailyCapReached));

        let counts = state.counts_by_key.entry("k".into()).or_default();
        counts.sent_today = 0;
        assert_eq!(check(&state, "k", 100), Err(ThrottleDenial::HourlyCapReached));
    }

    #[test]
    fn warmup_shrinks_both_caps() {
        let mut state = ThrottleState::new(500, 50);
        state.warmup = Some(Warmup { ramp_limit: 48 });
        assert_eq!(effective_caps(&state), (48, 2));

        // A tiny ramp still allows one send per hour.
        state.warmup = Some(Warmup { ramp_limit: 10 });
        assert_eq!(effective_caps(&state), (10, 1));
    }

    #[test]
    fn unknown_key_is_allowed() {
        let state = ThrottleState::new(10, 2);
        assert_eq!(check(&state, "fresh", 0), Ok(()));
    }

    #[test]
    fn record_send_moves_a_key_toward_its_cap() {
        let mut state = ThrottleState::new(10, 2);
        record_send(&mut state, "k");
        record_send(&mut state, "k");
        assert_eq!(check(&state, "k", 0), Err(ThrottleDenial::HourlyCapReached));
    }
}
