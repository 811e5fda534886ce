//! Capacity energy: a one-way unit budget per pod, human, channel and day.
//!
//! Units are consumed only by executed irreversible actions; reversible
//! actions cost zero. Consumption is never refunded.

use serde::{Deserialize, Serialize};
use std::fmt;

use pilot_core::constants::{
    DEFAULT_CHANNEL_ENERGY_LIMIT, DEFAULT_DAY_ENERGY_LIMIT, DEFAULT_HUMAN_ENERGY_LIMIT,
    DEFAULT_POD_ENERGY_LIMIT, ENERGY_MIN_UNITS,
};
use pilot_core::{Stamp, Timestamp};
use pilot_store::{event_id, Family, Store, GLOBAL_SCOPE};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnergyEvent {
    Consume {
        event_id: String,
        stamp: Stamp,
        day_id: String,
        pod_id: String,
        human_id: String,
        channel: String,
        units: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyLimits {
    pub pod: u32,
    pub human: u32,
    pub channel: u32,
    pub day: u32,
    pub min_units: u32,
}

impl Default for EnergyLimits {
    fn default() -> Self {
        Self {
            pod: DEFAULT_POD_ENERGY_LIMIT,
            human: DEFAULT_HUMAN_ENERGY_LIMIT,
            channel: DEFAULT_CHANNEL_ENERGY_LIMIT,
            day: DEFAULT_DAY_ENERGY_LIMIT,
            min_units: ENERGY_MIN_UNITS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityEnergyState {
    pub pod_used: u32,
    pub human_used: u32,
    pub channel_used: u32,
    pub day_used: u32,
}

/// Calendar day id for a Unix timestamp, e.g. `2026-08-01`.
pub fn day_id(now: Timestamp) -> String {
    chrono::DateTime::from_timestamp(now, 0)
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_else(|| format!("day:{}", now.div_euclid(86_400)))
}

/// Running sums for one (day, pod, human, channel) view. `day_used` counts
/// every unit spent that day across all dimensions.
pub fn state(
    store: &Store,
    day: &str,
    pod_id: &str,
    human_id: &str,
    channel: &str,
) -> CapacityEnergyState {
    let events: Vec<EnergyEvent> = store.read_events(Family::Energy, GLOBAL_SCOPE);
    let mut out = CapacityEnergyState::default();
    for EnergyEvent::Consume { day_id, pod_id: p, human_id: h, channel: c, units, .. } in &events {
        if day_id != day {
            continue;
        }
        out.day_used += units;
        if p == pod_id {
            out.pod_used += units;
        }
        if h == human_id {
            out.human_used += units;
        }
        if c == channel {
            out.channel_used += units;
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyDenial {
    Pod,
    Human,
    Channel,
    Day,
}

impl EnergyDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyDenial::Pod => "POD_CAPACITY",
            EnergyDenial::Human => "HUMAN_CAPACITY",
            EnergyDenial::Channel => "CHANNEL_CAPACITY",
            EnergyDenial::Day => "DAY_CAPACITY",
        }
    }
}

impl fmt::Display for EnergyDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn required_units(irreversible: bool, limits: &EnergyLimits) -> u32 {
    if irreversible {
        limits.min_units
    } else {
        0
    }
}

/// Check order: pod, human, channel, day.
pub fn check(
    state: &CapacityEnergyState,
    limits: &EnergyLimits,
    required: u32,
) -> Result<(), EnergyDenial> {
    if state.pod_used + required > limits.pod {
        return Err(EnergyDenial::Pod);
    }
    if state.human_used + required > limits.human {
        return Err(EnergyDenial::Human);
    }
    if state.channel_used + required > limits.channel {
        return Err(EnergyDenial::Channel);
    }
    if state.day_used + required > limits.day {
        return Err(EnergyDenial::Day);
    }
    Ok(())
}

pub fn consume(
    store: &Store,
    day: &str,
    pod_id: &str,
    human_id: &str,
    channel: &str,
    units: u32,
) {
    let stamp = store.next_stamp(Family::Energy, GLOBAL_SCOPE);
    let event = EnergyEvent::Consume {
        event_id: event_id(GLOBAL_SCOPE, &stamp, "consume"),
        stamp,
        day_id: day.to_string(),
        pod_id: pod_id.to_string(),
        human_id: human_id.to_string(),
        channel: channel.to_string(),
        units,
    };
    store.append_event(Family::Energy, GLOBAL_SCOPE, &event);
}
