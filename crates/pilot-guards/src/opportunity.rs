//! Per-pod opportunity queue: FIFO, unique by id, bounded, consumed in order.

use serde::{Deserialize, Serialize};

use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store};

pub const QUEUED: &str = "QUEUED";
pub const QUEUE_FULL: &str = "QUEUE_FULL";
pub const MISSING_OPPORTUNITY_ID: &str = "MISSING_OPPORTUNITY_ID";
pub const NOT_QUEUED: &str = "NOT_QUEUED";
pub const OUT_OF_ORDER: &str = "OUT_OF_ORDER";
pub const COOLDOWN_REQUIRED: &str = "COOLDOWN_REQUIRED";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpportunityEvent {
    Enqueue {
        event_id: String,
        stamp: Stamp,
        opportunity_id: String,
        added_at: Stamp,
    },
    Resolve {
        event_id: String,
        stamp: Stamp,
        opportunity_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpportunityEntry {
    pub opportunity_id: String,
    pub added_at: Stamp,
}

/// Fold the queue: enqueues are idempotent per id, resolves remove.
pub fn fold(events: &[OpportunityEvent]) -> Vec<OpportunityEntry> {
    let mut queue: Vec<OpportunityEntry> = Vec::new();
    for event in events {
        match event {
            OpportunityEvent::Enqueue { opportunity_id, added_at, .. } => {
                if !queue.iter().any(|e| e.opportunity_id == *opportunity_id) {
                    queue.push(OpportunityEntry {
                        opportunity_id: opportunity_id.clone(),
                        added_at: added_at.clone(),
                    });
                }
            }
            OpportunityEvent::Resolve { opportunity_id, .. } => {
                queue.retain(|e| e.opportunity_id != *opportunity_id);
            }
        }
    }
    queue
}

pub fn queue(store: &Store, pod: &str) -> Vec<OpportunityEntry> {
    fold(&store.read_events(Family::Opportunity, pod))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// No opportunity was referenced in this call.
    None,
    /// A new opportunity was enqueued; execute once it reaches the front.
    Queued,
    /// The referenced opportunity is at the front with cooldown satisfied.
    Ready,
    Blocked,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GateOutcome {
    pub state: GateState,
    pub reason: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub is_new: bool,
    pub cooldown_satisfied: bool,
    pub max_size: usize,
}

impl Default for OpportunityRequest {
    fn default() -> Self {
        Self {
            id: None,
            is_new: false,
            cooldown_satisfied: false,
            max_size: pilot_core::constants::DEFAULT_QUEUE_MAX_SIZE,
        }
    }
}

/// Evaluate (and for new opportunities, mutate) the queue for one request.
///
/// New: full queue blocks with QUEUE_FULL, otherwise enqueue → Queued.
/// Existing: must name an id, be queued, be at the front, and satisfy its
/// cooldown — checked in that order.
pub fn gate(store: &Store, pod: &str, request: &OpportunityRequest) -> GateOutcome {
    let current = queue(store, pod);
    let id = request.id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    if request.is_new {
        let Some(id) = id else {
            return GateOutcome { state: GateState::Blocked, reason: Some(MISSING_OPPORTUNITY_ID) };
        };
        if current.iter().any(|e| e.opportunity_id == id) {
            // Re-announcing a queued opportunity is idempotent.
            return GateOutcome { state: GateState::Queued, reason: Some(QUEUED) };
        }
        if current.len() >= request.max_size {
            return GateOutcome { state: GateState::Blocked, reason: Some(QUEUE_FULL) };
        }
        let stamp = store.next_stamp(Family::Opportunity, pod);
        let event = OpportunityEvent::Enqueue {
            event_id: event_id(pod, &stamp, "enqueue"),
            added_at: stamp.clone(),
            stamp,
            opportunity_id: id.to_string(),
        };
        store.append_event(Family::Opportunity, pod, &event);
        return GateOutcome { state: GateState::Queued, reason: Some(QUEUED) };
    }

    let Some(id) = id else {
        return GateOutcome { state: GateState::Blocked, reason: Some(MISSING_OPPORTUNITY_ID) };
    };
    let Some(position) = current.iter().position(|e| e.opportunity_id == id) else {
        return GateOutcome { state: GateState::Blocked, reason: Some(NOT_QUEUED) };
    };
    if position != 0 {
        return GateOutcome { state: GateState::Blocked, reason: Some(OUT_OF_ORDER) };
    }
    if !request.cooldown_satisfied {
        return GateOutcome { state: GateState::Blocked, reason: Some(COOLDOWN_REQUIRED) };
    }
    GateOutcome { state: GateState::Ready, reason: None }
}

/// Append a resolve for an executed opportunity.
pub fn resolve(store: &Store, pod: &str, opportunity_id: &str) {
    let stamp = store.next_stamp(Family::Opportunity, pod);
    let event = OpportunityEvent::Resolve {
        event_id: event_id(pod, &stamp, "resolve"),
        stamp,
        opportunity_id: opportunity_id.to_string(),
    };
    store.append_event(Family::Opportunity, pod, &event);
}
