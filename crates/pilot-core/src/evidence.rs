//! Evidence: the immutable record tying an action attempt to a provider call.
//!
//! The kernel does not interpret provider payloads — evidence is a commitment
//! only, used for audit and LIVE-mode safety.

use serde::{Deserialize, Serialize};

use crate::action::ActionSpec;
use crate::hash::ContentHash;
use crate::types::{Mode, PolicyContext, Timestamp};

/// Provider name used when no runner was involved in a decision.
pub const INTERNAL_PROVIDER: &str = "internal";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    /// Simulated call (MOCK or OFFLINE mode).
    Mock,
    /// LIVE call acknowledged by the provider.
    Ok,
    /// The runner reported a failure.
    Error,
    /// LIVE call without a provider response id — held for safety.
    SafeHold,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub provider: String,
    pub mode: Mode,
    /// Hash of action id + kind + payload; identical specs produce identical
    /// request hashes.
    pub request_hash: ContentHash,
    pub status: EvidenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    pub timestamp: Timestamp,
}

/// Build the evidence record for one attempt.
///
/// Status defaulting: MOCK/OFFLINE → `mock`; LIVE with a response id → `ok`;
/// LIVE without → `safe_hold`. Runner failures overwrite to `error` via
/// [`EvidenceRef::with_error`].
pub fn build_evidence_ref(
    action: &ActionSpec,
    ctx: &PolicyContext,
    provider: &str,
    response_id: Option<String>,
    now: Timestamp,
) -> EvidenceRef {
    let status = match ctx.mode {
        Mode::Mock | Mode::Offline => EvidenceStatus::Mock,
        Mode::Live if response_id.is_some() => EvidenceStatus::Ok,
        Mode::Live => EvidenceStatus::SafeHold,
    };
    EvidenceRef {
        provider: provider.to_string(),
        mode: ctx.mode,
        request_hash: action.request_hash(),
        status,
        response_id,
        timestamp: now,
    }
}

impl EvidenceRef {
    pub fn with_error(mut self) -> Self {
        self.status = EvidenceStatus::Error;
        self
    }
}
