//! Pipeline outcomes and the audit trail that accompanies them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::evidence::EvidenceRef;
use crate::hash::ContentHash;

// ── NextAction ───────────────────────────────────────────────────────────────

/// What the caller should do next. Rendered verbatim by the UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    /// Retry later; the condition is temporal (capacity, throttle, cooldown).
    Schedule,
    /// A human must resolve the block before retrying.
    AskUser,
    /// An explicit confirmation is required for this action.
    RequestApproval,
}

// ── Outcome ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Executed,
    Deferred,
    Halted,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Executed => "executed",
            OutcomeKind::Deferred => "deferred",
            OutcomeKind::Halted => "halted",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The pipeline's decision for one action.
///
/// Denials are data, not errors: a caller only ever sees `Err` from the
/// kernel for genuine programming mistakes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Executed {
        summary: String,
        details: String,
        next_action: NextAction,
    },
    Deferred {
        summary: String,
        details: String,
        next_action: NextAction,
    },
    Halted {
        summary: String,
        details: String,
        next_action: NextAction,
    },
}

impl Outcome {
    pub fn executed(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Outcome::Executed {
            summary: summary.into(),
            details: details.into(),
            next_action: NextAction::Schedule,
        }
    }

    pub fn deferred(
        code: FailCode,
        reason: impl fmt::Display,
        details: impl Into<String>,
        next_action: NextAction,
    ) -> Self {
        Outcome::Deferred {
            summary: format!("{}: {}", code.as_str(), reason),
            details: details.into(),
            next_action,
        }
    }

    pub fn halted(
        code: FailCode,
        reason: impl fmt::Display,
        details: impl Into<String>,
        next_action: NextAction,
    ) -> Self {
        Outcome::Halted {
            summary: format!("{}: {}", code.as_str(), reason),
            details: details.into(),
            next_action,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Executed { .. } => OutcomeKind::Executed,
            Outcome::Deferred { .. } => OutcomeKind::Deferred,
            Outcome::Halted { .. } => OutcomeKind::Halted,
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            Outcome::Executed { summary, .. }
            | Outcome::Deferred { summary, .. }
            | Outcome::Halted { summary, .. } => summary,
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Outcome::Executed { details, .. }
            | Outcome::Deferred { details, .. }
            | Outcome::Halted { details, .. } => details,
        }
    }

    pub fn next_action(&self) -> NextAction {
        match self {
            Outcome::Executed { next_action, .. }
            | Outcome::Deferred { next_action, .. }
            | Outcome::Halted { next_action, .. } => *next_action,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, Outcome::Executed { .. })
    }
}

// ── FailCode ─────────────────────────────────────────────────────────────────

/// Machine code carried in every non-executed summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailCode {
    PolicyConflict,
    SafeOverload,
    CapacityExceeded,
    ComplianceBlocked,
    OpportunityGate,
    Throttled,
    CooldownActive,
    ConfirmRequired,
    SafeHold,
    RunnerError,
}

impl FailCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailCode::PolicyConflict => "FAIL_POLICY_CONFLICT",
            FailCode::SafeOverload => "FAIL_SAFE_OVERLOAD",
            FailCode::CapacityExceeded => "FAIL_CAPACITY_EXCEEDED",
            FailCode::ComplianceBlocked => "FAIL_COMPLIANCE_BLOCKED",
            FailCode::OpportunityGate => "FAIL_OPPORTUNITY_GATE",
            FailCode::Throttled => "FAIL_THROTTLED",
            FailCode::CooldownActive => "FAIL_COOLDOWN_ACTIVE",
            FailCode::ConfirmRequired => "FAIL_CONFIRM_REQUIRED",
            FailCode::SafeHold => "FAIL_SAFE_HOLD",
            FailCode::RunnerError => "FAIL_RUNNER_ERROR",
        }
    }
}

impl fmt::Display for FailCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── ProofBundle ──────────────────────────────────────────────────────────────

/// One guard's entry in the audit trail. `reason` is set on the failing guard
/// and on passing guards that have something worth recording.
#[derive(Clone, Debug, Serialize)]
pub struct GuardCheck {
    pub guard: &'static str,
    pub passed: bool,
    pub reason: Option<String>,
}

impl GuardCheck {
    pub fn pass(guard: &'static str) -> Self {
        Self { guard, passed: true, reason: None }
    }

    pub fn pass_with(guard: &'static str, reason: impl Into<String>) -> Self {
        Self { guard, passed: true, reason: Some(reason.into()) }
    }

    pub fn fail(guard: &'static str, reason: impl Into<String>) -> Self {
        Self { guard, passed: false, reason: Some(reason.into()) }
    }
}

/// Everything a caller needs to audit one pipeline decision.
#[derive(Clone, Debug, Serialize)]
pub struct ProofBundle {
    pub action_id: ContentHash,
    pub identity: String,
    pub evidence: EvidenceRef,
    /// Guard checks in evaluation order; the last entry is the failing guard
    /// for non-executed outcomes.
    pub checks: Vec<GuardCheck>,
    pub requires_confirm: bool,
    pub cooldown_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_carries_the_machine_code() {
        let o = Outcome::halted(
            FailCode::PolicyConflict,
            "OFFLINE_BLOCKED",
            "email requires a transport provider",
            NextAction::AskUser,
        );
        assert!(o.summary().starts_with("FAIL_POLICY_CONFLICT"));
        assert!(o.summary().contains("OFFLINE_BLOCKED"));
        assert_eq!(o.kind(), OutcomeKind::Halted);
    }

    #[test]
    fn next_action_serializes_screaming() {
        let v = serde_json::to_value(NextAction::RequestApproval).expect("serialize");
        assert_eq!(v, "REQUEST_APPROVAL");
    }

    #[test]
    fn outcome_is_tagged_by_kind() {
        let v = serde_json::to_value(Outcome::executed("ok", "done")).expect("serialize");
        assert_eq!(v["outcome"], "executed");
    }
}
