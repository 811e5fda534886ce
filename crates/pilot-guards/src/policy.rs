//! Static policy rules over `ActionSpec` × `PolicyContext`.
//!
//! Rules are applied in order; the first failing rule wins:
//! 1. Missing intent outside MOCK
//! 2. Transport action kinds in OFFLINE mode
//! 3. LIVE outbound without a destination
//! 4. Forbidden optimization terms in the description (constitution)

use serde::{Deserialize, Serialize};
use std::fmt;

use pilot_core::constants::{
    CONFIRM_COOLDOWN_SECS, FORBIDDEN_OPTIMIZATION_TERMS, MISSING_INTENT_PLACEHOLDER,
};
use pilot_core::{ActionSpec, Mode, PolicyContext, RiskLevel};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyReason {
    MissingIntent,
    OfflineBlocked,
    MissingPayloadTo,
    ForbiddenOptimization,
}

impl PolicyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyReason::MissingIntent => "MISSING_INTENT",
            PolicyReason::OfflineBlocked => "OFFLINE_BLOCKED",
            PolicyReason::MissingPayloadTo => "MISSING_PAYLOAD_TO",
            PolicyReason::ForbiddenOptimization => "FORBIDDEN_OPTIMIZATION",
        }
    }
}

impl fmt::Display for PolicyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<PolicyReason>,
    pub requires_confirm: bool,
    pub cooldown_seconds: i64,
}

/// Evaluate the static rules. Confirmation is required for high-risk or
/// irreversible actions regardless of whether a rule fails.
pub fn evaluate(action: &ActionSpec, ctx: &PolicyContext) -> PolicyReport {
    let requires_confirm = action.risk_level == RiskLevel::High || action.irreversible;
    let cooldown_seconds = if requires_confirm { CONFIRM_COOLDOWN_SECS } else { 0 };
    let reason = first_violation(action, ctx);
    PolicyReport { allowed: reason.is_none(), reason, requires_confirm, cooldown_seconds }
}

fn first_violation(action: &ActionSpec, ctx: &PolicyContext) -> Option<PolicyReason> {
    // ── 1. Intent required outside MOCK ──────────────────────────────────────
    let intent = action.intent_id.trim();
    if (intent.is_empty() || intent == MISSING_INTENT_PLACEHOLDER) && ctx.mode != Mode::Mock {
        return Some(PolicyReason::MissingIntent);
    }

    // ── 2. OFFLINE denies transport kinds ────────────────────────────────────
    if ctx.mode == Mode::Offline && action.kind().needs_transport() {
        return Some(PolicyReason::OfflineBlocked);
    }

    // ── 3. LIVE outbound must name a destination ─────────────────────────────
    if ctx.mode == Mode::Live && action.kind().is_outbound() {
        match action.payload.to() {
            Some(to) if !to.trim().is_empty() => {}
            _ => return Some(PolicyReason::MissingPayloadTo),
        }
    }

    // ── 4. Constitution term scan ────────────────────────────────────────────
    let description = action.description.to_lowercase();
    if FORBIDDEN_OPTIMIZATION_TERMS.iter().any(|t| description.contains(t)) {
        return Some(PolicyReason::ForbiddenOptimization);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::{ActionKind, Payload};

    fn email_action(description: &str, intent: &str, to: Option<&str>) -> ActionSpec {
        let payload = Payload::Email {
            to: to.map(str::to_string),
            subject: None,
            body: Some("hello".into()),
            extra: serde_json::Map::new(),
        };
        ActionSpec::new(description, intent, "reply_rate", RiskLevel::Low, false, payload)
    }

    #[test]
    fn missing_intent_denied_outside_mock() {
        let action = email_action("welcome", "", Some("a@b.com"));
        let report = evaluate(&action, &PolicyContext::new(Mode::Live, 1));
        assert_eq!(report.reason, Some(PolicyReason::MissingIntent));
        // MOCK tolerates an empty intent.
        let report = evaluate(&action, &PolicyContext::new(Mode::Mock, 1));
        assert!(report.allowed);
    }

    #[test]
    fn offline_blocks_transport_kinds() {
        let action = email_action("welcome", "i1", Some("a@b.com"));
        let report = evaluate(&action, &PolicyContext::new(Mode::Offline, 1));
        assert_eq!(report.reason, Some(PolicyReason::OfflineBlocked));
    }

    #[test]
    fn live_outbound_requires_a_destination() {
        let blank = email_action("welcome", "i1", Some("  "));
        let report = evaluate(&blank, &PolicyContext::new(Mode::Live, 1));
        assert_eq!(report.reason, Some(PolicyReason::MissingPayloadTo));
    }

    #[test]
    fn forbidden_terms_are_case_insensitive() {
        let action = email_action("Q3 Dark Pattern experiment", "i1", Some("a@b.com"));
        let report = evaluate(&action, &PolicyContext::new(Mode::Live, 1));
        assert_eq!(report.reason, Some(PolicyReason::ForbiddenOptimization));
    }

    #[test]
    fn earlier_rule_wins() {
        // OFFLINE + forbidden term: rule 2 fires first.
        let action = email_action("dark pattern drip", "i1", Some("a@b.com"));
        let report = evaluate(&action, &PolicyContext::new(Mode::Offline, 1));
        assert_eq!(report.reason, Some(PolicyReason::OfflineBlocked));
    }

    #[test]
    fn confirm_required_for_high_risk_or_irreversible() {
        let mut action = email_action("welcome", "i1", Some("a@b.com"));
        action.risk_level = RiskLevel::High;
        let report = evaluate(&action, &PolicyContext::new(Mode::Mock, 1));
        assert!(report.requires_confirm);
        assert_eq!(report.cooldown_seconds, CONFIRM_COOLDOWN_SECS);

        let task = ActionSpec::new(
            "archive account",
            "i1",
            "cleanup",
            RiskLevel::Low,
            true,
            Payload::outreach(ActionKind::Email, "a@b.com", "bye"),
        );
        assert!(evaluate(&task, &PolicyContext::new(Mode::Mock, 1)).requires_confirm);
    }
}
