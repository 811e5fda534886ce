//! The revenue ledger: the global per-identity audit trail. Every pipeline
//! decision lands here, executed or not, paged by `entry_id`.

use serde::{Deserialize, Serialize};

use pilot_core::{ActionKind, ActionSpec, ContentHash, EvidenceRef, NextAction, Outcome, OutcomeKind, Stamp};
use pilot_store::{event_id, Family, LedgerEvent, Page, Store};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub action_id: ContentHash,
    pub kind: ActionKind,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub kind: OutcomeKind,
    pub summary: String,
    pub next_action: NextAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevenueLedgerEntry {
    pub entry_id: String,
    pub timestamp: Stamp,
    pub identity: String,
    pub action: ActionSummary,
    pub outcome: OutcomeSummary,
    pub evidence_ref: EvidenceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_transition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LedgerEvent for RevenueLedgerEntry {
    fn event_id(&self) -> &str {
        &self.entry_id
    }
}

pub fn append(
    store: &Store,
    identity: &str,
    action: &ActionSpec,
    outcome: &Outcome,
    evidence: &EvidenceRef,
    stage_transition: Option<String>,
    notes: Option<String>,
) -> RevenueLedgerEntry {
    let stamp = store.next_stamp(Family::Revenue, identity);
    let entry = RevenueLedgerEntry {
        entry_id: event_id(identity, &stamp, "entry"),
        timestamp: stamp,
        identity: identity.to_string(),
        action: ActionSummary {
            action_id: action.action_id,
            kind: action.kind(),
            description: action.description.clone(),
        },
        outcome: OutcomeSummary {
            kind: outcome.kind(),
            summary: outcome.summary().to_string(),
            next_action: outcome.next_action(),
        },
        evidence_ref: evidence.clone(),
        stage_transition,
        notes,
    };
    store.append_event(Family::Revenue, identity, &entry);
    entry
}

pub fn page(
    store: &Store,
    identity: &str,
    limit: usize,
    cursor: Option<&str>,
) -> Page<RevenueLedgerEntry> {
    store.read_page(Family::Revenue, identity, limit, cursor)
}

pub fn tail(
    store: &Store,
    identity: &str,
    limit: usize,
    cursor: Option<&str>,
) -> Page<RevenueLedgerEntry> {
    store.read_tail(Family::Revenue, identity, limit, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::{build_evidence_ref, Mode, Payload, PolicyContext, RiskLevel};

    fn entry_for(store: &Store, identity: &str, description: &str) -> RevenueLedgerEntry {
        let action = ActionSpec::new(
            description,
            "i1",
            "velocity",
            RiskLevel::Low,
            false,
            Payload::Task { title: None, assignee: None, extra: serde_json::Map::new() },
        );
        let ctx = PolicyContext::new(Mode::Mock, 1);
        let evidence = build_evidence_ref(&action, &ctx, "mock", None, 0);
        append(store, identity, &action, &Outcome::executed("EXECUTED: task", description), &evidence, None, None)
    }

    #[test]
    fn entries_page_forward_and_backward() {
        let store = Store::memory();
        for i in 0..4 {
            entry_for(&store, "u:1", &format!("step {}", i));
        }
        let first = page(&store, "u:1", 3, None);
        assert_eq!(first.items.len(), 3);
        let rest = page(&store, "u:1", 3, first.next_cursor.as_deref());
        assert_eq!(rest.items.len(), 1);
        assert!(rest.next_cursor.is_none());

        let newest = tail(&store, "u:1", 2, None);
        assert_eq!(newest.items[1].action.description, "step 3");
    }

    #[test]
    fn identities_do_not_share_trails() {
        let store = Store::memory();
        entry_for(&store, "u:1", "a");
        entry_for(&store, "u:2", "b");
        assert_eq!(page(&store, "u:1", 10, None).items.len(), 1);
        assert_eq!(page(&store, "u:2", 10, None).items.len(), 1);
    }
}
