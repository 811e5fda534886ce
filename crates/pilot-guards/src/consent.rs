//! Per-lead consent ledger with the irreversible do-not-contact latch.
//!
//! The latch is enforced in the fold itself: once a `do_not_contact` event is
//! on the ledger, no later event of any type can produce a state with the
//! flag cleared.

use serde::{Deserialize, Serialize};
use std::fmt;

use pilot_core::{ActionKind, Stamp};
use pilot_store::{event_id, Family, Store};

pub const OPT_OUT_ALREADY_SET: &str = "OPT_OUT_ALREADY_SET";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    #[default]
    Unknown,
    Granted,
    Denied,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsentEvent {
    Consent {
        event_id: String,
        stamp: Stamp,
        status: ConsentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        evidence_ref: Option<String>,
    },
    OptOut {
        event_id: String,
        stamp: Stamp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        evidence_ref: Option<String>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadConsentState {
    pub consent_status: ConsentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_evidence_ref: Option<String>,
    pub do_not_contact: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_out_evidence_ref: Option<String>,
}

pub fn fold(events: &[ConsentEvent]) -> LeadConsentState {
    let mut state = LeadConsentState::default();
    for event in events {
        match event {
            ConsentEvent::Consent { status, evidence_ref, .. } => {
                state.consent_status = *status;
                if evidence_ref.is_some() {
                    state.consent_evidence_ref = evidence_ref.clone();
                }
            }
            ConsentEvent::OptOut { evidence_ref, .. } => {
                state.do_not_contact = true;
                if state.opt_out_evidence_ref.is_none() {
                    state.opt_out_evidence_ref = evidence_ref.clone();
                }
            }
        }
    }
    state
}

pub fn load(store: &Store, identity: &str) -> LeadConsentState {
    fold(&store.read_events(Family::Consent, identity))
}

/// Record a consent status change and return the resulting state.
pub fn apply_consent(
    store: &Store,
    identity: &str,
    status: ConsentStatus,
    evidence_ref: Option<String>,
) -> LeadConsentState {
    let stamp = store.next_stamp(Family::Consent, identity);
    let event = ConsentEvent::Consent {
        event_id: event_id(identity, &stamp, "consent"),
        stamp,
        status,
        evidence_ref,
    };
    store.append_event(Family::Consent, identity, &event);
    load(store, identity)
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptOutReceipt {
    pub blocked: bool,
    pub reason: Option<&'static str>,
    pub state: LeadConsentState,
}

/// Latch `do_not_contact`. The only irreversible transition in the kernel:
/// a repeat opt-out appends nothing and reports `OPT_OUT_ALREADY_SET`.
pub fn apply_opt_out(store: &Store, identity: &str, evidence_ref: Option<String>) -> OptOutReceipt {
    let state = load(store, identity);
    if state.do_not_contact {
        return OptOutReceipt { blocked: true, reason: Some(OPT_OUT_ALREADY_SET), state };
    }
    let stamp = store.next_stamp(Family::Consent, identity);
    let event = ConsentEvent::OptOut {
        event_id: event_id(identity, &stamp, "opt_out"),
        stamp,
        evidence_ref,
    };
    store.append_event(Family::Consent, identity, &event);
    OptOutReceipt { blocked: false, reason: None, state: load(store, identity) }
}

pub fn can_outreach(state: &LeadConsentState) -> bool {
    state.consent_status == ConsentStatus::Granted && !state.do_not_contact
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentDenial {
    DoNotContact,
    NotGranted,
}

impl ConsentDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentDenial::DoNotContact => "DO_NOT_CONTACT",
            ConsentDenial::NotGranted => "CONSENT_NOT_GRANTED",
        }
    }
}

impl fmt::Display for ConsentDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Gate an outreach kind on the lead's consent state.
///
/// Voice rides an exception: a non-denied status with existing consent
/// evidence passes even while the status is still `unknown`.
pub fn check_outreach(state: &LeadConsentState, kind: ActionKind) -> Result<(), ConsentDenial> {
    if state.do_not_contact {
        return Err(ConsentDenial::DoNotContact);
    }
    if can_outreach(state) {
        return Ok(());
    }
    if kind == ActionKind::Voice
        && state.consent_status != ConsentStatus::Denied
        && state.consent_evidence_ref.is_some()
    {
        return Ok(());
    }
    Err(ConsentDenial::NotGranted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_out_is_irreversible() {
        let store = Store::memory();
        apply_consent(&store, "u:1", ConsentStatus::Granted, Some("ev-1".into()));
        let receipt = apply_opt_out(&store, "u:1", Some("ev-2".into()));
        assert!(!receipt.blocked);
        assert!(receipt.state.do_not_contact);

        // Granting consent again cannot clear the latch.
        let state = apply_consent(&store, "u:1", ConsentStatus::Granted, None);
        assert!(state.do_not_contact);
        assert!(!can_outreach(&state));

        // A repeat opt-out is reported, not recorded.
        let repeat = apply_opt_out(&store, "u:1", None);
        assert!(repeat.blocked);
        assert_eq!(repeat.reason, Some(OPT_OUT_ALREADY_SET));
        let events: Vec<ConsentEvent> = store.read_events(Family::Consent, "u:1");
        let opt_outs = events
            .iter()
            .filter(|e| matches!(e, ConsentEvent::OptOut { .. }))
            .count();
        assert_eq!(opt_outs, 1);
    }

    #[test]
    fn outreach_requires_granted_consent() {
        let store = Store::memory();
        let state = load(&store, "u:2");
        assert_eq!(check_outreach(&state, ActionKind::Email), Err(ConsentDenial::NotGranted));

        let state = apply_consent(&store, "u:2", ConsentStatus::Granted, None);
        assert_eq!(check_outreach(&state, ActionKind::Email), Ok(()));
    }

    #[test]
    fn voice_exception_needs_evidence_and_non_denied_status() {
        let state = LeadConsentState {
            consent_status: ConsentStatus::Unknown,
            consent_evidence_ref: Some("call-recording-1".into()),
            ..Default::default()
        };
        assert_eq!(check_outreach(&state, ActionKind::Voice), Ok(()));
        assert_eq!(check_outreach(&state, ActionKind::Sms), Err(ConsentDenial::NotGranted));

        let denied = LeadConsentState {
            consent_status: ConsentStatus::Denied,
            consent_evidence_ref: Some("call-recording-1".into()),
            ..Default::default()
        };
        assert_eq!(check_outreach(&denied, ActionKind::Voice), Err(ConsentDenial::NotGranted));
    }

    #[test]
    fn dnc_beats_everything() {
        let state = LeadConsentState {
            consent_status: ConsentStatus::Granted,
            consent_evidence_ref: Some("ev".into()),
            do_not_contact: true,
            opt_out_evidence_ref: None,
        };
        assert_eq!(check_outreach(&state, ActionKind::Voice), Err(ConsentDenial::DoNotContact));
    }
}
