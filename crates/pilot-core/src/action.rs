//! The action model.
//!
//! An [`ActionSpec`] is what callers hand the pipeline: a description of one
//! proposed business action, content-addressed by `action_id` and never
//! mutated after construction. The payload is a tagged sum with one variant
//! per action kind, so a spec can never claim to be an email while carrying
//! an SMS body. Unknown payload keys are preserved in a flattened map so
//! records written by newer hosts still deserialize.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hash::{content_hash, ContentHash};
use crate::types::Channel;

// ── RiskLevel ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Med,
    High,
}

// ── ActionKind ───────────────────────────────────────────────────────────────

/// The seven action kinds the pipeline knows how to gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Message,
    Email,
    Webhook,
    Sms,
    Voice,
    Task,
    Note,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Message => "message",
            ActionKind::Email => "email",
            ActionKind::Webhook => "webhook",
            ActionKind::Sms => "sms",
            ActionKind::Voice => "voice",
            ActionKind::Task => "task",
            ActionKind::Note => "note",
        }
    }

    /// Kinds that leave the system (and therefore count as growth actions).
    pub fn is_outbound(&self) -> bool {
        matches!(
            self,
            ActionKind::Message
                | ActionKind::Email
                | ActionKind::Webhook
                | ActionKind::Sms
                | ActionKind::Voice
        )
    }

    /// Kinds directed at a person, gated by consent.
    pub fn is_outreach(&self) -> bool {
        matches!(
            self,
            ActionKind::Message | ActionKind::Email | ActionKind::Sms | ActionKind::Voice
        )
    }

    /// Kinds that require an external transport provider (denied OFFLINE).
    pub fn needs_transport(&self) -> bool {
        matches!(
            self,
            ActionKind::Email | ActionKind::Webhook | ActionKind::Sms | ActionKind::Voice
        )
    }

    /// The reachability channel this kind rides, if any. In-app messages ride
    /// the SMS channel; webhooks, tasks and notes have no channel.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            ActionKind::Message | ActionKind::Sms => Some(Channel::Sms),
            ActionKind::Voice => Some(Channel::Voice),
            ActionKind::Email => Some(Channel::Email),
            ActionKind::Webhook | ActionKind::Task | ActionKind::Note => None,
        }
    }
}

// ── Payload ──────────────────────────────────────────────────────────────────

/// Per-kind payload. The discriminator doubles as the action type, so a
/// kind/payload mismatch is unrepresentable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Message {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        body: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Email {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        body: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Webhook {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        method: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Sms {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        body: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Voice {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        script: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Task {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Note {
        #[serde(default)]
        text: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Payload {
    pub fn kind(&self) -> ActionKind {
        match self {
            Payload::Message { .. } => ActionKind::Message,
            Payload::Email { .. } => ActionKind::Email,
            Payload::Webhook { .. } => ActionKind::Webhook,
            Payload::Sms { .. } => ActionKind::Sms,
            Payload::Voice { .. } => ActionKind::Voice,
            Payload::Task { .. } => ActionKind::Task,
            Payload::Note { .. } => ActionKind::Note,
        }
    }

    /// The destination field for kinds that have one.
    pub fn to(&self) -> Option<&str> {
        match self {
            Payload::Message { to, .. }
            | Payload::Email { to, .. }
            | Payload::Webhook { to, .. }
            | Payload::Sms { to, .. }
            | Payload::Voice { to, .. } => to.as_deref(),
            Payload::Task { .. } | Payload::Note { .. } => None,
        }
    }

    /// Shorthand constructor for outreach payloads in the common case.
    pub fn outreach(kind: ActionKind, to: impl Into<String>, body: impl Into<String>) -> Self {
        let (to, body) = (Some(to.into()), Some(body.into()));
        match kind {
            ActionKind::Message => Payload::Message { to, body, extra: Map::new() },
            ActionKind::Sms => Payload::Sms { to, body, extra: Map::new() },
            ActionKind::Voice => Payload::Voice { to, script: body, extra: Map::new() },
            // Email and everything else falls back to an email shape.
            _ => Payload::Email { to, subject: None, body, extra: Map::new() },
        }
    }
}

// ── ActionSpec ───────────────────────────────────────────────────────────────

/// One proposed business action. Created by callers; never mutated.
///
/// `action_id` is a BLAKE3 content hash over every other field, derived by
/// [`ActionSpec::new`] — equal specs always share an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub action_id: ContentHash,
    pub description: String,
    pub intent_id: String,
    pub expected_metric: String,
    pub risk_level: RiskLevel,
    pub irreversible: bool,
    pub payload: Payload,
}

impl ActionSpec {
    pub fn new(
        description: impl Into<String>,
        intent_id: impl Into<String>,
        expected_metric: impl Into<String>,
        risk_level: RiskLevel,
        irreversible: bool,
        payload: Payload,
    ) -> Self {
        let mut spec = Self {
            action_id: ContentHash::from_bytes([0u8; 32]),
            description: description.into(),
            intent_id: intent_id.into(),
            expected_metric: expected_metric.into(),
            risk_level,
            irreversible,
            payload,
        };
        spec.action_id = spec.compute_action_id();
        spec
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    /// Recompute the content hash over everything except `action_id`.
    pub fn compute_action_id(&self) -> ContentHash {
        content_hash(&serde_json::json!({
            "description": self.description,
            "intent_id": self.intent_id,
            "expected_metric": self.expected_metric,
            "risk_level": self.risk_level,
            "irreversible": self.irreversible,
            "payload": self.payload,
        }))
    }

    /// Hash binding a provider request to this spec: action id + kind + payload.
    pub fn request_hash(&self) -> ContentHash {
        content_hash(&serde_json::json!({
            "action_id": self.action_id,
            "kind": self.kind(),
            "payload": self.payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_spec(description: &str) -> ActionSpec {
        ActionSpec::new(
            description,
            "intent-1",
            "pipeline_velocity",
            RiskLevel::Low,
            false,
            Payload::Task { title: Some("call".into()), assignee: None, extra: Map::new() },
        )
    }

    #[test]
    fn equal_specs_share_an_action_id() {
        assert_eq!(task_spec("follow up").action_id, task_spec("follow up").action_id);
        assert_ne!(task_spec("follow up").action_id, task_spec("cold call").action_id);
    }

    #[test]
    fn payload_tag_is_the_action_type() {
        let spec = task_spec("x");
        assert_eq!(spec.kind(), ActionKind::Task);
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["payload"]["kind"], "task");
    }

    #[test]
    fn unknown_payload_keys_survive_round_trip() {
        let json = serde_json::json!({
            "kind": "sms",
            "to": "+15550100",
            "body": "hi",
            "campaign": "q3-launch"
        });
        let payload: Payload = serde_json::from_value(json).expect("deserialize");
        match &payload {
            Payload::Sms { extra, .. } => assert_eq!(extra["campaign"], "q3-launch"),
            other => panic!("wrong variant: {:?}", other),
        }
        let back = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(back["campaign"], "q3-launch");
    }

    #[test]
    fn channel_mapping() {
        assert_eq!(ActionKind::Message.channel(), Some(Channel::Sms));
        assert_eq!(ActionKind::Voice.channel(), Some(Channel::Voice));
        assert_eq!(ActionKind::Webhook.channel(), None);
        assert!(ActionKind::Webhook.is_outbound());
        assert!(!ActionKind::Webhook.is_outreach());
    }
}
