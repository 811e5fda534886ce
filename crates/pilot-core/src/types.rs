use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp (seconds, UTC), always supplied by the host. The kernel
/// never reads a wall clock of its own.
pub type Timestamp = i64;

/// Logical stamp `"<prefix><n>"` allocated from a per-family clock.
/// Totally ordered within one family; ordering across families is undefined.
pub type Stamp = String;

// ── Execution mode ───────────────────────────────────────────────────────────

/// Host execution mode, derived per call and passed in. The kernel performs
/// no mode detection of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// No external effects permitted; transport action kinds are denied.
    Offline,
    /// Simulated execution; evidence is always `mock`.
    Mock,
    /// Real execution; outbound actions must produce a provider response id.
    Live,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Offline => write!(f, "OFFLINE"),
            Mode::Mock => write!(f, "MOCK"),
            Mode::Live => write!(f, "LIVE"),
        }
    }
}

/// Per-call policy inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyContext {
    pub mode: Mode,
    pub trust_level: i32,
}

impl PolicyContext {
    pub fn new(mode: Mode, trust_level: i32) -> Self {
        Self { mode, trust_level }
    }
}

// ── Channel ──────────────────────────────────────────────────────────────────

/// An outreach channel a lead can be contacted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Voice,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Voice => "voice",
            Channel::Email => "email",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
