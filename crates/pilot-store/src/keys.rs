//! Key namespace and clock prefixes.
//!
//! Persisted state layout (per scope):
//!   ppp:<family>:v1::<scope>        → JSON event array
//!   ppp:<family>Clock:v1::<scope>   → stringified counter
//! Global families (energy, soft locks, retry decay) omit the scope suffix.

/// Scope value for the global families.
pub const GLOBAL_SCOPE: &str = "";

/// Every persisted ledger family. Each family owns a distinct clock prefix,
/// so logical stamps are totally ordered within a family and incomparable
/// across families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Exec,
    Revenue,
    Capacity,
    Cooling,
    Opportunity,
    Energy,
    Chain,
    AutoHelp,
    SoftLocks,
    RetryDecay,
    Consent,
    LeadMerge,
    Pod,
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::Exec => "execLedger",
            Family::Revenue => "revenueLedger",
            Family::Capacity => "capacityLedger",
            Family::Cooling => "coolingLedger",
            Family::Opportunity => "opportunityQueue",
            Family::Energy => "capacityEnergy",
            Family::Chain => "actionChain",
            Family::AutoHelp => "autoHelp",
            Family::SoftLocks => "softLocks",
            Family::RetryDecay => "retryDecay",
            Family::Consent => "consentLedger",
            Family::LeadMerge => "leadMergeLedger",
            Family::Pod => "podLedger",
        }
    }

    pub fn clock_prefix(&self) -> &'static str {
        match self {
            Family::Exec => "x",
            Family::Revenue => "v",
            Family::Capacity => "s",
            Family::Cooling => "c",
            Family::Opportunity => "o",
            Family::Energy => "e",
            Family::Chain => "n",
            Family::AutoHelp => "h",
            Family::SoftLocks => "l",
            Family::RetryDecay => "r",
            Family::Consent => "k",
            Family::LeadMerge => "m",
            Family::Pod => "p",
        }
    }

    /// Families persisted under one global key rather than per scope.
    pub fn is_global(&self) -> bool {
        matches!(self, Family::Energy | Family::SoftLocks | Family::RetryDecay)
    }
}

pub fn ledger_key(family: Family, scope: &str) -> String {
    if scope.is_empty() {
        format!("ppp:{}:v1", family.name())
    } else {
        format!("ppp:{}:v1::{}", family.name(), scope)
    }
}

pub fn clock_key(family: Family, scope: &str) -> String {
    if scope.is_empty() {
        format!("ppp:{}Clock:v1", family.name())
    } else {
        format!("ppp:{}Clock:v1::{}", family.name(), scope)
    }
}

/// Derive an event id. Uniqueness holds over scope × stamp × type because
/// stamps are monotonic within a family/scope.
pub fn event_id(scope: &str, stamp: &str, kind: &str) -> String {
    format!("{}#{}#{}", scope, stamp, kind)
}
