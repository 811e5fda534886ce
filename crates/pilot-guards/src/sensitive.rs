//! Sensitive-data gate: categorical acknowledgement and the no-optimization
//! rule from the constitution.

use serde::{Deserialize, Serialize};
use std::fmt;

use pilot_core::constants::SENSITIVE_OPTIMIZATION_TARGETS;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensitiveReport {
    #[serde(default)]
    pub categories: Vec<String>,
    pub triggers_action: bool,
    pub acknowledged: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensitiveDenial {
    Trigger,
    AckRequired,
    Optimization,
}

impl SensitiveDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveDenial::Trigger => "SENSITIVE_TRIGGER",
            SensitiveDenial::AckRequired => "SENSITIVE_ACK_REQUIRED",
            SensitiveDenial::Optimization => "SENSITIVE_OPTIMIZATION",
        }
    }
}

impl fmt::Display for SensitiveDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rules in order: a report with categories that triggers an action is denied
/// outright; unacknowledged categories require an acknowledgement; categories
/// overlapping the optimization-target list are never actionable.
pub fn check(report: &SensitiveReport) -> Result<(), SensitiveDenial> {
    if report.categories.is_empty() {
        return Ok(());
    }
    if report.triggers_action {
        return Err(SensitiveDenial::Trigger);
    }
    if !report.acknowledged {
        return Err(SensitiveDenial::AckRequired);
    }
    if report.categories.iter().any(|c| {
        SENSITIVE_OPTIMIZATION_TARGETS.contains(&c.trim().to_lowercase().as_str())
    }) {
        return Err(SensitiveDenial::Optimization);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(categories: &[&str], triggers_action: bool, acknowledged: bool) -> SensitiveReport {
        SensitiveReport {
            categories: categories.iter().map(|s| s.to_string()).collect(),
            triggers_action,
            acknowledged,
        }
    }

    #[test]
    fn empty_categories_pass() {
        assert_eq!(check(&report(&[], true, false)), Ok(()));
    }

    #[test]
    fn trigger_beats_ack_beats_optimization() {
        assert_eq!(check(&report(&["health"], true, true)), Err(SensitiveDenial::Trigger));
        assert_eq!(check(&report(&["health"], false, false)), Err(SensitiveDenial::AckRequired));
        assert_eq!(check(&report(&["Health"], false, true)), Err(SensitiveDenial::Optimization));
    }

    #[test]
    fn acknowledged_non_target_categories_pass() {
        assert_eq!(check(&report(&["billing address"], false, true)), Ok(()));
    }
}
