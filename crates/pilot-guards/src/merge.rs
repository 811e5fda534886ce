//! Deterministic lead dedup and merge.
//!
//! `merge_leads` is a pure function of its inputs: the primary record is the
//! one with the lexicographically smallest `created_at` (ties broken by id),
//! and the normalized key collapses casing and punctuation so two renderings
//! of the same contact point dedup to one lead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pilot_core::Stamp;
use pilot_store::{event_id, Family, Store};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// ISO-8601 creation time as recorded by the host; compared lexically.
    pub created_at: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Dedup key: email | phone | id, normalized.
pub fn normalized_key(lead: &LeadRecord) -> String {
    if let Some(email) = lead.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return format!("email:{}", email.to_lowercase());
    }
    if let Some(phone) = lead.phone.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            return format!("phone:{}", digits);
        }
    }
    format!("id:{}", lead.id)
}

#[derive(Clone, Debug, PartialEq)]
pub struct MergedLead {
    pub primary: LeadRecord,
    /// Id of the record folded into the primary.
    pub merged_id: String,
    pub key: String,
}

pub fn merge_leads(existing: &LeadRecord, incoming: &LeadRecord) -> MergedLead {
    let existing_rank = (existing.created_at.as_str(), existing.id.as_str());
    let incoming_rank = (incoming.created_at.as_str(), incoming.id.as_str());
    let (primary_source, secondary) = if existing_rank <= incoming_rank {
        (existing, incoming)
    } else {
        (incoming, existing)
    };

    let mut primary = primary_source.clone();
    if primary.email.as_deref().map(str::trim).filter(|s| !s.is_empty()).is_none() {
        primary.email = secondary.email.clone();
    }
    if primary.phone.as_deref().map(str::trim).filter(|s| !s.is_empty()).is_none() {
        primary.phone = secondary.phone.clone();
    }
    for (key, value) in &secondary.fields {
        primary.fields.entry(key.clone()).or_insert_with(|| value.clone());
    }

    MergedLead {
        key: normalized_key(&primary),
        merged_id: secondary.id.clone(),
        primary,
    }
}

// ── Merge audit ledger ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeEvent {
    Merge {
        event_id: String,
        stamp: Stamp,
        primary_id: String,
        merged_id: String,
        key: String,
    },
}

pub fn record_merge(store: &Store, identity: &str, merged: &MergedLead) {
    let stamp = store.next_stamp(Family::LeadMerge, identity);
    let event = MergeEvent::Merge {
        event_id: event_id(identity, &stamp, "merge"),
        stamp,
        primary_id: merged.primary.id.clone(),
        merged_id: merged.merged_id.clone(),
        key: merged.key.clone(),
    };
    store.append_event(Family::LeadMerge, identity, &event);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(id: &str, email: Option<&str>, phone: Option<&str>, created_at: &str) -> LeadRecord {
        LeadRecord {
            id: id.to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            created_at: created_at.to_string(),
            fields: Map::new(),
        }
    }

    #[test]
    fn normalized_key_collapses_casing_and_punctuation() {
        let a = lead("1", Some("  Ana@Example.COM "), None, "2026-01-01");
        let b = lead("2", Some("ana@example.com"), None, "2026-02-01");
        assert_eq!(normalized_key(&a), normalized_key(&b));

        let c = lead("3", None, Some("+1 (555) 010-0000"), "2026-01-01");
        let d = lead("4", None, Some("15550100000"), "2026-01-01");
        assert_eq!(normalized_key(&c), normalized_key(&d));

        let e = lead("5", None, None, "2026-01-01");
        assert_eq!(normalized_key(&e), "id:5");
    }

    #[test]
    fn oldest_record_wins_with_id_tiebreak() {
        let older = lead("b", Some("a@b.com"), None, "2026-01-01");
        let newer = lead("a", Some("a@b.com"), None, "2026-03-01");
        assert_eq!(merge_leads(&older, &newer).primary.id, "b");
        // Symmetric in argument order.
        assert_eq!(merge_leads(&newer, &older).primary.id, "b");

        let tie_a = lead("a", None, None, "2026-01-01");
        let tie_b = lead("b", None, None, "2026-01-01");
        assert_eq!(merge_leads(&tie_b, &tie_a).primary.id, "a");
    }

    #[test]
    fn merge_fills_gaps_without_overwriting() {
        let mut older = lead("a", Some("a@b.com"), None, "2026-01-01");
        older.fields.insert("stage".into(), "qualified".into());
        let mut newer = lead("b", Some("x@y.com"), Some("+15550100"), "2026-02-01");
        newer.fields.insert("stage".into(), "new".into());
        newer.fields.insert("source".into(), "webinar".into());

        let merged = merge_leads(&older, &newer);
        assert_eq!(merged.primary.email.as_deref(), Some("a@b.com"), "primary keeps its email");
        assert_eq!(merged.primary.phone.as_deref(), Some("+15550100"), "gap filled");
        assert_eq!(merged.primary.fields["stage"], "qualified");
        assert_eq!(merged.primary.fields["source"], "webinar");
        assert_eq!(merged.merged_id, "b");
    }

    #[test]
    fn merge_is_a_pure_function() {
        let a = lead("a", Some("a@b.com"), None, "2026-01-01");
        let b = lead("b", None, Some("+15550100"), "2026-02-01");
        assert_eq!(merge_leads(&a, &b), merge_leads(&a, &b));
    }
}
