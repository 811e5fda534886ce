//! Channel permission derivation and selection.
//!
//! Derivation rules:
//!   SMS allowed   iff a verified mobile number exists
//!   voice allowed iff any phone number exists
//!   email allowed iff a non-empty email exists
//!   do-not-contact forces every channel off
//!
//! Selection priority: sms → voice → email.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use pilot_core::Channel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneKind {
    Mobile,
    Landline,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhoneEntry {
    pub number: String,
    pub kind: PhoneKind,
    pub verified: bool,
}

impl PhoneEntry {
    /// Classify a host-supplied phone type label.
    pub fn classify(number: impl Into<String>, type_label: &str, verified: bool) -> Self {
        let kind = match type_label.trim().to_lowercase().as_str() {
            "mobile" | "cell" | "cellphone" => PhoneKind::Mobile,
            "landline" | "home" | "office" | "work" => PhoneKind::Landline,
            _ => PhoneKind::Unknown,
        };
        Self { number: number.into(), kind, verified }
    }
}

/// Raw contact data the host knows about a lead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadContact {
    #[serde(default)]
    pub phones: Vec<PhoneEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityProfile {
    pub sms_allowed: bool,
    pub voice_allowed: bool,
    pub email_allowed: bool,
    pub do_not_contact: bool,
    /// Attempt counters per channel, maintained by [`record_outcome`].
    #[serde(default)]
    pub attempts: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<ChannelOutcome>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel: Channel,
    pub outcome: String,
}

pub fn derive(contact: &LeadContact, do_not_contact: bool) -> ReachabilityProfile {
    let sms_allowed = contact
        .phones
        .iter()
        .any(|p| p.kind == PhoneKind::Mobile && p.verified);
    let voice_allowed = !contact.phones.is_empty();
    let email_allowed = contact
        .email
        .as_deref()
        .map(|e| !e.trim().is_empty())
        .unwrap_or(false);
    ReachabilityProfile {
        sms_allowed,
        voice_allowed,
        email_allowed,
        do_not_contact,
        attempts: BTreeMap::new(),
        last_outcome: None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelDenial {
    DoNotContact,
    SmsNotAllowed,
    VoiceNotAllowed,
    EmailNotAllowed,
    NoReachableChannels,
}

impl ChannelDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelDenial::DoNotContact => "DO_NOT_CONTACT",
            ChannelDenial::SmsNotAllowed => "SMS_NOT_ALLOWED",
            ChannelDenial::VoiceNotAllowed => "VOICE_NOT_ALLOWED",
            ChannelDenial::EmailNotAllowed => "EMAIL_NOT_ALLOWED",
            ChannelDenial::NoReachableChannels => "NO_REACHABLE_CHANNELS",
        }
    }
}

impl fmt::Display for ChannelDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Best channel by priority, or why none is available.
pub fn select_channel(profile: &ReachabilityProfile) -> Result<Channel, ChannelDenial> {
    if profile.do_not_contact {
        return Err(ChannelDenial::DoNotContact);
    }
    if profile.sms_allowed {
        return Ok(Channel::Sms);
    }
    if profile.voice_allowed {
        return Ok(Channel::Voice);
    }
    if profile.email_allowed {
        return Ok(Channel::Email);
    }
    Err(ChannelDenial::NoReachableChannels)
}

pub fn can_use_channel(profile: &ReachabilityProfile, channel: Channel) -> Result<(), ChannelDenial> {
    if profile.do_not_contact {
        return Err(ChannelDenial::DoNotContact);
    }
    if !profile.sms_allowed && !profile.voice_allowed && !profile.email_allowed {
        return Err(ChannelDenial::NoReachableChannels);
    }
    match channel {
        Channel::Sms if !profile.sms_allowed => Err(ChannelDenial::SmsNotAllowed),
        Channel::Voice if !profile.voice_allowed => Err(ChannelDenial::VoiceNotAllowed),
        Channel::Email if !profile.email_allowed => Err(ChannelDenial::EmailNotAllowed),
        _ => Ok(()),
    }
}

pub fn record_outcome(profile: &mut ReachabilityProfile, channel: Channel, outcome: &str) {
    *profile.attempts.entry(channel.as_str().to_string()).or_insert(0) += 1;
    profile.last_outcome = Some(ChannelOutcome { channel, outcome: outcome.to_string() });
}
