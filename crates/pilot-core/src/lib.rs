//! Core types for the revenue kernel.
//!
//! This crate owns the data model shared by every layer above it:
//! - [`ActionSpec`] — a content-addressed proposed business action
//! - [`Outcome`] / [`ProofBundle`] — the pipeline's decision and audit trail
//! - [`EvidenceRef`] — the immutable provider-call commitment
//! - [`KernelError`] / [`PersistenceWarning`] — the error surface
//! - [`ContentHash`] and identity derivation
//!
//! Nothing in this crate touches storage or makes decisions.

pub mod action;
pub mod constants;
pub mod error;
pub mod evidence;
pub mod hash;
pub mod outcome;
pub mod types;

pub use action::{ActionKind, ActionSpec, Payload, RiskLevel};
pub use constants::*;
pub use error::{KernelError, PersistenceWarning};
pub use evidence::{build_evidence_ref, EvidenceRef, EvidenceStatus, INTERNAL_PROVIDER};
pub use hash::{blake3_hash, content_hash, identity_key, stable_json, ContentHash};
pub use outcome::{FailCode, GuardCheck, NextAction, Outcome, OutcomeKind, ProofBundle};
pub use types::{Channel, Mode, PolicyContext, Stamp, Timestamp};
