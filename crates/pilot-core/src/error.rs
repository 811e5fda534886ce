use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Programming and integration errors. Normal guard denials are never
/// surfaced here; they come back as [`crate::outcome::Outcome`] values.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("malformed action: {0}")]
    MalformedAction(String),

    #[error("runner contract violation: {0}")]
    RunnerContract(String),
}

/// A persistence failure the ledger layer absorbed.
///
/// The in-memory result of the call that produced this warning remains
/// authoritative; the write under `key` may be lost. Steady-state tests
/// assert that no warnings were emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceWarning {
    pub key: String,
    pub cause: String,
}
