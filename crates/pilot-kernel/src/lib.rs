//! The revenue kernel: a deterministic, event-sourced decision pipeline.
//!
//! A host hands the kernel an injected KV capability, builds a
//! [`PipelineInput`] per proposed action, and receives an [`Outcome`]
//! (`executed | deferred | halted`) with a [`ProofBundle`] and a revenue
//! ledger entry. Guards run in fixed precedence; every decision is evidenced
//! and appended to per-scope append-only ledgers.
//!
//! [`Outcome`]: pilot_core::Outcome
//! [`ProofBundle`]: pilot_core::ProofBundle

pub mod execute;
pub mod pipeline;
pub mod revenue;
pub mod runner;

pub use execute::{ExecuteOptions, ExecutionRecord};
pub use pipeline::{
    HandoffRequirement, Kernel, LockRequest, PendingRun, PipelineInput, RetryProbe, StepOutput,
    StepPhase, DEFAULT_POD,
};
pub use revenue::RevenueLedgerEntry;
pub use runner::{ActionRunner, MockRunner, RunnerCall, RunnerResult, RunnerStatus, StaticRunner};
