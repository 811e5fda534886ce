//! Simplified execution path used by earlier callers: policy, confirmation,
//! runner, and the execution ledger, without the capacity, consent or queue
//! guards.

use serde::{Deserialize, Serialize};
use tracing::info;

use pilot_core::{
    build_evidence_ref, identity_key, ActionSpec, ContentHash, EvidenceRef, OutcomeKind,
    PolicyContext, Stamp, Timestamp,
};
use pilot_guards::policy::{self, PolicyReport};
use pilot_store::{event_id, Family, LedgerEvent, Page, Store};

use crate::pipeline::Kernel;
use crate::runner::{ActionRunner, RunnerCall, RunnerStatus};

#[derive(Clone, Debug)]
pub struct ExecuteOptions {
    pub ctx: PolicyContext,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub confirmed: bool,
    pub now: Timestamp,
}

impl ExecuteOptions {
    pub fn new(ctx: PolicyContext, now: Timestamp) -> Self {
        Self { ctx, user_id: None, email: None, confirmed: false, now }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub record_id: String,
    pub timestamp: Stamp,
    pub action_id: ContentHash,
    pub intent_id: String,
    pub status: OutcomeKind,
    pub policy: PolicyReport,
    pub evidence: EvidenceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LedgerEvent for ExecutionRecord {
    fn event_id(&self) -> &str {
        &self.record_id
    }
}

impl Kernel {
    /// Evaluate policy and confirmation, invoke the runner if both pass, and
    /// record the attempt on the execution ledger.
    pub fn execute_action_pipeline(
        &self,
        action: &ActionSpec,
        opts: &ExecuteOptions,
        runner: &dyn ActionRunner,
    ) -> ExecutionRecord {
        let identity = identity_key(opts.user_id.as_deref(), opts.email.as_deref());
        let report = policy::evaluate(action, &opts.ctx);

        let (status, evidence, error) = if let Some(reason) = report.reason {
            (
                OutcomeKind::Halted,
                build_evidence_ref(action, &opts.ctx, pilot_core::INTERNAL_PROVIDER, None, opts.now),
                Some(reason.as_str().to_string()),
            )
        } else if report.requires_confirm && !opts.confirmed {
            (
                OutcomeKind::Deferred,
                build_evidence_ref(action, &opts.ctx, pilot_core::INTERNAL_PROVIDER, None, opts.now),
                Some("CONFIRMATION_REQUIRED".to_string()),
            )
        } else {
            let result = runner.run(&RunnerCall { action: action.clone(), ctx: opts.ctx });
            match result.status {
                RunnerStatus::Executed => (
                    OutcomeKind::Executed,
                    build_evidence_ref(action, &opts.ctx, &result.provider, result.response_id, opts.now),
                    None,
                ),
                RunnerStatus::Failed => (
                    OutcomeKind::Halted,
                    build_evidence_ref(action, &opts.ctx, &result.provider, None, opts.now)
                        .with_error(),
                    result.error,
                ),
            }
        };

        let stamp = self.store.next_stamp(Family::Exec, &identity);
        let record = ExecutionRecord {
            record_id: event_id(&identity, &stamp, "exec"),
            timestamp: stamp,
            action_id: action.action_id,
            intent_id: action.intent_id.clone(),
            status,
            policy: report,
            evidence,
            error,
        };
        self.store.append_event(Family::Exec, &identity, &record);
        info!(%identity, status = status.as_str(), "execution recorded");
        record
    }

    pub fn execution_page(
        &self,
        identity: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Page<ExecutionRecord> {
        self.store.read_page(Family::Exec, identity, limit, cursor)
    }
}

/// Direct ledger read for hosts holding only a [`Store`].
pub fn execution_records(store: &Store, identity: &str) -> Vec<ExecutionRecord> {
    store.read_events(Family::Exec, identity)
}
