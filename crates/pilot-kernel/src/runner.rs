//! The action runner contract: the pipeline's single external effect.
//!
//! The pipeline itself is a synchronous state machine; when every guard
//! passes it emits one [`RunnerCall`] and suspends. Hosts drive the call on
//! their async side (or synchronously through [`crate::Kernel::run_step`])
//! and feed the [`RunnerResult`] back in.

use serde::{Deserialize, Serialize};

use pilot_core::{ActionSpec, Mode, PolicyContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    Executed,
    Failed,
}

/// The effect issued by the pipeline.
#[derive(Clone, Debug)]
pub struct RunnerCall {
    pub action: ActionSpec,
    pub ctx: PolicyContext,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerResult {
    pub status: RunnerStatus,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunnerResult {
    pub fn executed(provider: impl Into<String>, response_id: Option<String>) -> Self {
        Self { status: RunnerStatus::Executed, provider: provider.into(), response_id, error: None }
    }

    pub fn failed(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: RunnerStatus::Failed,
            provider: provider.into(),
            response_id: None,
            error: Some(error.into()),
        }
    }
}

pub trait ActionRunner {
    fn run(&self, call: &RunnerCall) -> RunnerResult;
}

/// Default runner: succeeds with mock evidence in MOCK/OFFLINE and fails in
/// LIVE, where no transport is wired.
pub struct MockRunner;

impl ActionRunner for MockRunner {
    fn run(&self, call: &RunnerCall) -> RunnerResult {
        match call.ctx.mode {
            Mode::Mock | Mode::Offline => RunnerResult::executed("mock", None),
            Mode::Live => RunnerResult::failed("mock", "NO_LIVE_TRANSPORT"),
        }
    }
}

/// Returns a canned result regardless of the call. Test double for LIVE-mode
/// provider behavior.
pub struct StaticRunner {
    pub result: RunnerResult,
}

impl ActionRunner for StaticRunner {
    fn run(&self, _call: &RunnerCall) -> RunnerResult {
        self.result.clone()
    }
}
