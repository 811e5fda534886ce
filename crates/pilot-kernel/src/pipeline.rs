//! The pipeline orchestrator.
//!
//! `begin_step` walks the guards in fixed precedence; the first denial wins
//! and becomes a halted or deferred outcome. Guards with ledger side-effects
//! (chain attempts, lock acquisition, opportunity enqueue, capacity defers)
//! write on the way down, so a later denial still leaves the earlier
//! evidence on the ledgers. When everything passes, the pipeline suspends on
//! its single external effect, the runner call; `complete_step` finishes the
//! decision, applies post-decision effects, and writes the revenue ledger.

use std::sync::Arc;

use tracing::info;

use pilot_core::constants::{DEFAULT_CHAIN_MAX_DEPTH, MISSING_INTENT_PLACEHOLDER, MOCK_DEFAULT_INTENT};
use pilot_core::{
    build_evidence_ref, identity_key, ActionSpec, Channel, EvidenceRef, FailCode, GuardCheck,
    KernelError, Mode, NextAction, Outcome, OutcomeKind, PersistenceWarning, PolicyContext,
    ProofBundle, Timestamp,
};
use pilot_guards::cooling;
use pilot_guards::energy::{self, EnergyLimits};
use pilot_guards::opportunity::{self, GateState, OpportunityRequest};
use pilot_guards::policy::{self, PolicyReport};
use pilot_guards::reachability::{self, LeadContact};
use pilot_guards::retry;
use pilot_guards::sensitive::{self, SensitiveReport};
use pilot_guards::throttle::{self, ThrottleState};
use pilot_guards::{autohelp, capacity, chain, consent, locks, merge, pod, CoolingMode};
use pilot_store::{KvStore, Page, Store};

use crate::revenue::{self, RevenueLedgerEntry};
use crate::runner::{ActionRunner, RunnerCall, RunnerResult, RunnerStatus};

/// Pod scope used when neither the caller nor the pod ledger names one.
pub const DEFAULT_POD: &str = "pod:default";

const DEFAULT_HUMAN: &str = "human:default";
const NO_CHANNEL: &str = "none";

// ── Input ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct HandoffRequirement {
    pub required: bool,
    pub token: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LockRequest {
    pub resource_id: String,
    /// Release automatically on non-deferred outcomes.
    pub auto_release: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetryProbe {
    pub key: String,
    /// Cooldown steps the caller has waited since the last attempt.
    pub steps_waited: u32,
}

/// Everything one pipeline step needs. Construct with [`PipelineInput::new`]
/// and set the optional gates the call cares about.
#[derive(Clone, Debug)]
pub struct PipelineInput {
    pub action: ActionSpec,
    pub ctx: PolicyContext,
    pub now: Timestamp,
    pub user_id: Option<String>,
    pub email: Option<String>,
    /// Pod scope; falls back to the pod ledger, then [`DEFAULT_POD`].
    pub pod_id: Option<String>,
    pub thread_id: Option<String>,
    pub human_id: Option<String>,
    pub contact: Option<LeadContact>,
    pub throttle_key: Option<String>,
    pub throttle: Option<ThrottleState>,
    pub opportunity: Option<OpportunityRequest>,
    pub sensitive: Option<SensitiveReport>,
    pub handoff: Option<HandoffRequirement>,
    pub lock: Option<LockRequest>,
    pub chain_max_depth: u32,
    /// This action is itself an auto-help signal.
    pub auto_help: bool,
    pub retry: Option<RetryProbe>,
    pub energy: EnergyLimits,
    /// Growth classification override; defaults to "outbound kinds grow".
    pub growth: Option<bool>,
    pub confirmed: bool,
    pub cooldown_satisfied: bool,
    pub stage_transition: Option<String>,
    pub notes: Option<String>,
}

impl PipelineInput {
    pub fn new(action: ActionSpec, ctx: PolicyContext, now: Timestamp) -> Self {
        Self {
            action,
            ctx,
            now,
            user_id: None,
            email: None,
            pod_id: None,
            thread_id: None,
            human_id: None,
            contact: None,
            throttle_key: None,
            throttle: None,
            opportunity: None,
            sensitive: None,
            handoff: None,
            lock: None,
            chain_max_depth: DEFAULT_CHAIN_MAX_DEPTH,
            auto_help: false,
            retry: None,
            energy: EnergyLimits::default(),
            growth: None,
            confirmed: false,
            cooldown_satisfied: false,
            stage_transition: None,
            notes: None,
        }
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct StepOutput {
    pub outcome: Outcome,
    pub proof: ProofBundle,
    pub ledger_entry: RevenueLedgerEntry,
    /// Persistence failures absorbed during this step; empty in steady state.
    pub warnings: Vec<PersistenceWarning>,
}

/// Result of [`Kernel::begin_step`]: either the guards decided without the
/// runner, or the pipeline is suspended on its one external effect.
pub enum StepPhase {
    Decided(StepOutput),
    AwaitRunner(PendingRun),
}

/// A pipeline step suspended on the runner effect. Capacity load has already
/// been incremented; abandoning a pending run leaves that imbalance to be
/// recovered by an explicit `resume`/`configure`.
pub struct PendingRun {
    pub call: RunnerCall,
    staged: StagedStep,
}

struct StagedStep {
    input: PipelineInput,
    identity: String,
    pod: String,
    report: PolicyReport,
    checks: Vec<GuardCheck>,
    opportunity_ready_id: Option<String>,
    lock_engaged: Option<LockRequest>,
    energy_channel: &'static str,
}

// ── Kernel ───────────────────────────────────────────────────────────────────

/// The revenue kernel facade: owns the store, exposes the pipeline and the
/// ledger operations hosts need. One kernel per process; partition by
/// identity and pod for parallelism.
pub struct Kernel {
    pub(crate) store: Store,
}

impl Kernel {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { store: Store::new(kv) }
    }

    pub fn in_memory() -> Self {
        Self { store: Store::memory() }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ── Pipeline ─────────────────────────────────────────────────────────────

    /// Run one step end-to-end with a synchronous runner.
    pub fn run_step(
        &self,
        input: PipelineInput,
        runner: &dyn ActionRunner,
    ) -> Result<StepOutput, KernelError> {
        match self.begin_step(input)? {
            StepPhase::Decided(output) => Ok(output),
            StepPhase::AwaitRunner(pending) => {
                let result = runner.run(&pending.call);
                self.complete_step(pending, result)
            }
        }
    }

    /// Walk guards 1–17. On the first denial the step is decided; otherwise
    /// capacity load is incremented and the runner effect is issued.
    pub fn begin_step(&self, input: PipelineInput) -> Result<StepPhase, KernelError> {
        let mut input = input;
        input.action = with_intent_fallback(&input.action, input.ctx.mode);

        let identity = identity_key(input.user_id.as_deref(), input.email.as_deref());
        let pod = input
            .pod_id
            .clone()
            .or_else(|| pod::current_pod(&self.store, &identity))
            .unwrap_or_else(|| DEFAULT_POD.to_string());
        let report = policy::evaluate(&input.action, &input.ctx);

        let mut staged = StagedStep {
            identity,
            pod,
            report,
            checks: Vec::new(),
            opportunity_ready_id: None,
            lock_engaged: None,
            energy_channel: input
                .action
                .kind()
                .channel()
                .as_ref()
                .map(Channel::as_str)
                .unwrap_or(NO_CHANNEL),
            input,
        };
        let denial_evidence = build_evidence_ref(
            &staged.input.action,
            &staged.input.ctx,
            pilot_core::INTERNAL_PROVIDER,
            None,
            staged.input.now,
        );

        // ── 1. Policy ────────────────────────────────────────────────────────
        if let Some(reason) = staged.report.reason {
            staged.checks.push(GuardCheck::fail("policy", reason.as_str()));
            let outcome = Outcome::halted(
                FailCode::PolicyConflict,
                reason,
                format!("policy denied {} action", staged.input.action.kind().as_str()),
                NextAction::AskUser,
            );
            return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
        }
        staged.checks.push(GuardCheck::pass("policy"));

        // ── 2. Handoff token ─────────────────────────────────────────────────
        if let Some(handoff) = staged.input.handoff.clone() {
            let token_present = handoff
                .token
                .as_deref()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false);
            if handoff.required && !token_present {
                staged.checks.push(GuardCheck::fail("handoff", "HANDOFF_TOKEN_MISSING"));
                let outcome = Outcome::halted(
                    FailCode::PolicyConflict,
                    "HANDOFF_TOKEN_MISSING",
                    "a handoff is required but no token was supplied",
                    NextAction::AskUser,
                );
                return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
            }
            staged.checks.push(GuardCheck::pass("handoff"));
        }

        // ── 3. Chain depth ───────────────────────────────────────────────────
        if let Some(thread) = staged.input.thread_id.clone() {
            let depth = chain::load_depth(&self.store, &thread);
            if depth >= staged.input.chain_max_depth {
                chain::record_blocked(&self.store, &thread);
                let reason = format!(
                    "CHAIN_DEPTH_EXCEEDED depth {} of max {}",
                    depth, staged.input.chain_max_depth
                );
                staged.checks.push(GuardCheck::fail("chain", reason.clone()));
                let outcome = Outcome::halted(
                    FailCode::SafeOverload,
                    reason,
                    format!("thread {} needs a reset before more attempts", thread),
                    NextAction::AskUser,
                );
                return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
            }
            chain::record_attempt(&self.store, &thread);
            staged.checks.push(GuardCheck::pass_with("chain", format!("depth {}", depth + 1)));
        }

        // ── 4. Auto-help repeat ──────────────────────────────────────────────
        if staged.input.auto_help {
            if let Some(thread) = staged.input.thread_id.clone() {
                if autohelp::load_unacked(&self.store, &thread) {
                    staged.checks.push(GuardCheck::fail("auto_help", "AUTO_HELP_UNACKNOWLEDGED"));
                    let outcome = Outcome::halted(
                        FailCode::PolicyConflict,
                        "AUTO_HELP_UNACKNOWLEDGED",
                        format!("thread {} has an outstanding auto-help signal", thread),
                        NextAction::AskUser,
                    );
                    return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
                }
                staged.checks.push(GuardCheck::pass("auto_help"));
            }
        }

        // ── 5. Soft lock ─────────────────────────────────────────────────────
        if let Some(lock) = staged.input.lock.clone() {
            match locks::holder(&self.store, &lock.resource_id) {
                Some(holder) if holder.pod_id != staged.pod => {
                    let reason =
                        format!("SOFT_LOCK_HELD resource {} by {}", lock.resource_id, holder.pod_id);
                    staged.checks.push(GuardCheck::fail("soft_lock", reason.clone()));
                    let outcome = Outcome::halted(
                        FailCode::PolicyConflict,
                        reason,
                        "the resource is soft-locked by another pod",
                        NextAction::AskUser,
                    );
                    return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
                }
                Some(_) => {
                    // Already ours; keep holding with the caller's release mode.
                    staged.checks.push(GuardCheck::pass_with("soft_lock", "already held"));
                    staged.lock_engaged = Some(lock);
                }
                None => {
                    locks::acquire(&self.store, &lock.resource_id, &staged.pod, lock.auto_release);
                    staged.checks.push(GuardCheck::pass("soft_lock"));
                    staged.lock_engaged = Some(lock);
                }
            }
        }

        // ── 6. Sensitive data ────────────────────────────────────────────────
        if let Some(report) = &staged.input.sensitive {
            if let Err(denial) = sensitive::check(report) {
                staged.checks.push(GuardCheck::fail("sensitive", denial.as_str()));
                let outcome = Outcome::halted(
                    FailCode::ComplianceBlocked,
                    denial,
                    "sensitive-data gate refused the action",
                    NextAction::AskUser,
                );
                return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
            }
            staged.checks.push(GuardCheck::pass("sensitive"));
        }

        // ── 7–8. Opportunity queue ───────────────────────────────────────────
        if let Some(request) = staged.input.opportunity.clone() {
            let gate = opportunity::gate(&self.store, &staged.pod, &request);
            match gate.state {
                GateState::Blocked => {
                    let reason = gate.reason.unwrap_or("BLOCKED");
                    staged.checks.push(GuardCheck::fail("opportunity", reason));
                    let retryable = matches!(
                        reason,
                        opportunity::OUT_OF_ORDER
                            | opportunity::COOLDOWN_REQUIRED
                            | opportunity::QUEUE_FULL
                    );
                    let outcome = if retryable {
                        Outcome::deferred(
                            FailCode::OpportunityGate,
                            reason,
                            "the opportunity queue is not ready for this entry",
                            NextAction::Schedule,
                        )
                    } else {
                        Outcome::halted(
                            FailCode::OpportunityGate,
                            reason,
                            "the opportunity reference cannot be satisfied",
                            NextAction::AskUser,
                        )
                    };
                    return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
                }
                GateState::Queued => {
                    staged.checks.push(GuardCheck::fail("opportunity", opportunity::QUEUED));
                    let outcome = Outcome::deferred(
                        FailCode::OpportunityGate,
                        opportunity::QUEUED,
                        "queued; execute once the opportunity reaches the front",
                        NextAction::Schedule,
                    );
                    return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
                }
                GateState::Ready => {
                    staged.opportunity_ready_id = request.id.clone();
                    staged.checks.push(GuardCheck::pass("opportunity"));
                }
                GateState::None => staged.checks.push(GuardCheck::pass("opportunity")),
            }
        }

        // ── 9. Retry cooldown ────────────────────────────────────────────────
        if let Some(probe) = &staged.input.retry {
            let state = retry::load(&self.store, &probe.key);
            if retry::cooldown_active(&state, probe.steps_waited) {
                let reason = format!(
                    "RETRY_COOLDOWN {} of {} steps waited",
                    probe.steps_waited,
                    state.required_cooldown_steps()
                );
                staged.checks.push(GuardCheck::fail("retry", reason.clone()));
                let outcome = Outcome::deferred(
                    FailCode::CooldownActive,
                    reason,
                    "retry decay cooldown is still running",
                    NextAction::Schedule,
                );
                return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
            }
            staged.checks.push(GuardCheck::pass("retry"));
        }

        // ── 10. Growth during repair ─────────────────────────────────────────
        let cap = capacity::load(&self.store, &staged.pod);
        let growth = staged
            .input
            .growth
            .unwrap_or_else(|| staged.input.action.kind().is_outbound());
        if growth && cap.cooling_state == CoolingMode::Repair {
            staged.checks.push(GuardCheck::fail("repair", "GROWTH_DURING_REPAIR"));
            let outcome = Outcome::halted(
                FailCode::SafeOverload,
                "GROWTH_DURING_REPAIR",
                format!("pod {} is in repair; growth actions are disallowed", staged.pod),
                NextAction::AskUser,
            );
            return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
        }
        staged.checks.push(GuardCheck::pass("repair"));

        // ── 11. Energy capacity ──────────────────────────────────────────────
        let day = energy::day_id(staged.input.now);
        let human = staged.input.human_id.clone().unwrap_or_else(|| DEFAULT_HUMAN.to_string());
        let energy_state =
            energy::state(&self.store, &day, &staged.pod, &human, staged.energy_channel);
        let required = energy::required_units(staged.input.action.irreversible, &staged.input.energy);
        if let Err(denial) = energy::check(&energy_state, &staged.input.energy, required) {
            staged.checks.push(GuardCheck::fail("energy", denial.as_str()));
            let outcome = Outcome::deferred(
                FailCode::CapacityExceeded,
                denial,
                "the energy budget for this scope is exhausted",
                NextAction::Schedule,
            );
            return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
        }
        staged.checks.push(GuardCheck::pass("energy"));

        // ── 12. Concurrent capacity ──────────────────────────────────────────
        if cap.active_load >= cap.max_concurrent_actions {
            capacity::record_defer(&self.store, &staged.pod);
            cooling::record_deferral(&self.store, &staged.pod);
            cooling::reassess(&self.store, &staged.pod);
            let reason = format!(
                "CAPACITY_EXCEEDED load {} of {}",
                cap.active_load, cap.max_concurrent_actions
            );
            staged.checks.push(GuardCheck::fail("capacity", reason.clone()));
            let outcome = Outcome::deferred(
                FailCode::CapacityExceeded,
                reason,
                format!("pod {} is at its concurrency cap", staged.pod),
                NextAction::Schedule,
            );
            return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
        }
        staged.checks.push(GuardCheck::pass("capacity"));

        // ── 13–14. Consent and reachability (outreach kinds only) ────────────
        if staged.input.action.kind().is_outreach() {
            let consent_state = consent::load(&self.store, &staged.identity);
            if let Err(denial) = consent::check_outreach(&consent_state, staged.input.action.kind())
            {
                staged.checks.push(GuardCheck::fail("consent", denial.as_str()));
                let outcome = Outcome::halted(
                    FailCode::ComplianceBlocked,
                    denial,
                    format!("{} has not consented to outreach", staged.identity),
                    NextAction::AskUser,
                );
                return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
            }
            staged.checks.push(GuardCheck::pass("consent"));

            if let Some(channel) = staged.input.action.kind().channel() {
                let contact = staged.input.contact.clone().unwrap_or_default();
                let profile = reachability::derive(&contact, consent_state.do_not_contact);
                if let Err(denial) = reachability::can_use_channel(&profile, channel) {
                    staged.checks.push(GuardCheck::fail("reachability", denial.as_str()));
                    let outcome = Outcome::halted(
                        FailCode::ComplianceBlocked,
                        denial,
                        format!("channel {} is not usable for this lead", channel),
                        NextAction::AskUser,
                    );
                    return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
                }
                staged.checks.push(GuardCheck::pass("reachability"));
            }
        }

        // ── 15. Throttle ─────────────────────────────────────────────────────
        if let (Some(key), Some(state)) = (&staged.input.throttle_key, &staged.input.throttle) {
            if let Err(denial) = throttle::check(state, key, staged.input.now) {
                staged.checks.push(GuardCheck::fail("throttle", denial.as_str()));
                let outcome = Outcome::deferred(
                    FailCode::Throttled,
                    denial,
                    format!("send key {} is throttled", key),
                    NextAction::Schedule,
                );
                return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
            }
            staged.checks.push(GuardCheck::pass("throttle"));
        }

        // ── 16. Irreversible cooldown ────────────────────────────────────────
        if staged.input.action.irreversible && !staged.input.cooldown_satisfied {
            let reason =
                format!("IRREVERSIBLE_COOLDOWN {}s required", staged.report.cooldown_seconds);
            staged.checks.push(GuardCheck::fail("cooldown", reason.clone()));
            let outcome = Outcome::deferred(
                FailCode::CooldownActive,
                reason,
                "irreversible actions wait out their cooldown first",
                NextAction::Schedule,
            );
            return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
        }
        if staged.input.action.irreversible {
            staged.checks.push(GuardCheck::pass("cooldown"));
        }

        // ── 17. Confirmation ─────────────────────────────────────────────────
        if staged.report.requires_confirm && !staged.input.confirmed {
            staged.checks.push(GuardCheck::fail("confirm", "CONFIRMATION_REQUIRED"));
            let outcome = Outcome::deferred(
                FailCode::ConfirmRequired,
                "CONFIRMATION_REQUIRED",
                "a high-risk or irreversible action needs explicit approval",
                NextAction::RequestApproval,
            );
            return Ok(StepPhase::Decided(self.finalize(staged, outcome, denial_evidence)));
        }
        staged.checks.push(GuardCheck::pass("confirm"));

        // ── 18–19. Issue the runner effect ───────────────────────────────────
        capacity::load_inc(&self.store, &staged.pod);
        let call = RunnerCall { action: staged.input.action.clone(), ctx: staged.input.ctx };
        Ok(StepPhase::AwaitRunner(PendingRun { call, staged }))
    }

    /// Finish a suspended step with the runner's result: LIVE safety first,
    /// then runner failure, then the executed path with its side-effects.
    pub fn complete_step(
        &self,
        pending: PendingRun,
        result: RunnerResult,
    ) -> Result<StepOutput, KernelError> {
        let mut staged = pending.staged;
        capacity::load_dec(&self.store, &staged.pod);

        // ── 18. LIVE safety: outbound needs a provider response id ───────────
        if staged.input.ctx.mode == Mode::Live
            && staged.input.action.kind().is_outbound()
            && result.response_id.is_none()
        {
            staged.checks.push(GuardCheck::fail("live_safety", "MISSING_RESPONSE_ID"));
            let evidence = build_evidence_ref(
                &staged.input.action,
                &staged.input.ctx,
                &result.provider,
                None,
                staged.input.now,
            );
            let outcome = Outcome::halted(
                FailCode::SafeHold,
                "MISSING_RESPONSE_ID",
                "LIVE outbound actions are held without provider acknowledgement",
                NextAction::AskUser,
            );
            return Ok(self.finalize(staged, outcome, evidence));
        }
        staged.checks.push(GuardCheck::pass("live_safety"));

        // ── 19. Runner failure ───────────────────────────────────────────────
        if result.status == RunnerStatus::Failed {
            let reason = result.error.clone().unwrap_or_else(|| "RUNNER_FAILED".to_string());
            staged.checks.push(GuardCheck::fail("runner", reason.clone()));
            let evidence = build_evidence_ref(
                &staged.input.action,
                &staged.input.ctx,
                &result.provider,
                result.response_id.clone(),
                staged.input.now,
            )
            .with_error();
            let outcome = Outcome::halted(
                FailCode::RunnerError,
                reason,
                format!("runner {} reported a failure", result.provider),
                NextAction::AskUser,
            );
            return Ok(self.finalize(staged, outcome, evidence));
        }
        staged.checks.push(GuardCheck::pass("runner"));

        let evidence = build_evidence_ref(
            &staged.input.action,
            &staged.input.ctx,
            &result.provider,
            result.response_id.clone(),
            staged.input.now,
        );
        let outcome = Outcome::executed(
            format!("EXECUTED {}", staged.input.action.kind().as_str()),
            staged.input.action.description.clone(),
        );
        Ok(self.finalize(staged, outcome, evidence))
    }

    /// Post-decision effects shared by every exit path, then the revenue
    /// ledger append.
    fn finalize(&self, staged: StagedStep, outcome: Outcome, evidence: EvidenceRef) -> StepOutput {
        let StagedStep {
            input,
            identity,
            pod,
            report,
            checks,
            opportunity_ready_id,
            lock_engaged,
            energy_channel,
        } = staged;

        if outcome.is_executed() {
            if let Some(id) = &opportunity_ready_id {
                opportunity::resolve(&self.store, &pod, id);
            }
            if input.action.irreversible {
                let units = energy::required_units(true, &input.energy);
                let human = input.human_id.clone().unwrap_or_else(|| DEFAULT_HUMAN.to_string());
                energy::consume(
                    &self.store,
                    &energy::day_id(input.now),
                    &pod,
                    &human,
                    energy_channel,
                    units,
                );
            }
            if input.auto_help {
                if let Some(thread) = &input.thread_id {
                    autohelp::record_signal(&self.store, thread);
                }
            }
            if let Some(thread) = &input.thread_id {
                chain::record_complete(&self.store, thread);
            }
        }

        if let Some(lock) = &lock_engaged {
            if outcome.kind() != OutcomeKind::Deferred && lock.auto_release {
                locks::release(&self.store, &lock.resource_id, &pod);
            }
        }

        if let Some(probe) = &input.retry {
            retry::record(&self.store, &probe.key, outcome.kind());
        }

        let ledger_entry = revenue::append(
            &self.store,
            &identity,
            &input.action,
            &outcome,
            &evidence,
            input.stage_transition.clone(),
            input.notes.clone(),
        );
        info!(
            %identity,
            %pod,
            outcome = outcome.kind().as_str(),
            summary = outcome.summary(),
            "pipeline step decided"
        );

        let proof = ProofBundle {
            action_id: input.action.action_id,
            identity,
            evidence,
            checks,
            requires_confirm: report.requires_confirm,
            cooldown_seconds: report.cooldown_seconds,
        };
        StepOutput { outcome, proof, ledger_entry, warnings: self.store.drain_warnings() }
    }

    // ── Ledger operations the host drives directly ───────────────────────────

    pub fn apply_consent(
        &self,
        identity: &str,
        status: consent::ConsentStatus,
        evidence_ref: Option<String>,
    ) -> consent::LeadConsentState {
        consent::apply_consent(&self.store, identity, status, evidence_ref)
    }

    pub fn apply_opt_out(
        &self,
        identity: &str,
        evidence_ref: Option<String>,
    ) -> consent::OptOutReceipt {
        consent::apply_opt_out(&self.store, identity, evidence_ref)
    }

    pub fn acknowledge_auto_help(&self, thread: &str) {
        autohelp::acknowledge(&self.store, thread);
    }

    pub fn reset_chain(&self, thread: &str) {
        chain::reset(&self.store, thread);
    }

    pub fn configure_capacity(&self, pod: &str, max_concurrent_actions: u32, recovery_rate: u32) {
        capacity::configure(&self.store, pod, max_concurrent_actions, recovery_rate);
    }

    pub fn open_cooling_window(
        &self,
        pod: &str,
        window_id: &str,
        max_new: u32,
        deferral_threshold: u32,
        repair_threshold: u32,
    ) {
        cooling::open_window(&self.store, pod, window_id, max_new, deferral_threshold, repair_threshold);
    }

    pub fn record_burnout(&self, pod: &str) {
        cooling::record_burnout(&self.store, pod);
        cooling::reassess(&self.store, pod);
    }

    pub fn try_exit_repair(&self, pod: &str) -> bool {
        cooling::try_exit_repair(&self.store, pod)
    }

    pub fn release_lock(&self, resource_id: &str, pod: &str) {
        locks::release(&self.store, resource_id, pod);
    }

    pub fn assign_pod(&self, identity: &str, pod_id: &str) {
        pod::assign(&self.store, identity, pod_id);
    }

    /// Pure dedup/merge, recorded on the merge audit ledger under the
    /// primary's identity.
    pub fn merge_leads(
        &self,
        existing: &merge::LeadRecord,
        incoming: &merge::LeadRecord,
    ) -> merge::MergedLead {
        let merged = merge::merge_leads(existing, incoming);
        let identity = identity_key(Some(&merged.primary.id), merged.primary.email.as_deref());
        merge::record_merge(&self.store, &identity, &merged);
        merged
    }

    pub fn revenue_page(
        &self,
        identity: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Page<RevenueLedgerEntry> {
        revenue::page(&self.store, identity, limit, cursor)
    }

    pub fn revenue_tail(
        &self,
        identity: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Page<RevenueLedgerEntry> {
        revenue::tail(&self.store, identity, limit, cursor)
    }
}

/// Empty intents become `intent:default` in MOCK and `intent:missing`
/// elsewhere (which policy then denies). `action_id` is never recomputed —
/// specs are immutable once hashed.
fn with_intent_fallback(action: &ActionSpec, mode: Mode) -> ActionSpec {
    if !action.intent_id.trim().is_empty() {
        return action.clone();
    }
    let mut patched = action.clone();
    patched.intent_id = match mode {
        Mode::Mock => MOCK_DEFAULT_INTENT.to_string(),
        _ => MISSING_INTENT_PLACEHOLDER.to_string(),
    };
    patched
}
