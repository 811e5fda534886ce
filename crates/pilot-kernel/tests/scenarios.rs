//! End-to-end pipeline scenarios against an in-memory store.
//!
//! Each test drives the public `Kernel` surface the way a host would:
//! configure ledgers, run pipeline steps, assert outcomes and the evidence
//! they leave behind.
//!
//! Run with:
//!   cargo test -p pilot-kernel --test scenarios

use pilot_core::{
    ActionKind, ActionSpec, EvidenceStatus, Mode, OutcomeKind, Payload, PolicyContext, RiskLevel,
};
use pilot_guards::capacity::{self, CapacityEvent};
use pilot_guards::consent::ConsentStatus;
use pilot_guards::cooling::CoolingEvent;
use pilot_guards::opportunity::{self, OpportunityRequest};
use pilot_guards::reachability::LeadContact;
use pilot_guards::retry;
use pilot_kernel::{
    Kernel, LockRequest, MockRunner, PipelineInput, RetryProbe, RunnerResult, StaticRunner,
};
use pilot_store::Family;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn mock_ctx() -> PolicyContext {
    PolicyContext::new(Mode::Mock, 1)
}

fn task(description: &str) -> ActionSpec {
    ActionSpec::new(
        description,
        "i1",
        "pipeline_velocity",
        RiskLevel::Low,
        false,
        Payload::Task { title: Some(description.into()), assignee: None, extra: serde_json::Map::new() },
    )
}

fn email(description: &str, to: &str) -> ActionSpec {
    ActionSpec::new(
        description,
        "i1",
        "reply_rate",
        RiskLevel::Low,
        false,
        Payload::outreach(ActionKind::Email, to, "hello"),
    )
}

fn input_for(action: ActionSpec, ctx: PolicyContext) -> PipelineInput {
    let mut input = PipelineInput::new(action, ctx, 1_785_542_400);
    input.user_id = Some("1".to_string());
    input
}

// ── Scenario 1: OFFLINE email is blocked ──────────────────────────────────────

#[test]
fn offline_email_is_blocked() {
    let kernel = Kernel::in_memory();
    let before = kernel.revenue_page("u:1", 100, None).items.len();

    let input = input_for(email("welcome", "a@b.com"), PolicyContext::new(Mode::Offline, 1));
    let output = kernel.run_step(input, &MockRunner).expect("step");

    assert_eq!(output.outcome.kind(), OutcomeKind::Halted);
    assert!(output.outcome.summary().contains("FAIL_POLICY_CONFLICT"));
    assert!(output.outcome.summary().contains("OFFLINE_BLOCKED"));
    let after = kernel.revenue_page("u:1", 100, None).items.len();
    assert_eq!(after, before + 1, "every decision lands on the revenue ledger");
}

// ── Scenario 2: MOCK execution succeeds ───────────────────────────────────────

#[test]
fn mock_task_executes_with_mock_evidence() {
    let kernel = Kernel::in_memory();
    let mut input = input_for(task("call the lead"), mock_ctx());
    input.retry = Some(RetryProbe { key: "task:call".to_string(), steps_waited: 0 });

    let output = kernel.run_step(input, &MockRunner).expect("step");

    assert_eq!(output.outcome.kind(), OutcomeKind::Executed);
    assert_eq!(output.proof.evidence.status, EvidenceStatus::Mock);
    assert!(output.warnings.is_empty(), "steady state emits no persistence warnings");

    let state = retry::load(kernel.store(), "task:call");
    assert_eq!(state.attempts, 1);
    assert_eq!(state.failures, 0);
}

// ── Scenario 3: capacity exceeded defers ──────────────────────────────────────

#[test]
fn capacity_exceeded_defers_and_cools() {
    let kernel = Kernel::in_memory();
    kernel.configure_capacity("pod-1", 1, 1);
    capacity::load_inc(kernel.store(), "pod-1");

    let mut input = input_for(task("follow up"), mock_ctx());
    input.pod_id = Some("pod-1".to_string());
    let output = kernel.run_step(input, &MockRunner).expect("step");

    assert_eq!(output.outcome.kind(), OutcomeKind::Deferred);
    assert!(output.outcome.summary().contains("FAIL_CAPACITY_EXCEEDED"));

    let capacity_events: Vec<CapacityEvent> =
        kernel.store().read_events(Family::Capacity, "pod-1");
    assert!(
        capacity_events.iter().any(|e| matches!(e, CapacityEvent::Defer { .. })),
        "a defer event is appended to the capacity ledger"
    );
    let cooling_events: Vec<CoolingEvent> = kernel.store().read_events(Family::Cooling, "pod-1");
    assert!(
        cooling_events.iter().any(|e| matches!(e, CoolingEvent::Deferral { .. })),
        "a deferral event is appended to the cooling ledger"
    );
}

// ── Scenario 4: opportunity queue ordering ────────────────────────────────────

#[test]
fn opportunity_queue_enforces_fifo_order() {
    let kernel = Kernel::in_memory();
    let pod = "pod-1";

    for id in ["o1", "o2"] {
        let mut input = input_for(task("work opportunity"), mock_ctx());
        input.pod_id = Some(pod.to_string());
        input.opportunity = Some(OpportunityRequest {
            id: Some(id.to_string()),
            is_new: true,
            ..Default::default()
        });
        let output = kernel.run_step(input, &MockRunner).expect("step");
        assert_eq!(output.outcome.kind(), OutcomeKind::Deferred);
        assert!(output.outcome.summary().contains("QUEUED"));
    }

    // o2 is behind o1: out of order.
    let mut input = input_for(task("work opportunity"), mock_ctx());
    input.pod_id = Some(pod.to_string());
    input.opportunity = Some(OpportunityRequest {
        id: Some("o2".to_string()),
        is_new: false,
        cooldown_satisfied: true,
        ..Default::default()
    });
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Deferred);
    assert!(output.outcome.summary().contains("OUT_OF_ORDER"));

    // o1 at the front with cooldown satisfied executes and resolves.
    let mut input = input_for(task("work opportunity"), mock_ctx());
    input.pod_id = Some(pod.to_string());
    input.opportunity = Some(OpportunityRequest {
        id: Some("o1".to_string()),
        is_new: false,
        cooldown_satisfied: true,
        ..Default::default()
    });
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Executed);

    let queue = opportunity::queue(kernel.store(), pod);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].opportunity_id, "o2", "o2 moves to the front");
}

// ── Scenario 5: soft-lock contention ──────────────────────────────────────────

#[test]
fn soft_lock_contention_halts_the_second_pod() {
    let kernel = Kernel::in_memory();

    let mut input = input_for(task("claim the lead"), mock_ctx());
    input.pod_id = Some("pod-a".to_string());
    input.lock = Some(LockRequest { resource_id: "lead-2".to_string(), auto_release: false });
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Executed);

    // auto_release=false keeps the lock held after execution.
    let mut input = input_for(task("steal the lead"), mock_ctx());
    input.pod_id = Some("pod-b".to_string());
    input.lock = Some(LockRequest { resource_id: "lead-2".to_string(), auto_release: true });
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Halted);
    assert!(output.outcome.summary().contains("FAIL_POLICY_CONFLICT"));
    assert!(output.outcome.summary().contains("pod-a"), "the holder is cited");

    // Released by the holder, pod-b can proceed.
    kernel.release_lock("lead-2", "pod-a");
    let mut input = input_for(task("work the lead"), mock_ctx());
    input.pod_id = Some("pod-b".to_string());
    input.lock = Some(LockRequest { resource_id: "lead-2".to_string(), auto_release: true });
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Executed);
}

// ── Scenario 6: chain depth cap ───────────────────────────────────────────────

#[test]
fn chain_depth_caps_and_resets() {
    let kernel = Kernel::in_memory();

    let run = |description: &str| {
        let mut input = input_for(task(description), mock_ctx());
        input.thread_id = Some("t1".to_string());
        input.chain_max_depth = 2;
        kernel.run_step(input, &MockRunner).expect("step").outcome
    };

    assert_eq!(run("first").kind(), OutcomeKind::Executed);
    assert_eq!(run("second").kind(), OutcomeKind::Executed);
    let third = run("third");
    assert_eq!(third.kind(), OutcomeKind::Halted);
    assert!(third.summary().contains("FAIL_SAFE_OVERLOAD"));

    kernel.reset_chain("t1");
    assert_eq!(run("fresh start").kind(), OutcomeKind::Executed);
}

// ── LIVE safety ───────────────────────────────────────────────────────────────

#[test]
fn live_outbound_without_response_id_is_safe_held() {
    let kernel = Kernel::in_memory();
    kernel.apply_consent("u:1", ConsentStatus::Granted, Some("web-form".to_string()));

    let live = PolicyContext::new(Mode::Live, 2);
    let contact = LeadContact { phones: vec![], email: Some("a@b.com".to_string()) };

    let mut input = input_for(email("welcome", "a@b.com"), live);
    input.contact = Some(contact.clone());
    let runner = StaticRunner { result: RunnerResult::executed("sendgrid", None) };
    let output = kernel.run_step(input, &runner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Halted);
    assert!(output.outcome.summary().contains("FAIL_SAFE_HOLD"));
    assert_eq!(output.proof.evidence.status, EvidenceStatus::SafeHold);

    // With a provider acknowledgement the same step executes.
    let mut input = input_for(email("welcome", "a@b.com"), live);
    input.contact = Some(contact);
    let runner = StaticRunner {
        result: RunnerResult::executed("sendgrid", Some("msg-1".to_string())),
    };
    let output = kernel.run_step(input, &runner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Executed);
    assert_eq!(output.proof.evidence.status, EvidenceStatus::Ok);
    assert_eq!(output.proof.evidence.response_id.as_deref(), Some("msg-1"));
}

// ── Compliance: opt-out is terminal ───────────────────────────────────────────

#[test]
fn opted_out_lead_cannot_be_reached() {
    let kernel = Kernel::in_memory();
    kernel.apply_consent("u:1", ConsentStatus::Granted, Some("web-form".to_string()));
    let receipt = kernel.apply_opt_out("u:1", Some("unsubscribe-link".to_string()));
    assert!(!receipt.blocked);

    let mut input = input_for(email("win back", "a@b.com"), mock_ctx());
    input.contact = Some(LeadContact { phones: vec![], email: Some("a@b.com".to_string()) });
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Halted);
    assert!(output.outcome.summary().contains("DO_NOT_CONTACT"));

    let repeat = kernel.apply_opt_out("u:1", None);
    assert!(repeat.blocked);
    assert_eq!(repeat.reason, Some("OPT_OUT_ALREADY_SET"));
}

// ── Guard precedence ──────────────────────────────────────────────────────────

#[test]
fn earliest_failing_guard_wins() {
    let kernel = Kernel::in_memory();
    // Saturate the chain and the capacity for this pod.
    kernel.configure_capacity("pod-1", 0, 1);
    let mut setup = input_for(task("seed"), mock_ctx());
    setup.pod_id = Some("pod-1".to_string());
    setup.thread_id = Some("t1".to_string());
    setup.chain_max_depth = 1;
    // Fails on capacity (guard 12) but records the chain attempt (guard 3).
    let output = kernel.run_step(setup, &MockRunner).expect("step");
    assert!(output.outcome.summary().contains("FAIL_CAPACITY_EXCEEDED"));

    // Now policy, chain, and capacity would all fail: policy is cited.
    let mut input = input_for(email("welcome", "a@b.com"), PolicyContext::new(Mode::Offline, 1));
    input.pod_id = Some("pod-1".to_string());
    input.thread_id = Some("t1".to_string());
    input.chain_max_depth = 1;
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert!(output.outcome.summary().contains("FAIL_POLICY_CONFLICT"));

    // Chain (guard 3) outranks capacity (guard 12).
    let mut input = input_for(task("again"), mock_ctx());
    input.pod_id = Some("pod-1".to_string());
    input.thread_id = Some("t1".to_string());
    input.chain_max_depth = 1;
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert!(output.outcome.summary().contains("FAIL_SAFE_OVERLOAD"));
}

// ── Energy consumption ────────────────────────────────────────────────────────

#[test]
fn irreversible_actions_consume_energy_units() {
    let kernel = Kernel::in_memory();

    let spec = ActionSpec::new(
        "archive the account",
        "i1",
        "cleanup",
        RiskLevel::Low,
        true,
        Payload::Task { title: None, assignee: None, extra: serde_json::Map::new() },
    );
    let mut input = input_for(spec, mock_ctx());
    input.pod_id = Some("pod-1".to_string());
    input.cooldown_satisfied = true;
    input.confirmed = true;
    let output = kernel.run_step(input, &MockRunner).expect("step");
    assert_eq!(output.outcome.kind(), OutcomeKind::Executed);

    let state = pilot_guards::energy::state(
        kernel.store(),
        &pilot_guards::energy::day_id(1_785_542_400),
        "pod-1",
        "human:default",
        "none",
    );
    assert_eq!(state.pod_used, 1, "one unit per executed irreversible action");

    // Reversible actions leave the energy ledger untouched.
    let mut input = input_for(task("log a note"), mock_ctx());
    input.pod_id = Some("pod-1".to_string());
    kernel.run_step(input, &MockRunner).expect("step");
    let after = pilot_guards::energy::state(
        kernel.store(),
        &pilot_guards::energy::day_id(1_785_542_400),
        "pod-1",
        "human:default",
        "none",
    );
    assert_eq!(after.day_used, 1);
}
