//! ─── Revenue Kernel Constants ───────────────────────────────────────────────
//!
//! Compile-time defaults and the constitution term lists. Per-call config
//! structs override the numeric defaults; the constitution is fixed.

// ── Intent fallback ──────────────────────────────────────────────────────────

/// Substituted for an empty intent id in MOCK mode.
pub const MOCK_DEFAULT_INTENT: &str = "intent:default";

/// Substituted for an empty intent id outside MOCK; policy then denies it.
pub const MISSING_INTENT_PLACEHOLDER: &str = "intent:missing";

// ── Confirmation ─────────────────────────────────────────────────────────────

/// Cooldown recorded on outcomes that require confirmation (high risk or
/// irreversible). Informational: the kernel has no timers.
pub const CONFIRM_COOLDOWN_SECS: i64 = 30;

// ── Chain / fail-safe ────────────────────────────────────────────────────────

/// Attempts allowed on one thread since the last reset.
pub const DEFAULT_CHAIN_MAX_DEPTH: u32 = 5;

// ── Capacity ─────────────────────────────────────────────────────────────────

/// Concurrent actions a pod carries before deferring, absent a configure event.
pub const DEFAULT_MAX_CONCURRENT_ACTIONS: u32 = 3;

pub const DEFAULT_RECOVERY_RATE: u32 = 1;

// ── Cooling windows ──────────────────────────────────────────────────────────

pub const DEFAULT_WINDOW_MAX_NEW: u32 = 10;

/// Deferrals in a window before the pod enters cooling.
pub const DEFAULT_DEFERRAL_THRESHOLD: u32 = 3;

/// Deferrals in a window before the pod enters repair.
pub const DEFAULT_REPAIR_THRESHOLD: u32 = 6;

// ── Opportunity queue ────────────────────────────────────────────────────────

pub const DEFAULT_QUEUE_MAX_SIZE: usize = 25;

// ── Retry decay ──────────────────────────────────────────────────────────────

/// Base cooldown steps once a key has at least one failure; each further
/// failure adds one step. Never shrinks.
pub const RETRY_BASE_COOLDOWN_STEPS: u32 = 1;

// ── Capacity energy ──────────────────────────────────────────────────────────

pub const DEFAULT_POD_ENERGY_LIMIT: u32 = 10;
pub const DEFAULT_HUMAN_ENERGY_LIMIT: u32 = 5;
pub const DEFAULT_CHANNEL_ENERGY_LIMIT: u32 = 8;
pub const DEFAULT_DAY_ENERGY_LIMIT: u32 = 20;

/// Units one irreversible action consumes. Reversible actions consume zero.
pub const ENERGY_MIN_UNITS: u32 = 1;

// ── Constitution ─────────────────────────────────────────────────────────────

/// Optimization techniques no action description may invoke. Matched
/// case-insensitively as substrings of the lowercased description.
pub const FORBIDDEN_OPTIMIZATION_TERMS: &[&str] = &[
    "dark pattern",
    "urgency hack",
    "engagement bait",
    "fomo loop",
    "clickbait",
    "pressure sequence",
    "false scarcity",
];

/// Sensitive-data categories that must never be optimization levers.
pub const SENSITIVE_OPTIMIZATION_TARGETS: &[&str] =
    &["grief", "fear", "health", "debt", "minors", "addiction"];
