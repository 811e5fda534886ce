//! The ledger primitive: append-only JSON arrays with per-family clocks.
//!
//! [`Store`] is the single persistence owner, handed an injected [`KvStore`]
//! capability. Persistence failures never fail the caller: the in-memory
//! result of each call stays authoritative and the failure is absorbed into a
//! [`PersistenceWarning`] drained through [`Store::drain_warnings`]. Reads are
//! permissive — corrupt arrays read as empty, and elements with unknown
//! discriminators are skipped rather than failing the fold.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use pilot_core::{PersistenceWarning, Stamp};

use crate::keys::{clock_key, ledger_key, Family};
use crate::kv::{KvStore, MemoryKv};

/// An event that can be addressed by a cursor.
pub trait LedgerEvent {
    fn event_id(&self) -> &str;
}

/// One page of a paged read, with the cursor to continue from (forward reads)
/// or the cursor to page further back (tail reads). `None` means exhausted.
#[derive(Clone, Debug)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub next_cursor: Option<String>,
}

/// Ledger store over an injected KV capability.
pub struct Store {
    kv: Arc<dyn KvStore>,
    warnings: Mutex<Vec<PersistenceWarning>>,
}

impl Store {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv, warnings: Mutex::new(Vec::new()) }
    }

    /// In-memory store, the default for tests and MOCK hosts.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryKv::new()))
    }

    fn warn(&self, key: &str, cause: impl ToString) {
        let cause = cause.to_string();
        warn!(key, %cause, "persistence failure absorbed");
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(PersistenceWarning { key: key.to_string(), cause });
        }
    }

    /// Take and clear the warnings accumulated since the last drain.
    pub fn drain_warnings(&self) -> Vec<PersistenceWarning> {
        match self.warnings.lock() {
            Ok(mut warnings) => std::mem::take(&mut *warnings),
            Err(_) => Vec::new(),
        }
    }

    // ── Logical clocks ───────────────────────────────────────────────────────

    /// Allocate the next stamp for `family`/`scope`: `"<prefix><n>"`.
    /// A missing or unparsable counter restarts at 1.
    pub fn next_stamp(&self, family: Family, scope: &str) -> Stamp {
        let key = clock_key(family, scope);
        let current = match self.kv.get(&key) {
            Ok(Some(raw)) => raw.trim().parse::<u64>().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                self.warn(&key, e);
                0
            }
        };
        let next = current + 1;
        if let Err(e) = self.kv.set(&key, &next.to_string()) {
            self.warn(&key, e);
        }
        format!("{}{}", family.clock_prefix(), next)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Raw event array for a scope. Corruption reads as empty; never fails.
    pub fn read_raw(&self, family: Family, scope: &str) -> Vec<Value> {
        let key = ledger_key(family, scope);
        match self.kv.get(&key) {
            Ok(Some(text)) => serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(e) => {
                self.warn(&key, e);
                Vec::new()
            }
        }
    }

    /// Typed events for a scope. Elements that fail to decode (unknown
    /// discriminator, schema drift) are skipped, not errors.
    pub fn read_events<E: DeserializeOwned>(&self, family: Family, scope: &str) -> Vec<E> {
        self.read_raw(family, scope)
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    pub fn read_page<E>(
        &self,
        family: Family,
        scope: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Page<E>
    where
        E: DeserializeOwned + LedgerEvent,
    {
        let all = self.read_events::<E>(family, scope);
        let start = match cursor {
            Some(c) => all
                .iter()
                .position(|e| e.event_id() == c)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };
        let mut rest = all.into_iter().skip(start);
        let items: Vec<E> = rest.by_ref().take(limit).collect();
        let next_cursor = if rest.next().is_some() {
            items.last().map(|e| e.event_id().to_string())
        } else {
            None
        };
        Page { items, next_cursor }
    }

    /// The newest `limit` events strictly before `cursor` (or the end).
    pub fn read_tail<E>(
        &self,
        family: Family,
        scope: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Page<E>
    where
        E: DeserializeOwned + LedgerEvent,
    {
        let all = self.read_events::<E>(family, scope);
        let end = match cursor {
            Some(c) => all.iter().position(|e| e.event_id() == c).unwrap_or(all.len()),
            None => all.len(),
        };
        let start = end.saturating_sub(limit);
        let items: Vec<E> = all
            .into_iter()
            .skip(start)
            .take(end - start)
            .collect();
        let next_cursor = if start > 0 {
            items.first().map(|e| e.event_id().to_string())
        } else {
            None
        };
        Page { items, next_cursor }
    }

    // ── Appends ──────────────────────────────────────────────────────────────

    /// Append one event to a scope's array. Persistence failures are absorbed;
    /// the caller's in-memory view of the event remains authoritative.
    pub fn append_event<E: Serialize>(&self, family: Family, scope: &str, event: &E) {
        let key = ledger_key(family, scope);
        let mut items = self.read_raw(family, scope);
        match serde_json::to_value(event) {
            Ok(v) => items.push(v),
            Err(e) => {
                self.warn(&key, e);
                return;
            }
        }
        match serde_json::to_string(&Value::Array(items)) {
            Ok(text) => {
                if let Err(e) = self.kv.set(&key, &text) {
                    self.warn(&key, e);
                }
            }
            Err(e) => self.warn(&key, e),
        }
    }
}
