//! Persistence layer: KV capability, key namespace, logical clocks, and the
//! append-only ledger primitive.

pub mod keys;
pub mod kv;
pub mod ledger;

pub use keys::{clock_key, event_id, ledger_key, Family, GLOBAL_SCOPE};
pub use kv::{KvStore, MemoryKv, SledKv};
pub use ledger::{LedgerEvent, Page, Store};
