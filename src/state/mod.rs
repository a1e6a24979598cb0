//! Persisted client state: pluggable key/value backends and the
//! cluster/wallet selection store built on them.

pub mod selection;
pub mod store;

pub use selection::{Selection, SelectionStore};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
