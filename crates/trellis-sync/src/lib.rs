//! Trellis Sync
//!
//! Keeps a locally edited draft of a node's configuration reconciled with
//! the externally owned authoritative copy. Supports three persistence
//! strategies: explicit manual save, continuous debounced live sync, and a
//! best-effort flush when the panel closes.
//!
//! The engine never mutates the authoritative node directly; it reads
//! snapshots through [`GraphProvider`] and persists through
//! [`PersistenceSink`], which it treats purely as resolve/reject.

mod debounce;
mod draft;
mod engine;
mod error;
mod merge;
mod sink;
mod validate;

pub use debounce::Debouncer;
pub use draft::{
  Draft, INPUT_REFS_KEY, OAUTH_SCOPE_KEY, STRUCTURED_OUTPUT_SCHEMA_KEY, Signature,
  USE_STRUCTURED_OUTPUT_KEY,
};
pub use engine::{
  CLOSE_FLUSH_GRACE, ConfigSyncEngine, LIVE_SYNC_DEBOUNCE, SaveOutcome, SyncMode, SyncState,
};
pub use error::{SinkError, SyncError};
pub use merge::merge_config;
pub use sink::{GraphProvider, NodeUpdate, PersistenceSink, UpdateOptions};
pub use validate::{ValidationErrors, ValidatorFn, ValidatorRegistry};
