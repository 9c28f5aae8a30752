//! The draft/authoritative reconciliation state machine.
//!
//! One engine instance backs one configuration panel. It owns the draft
//! for the currently focused node and drives it through
//! `Unsynced → Synced ⇄ Dirty → Saving` under one of three persistence
//! strategies: explicit manual save, debounced live sync, or a best-effort
//! flush when the panel closes.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use trellis_config::NodeKind;

use crate::debounce::Debouncer;
use crate::draft::{Draft, Signature};
use crate::error::SyncError;
use crate::merge::merge_config;
use crate::sink::{GraphProvider, NodeUpdate, PersistenceSink, UpdateOptions};
use crate::validate::{ValidationErrors, ValidatorRegistry};

/// Delay before a dirty draft is flushed in live mode.
pub const LIVE_SYNC_DEBOUNCE: Duration = Duration::from_millis(500);

/// How long a close-time flush may stay in flight before its guard flag
/// self-clears. A sink that never resolves must not block future flushes.
pub const CLOSE_FLUSH_GRACE: Duration = Duration::from_secs(5);

/// Which persistence strategy the panel runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
  /// Persist only on an explicit, awaited save.
  Manual,
  /// Debounce-flush every dirty draft automatically.
  Live,
  /// Persist once, best-effort, when the panel is torn down.
  FlushOnClose,
}

/// Where the draft stands relative to the authoritative copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
  /// No draft exists for the current node identity.
  #[default]
  Unsynced,
  /// Draft signature equals the baseline.
  Synced,
  /// Draft differs from the baseline.
  Dirty,
  /// A persist is in flight.
  Saving,
}

/// Result of a manual save.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
  Saved,
  /// Validation blocked the save; nothing was persisted.
  Invalid(ValidationErrors),
}

#[derive(Debug, Clone)]
struct Focus {
  node_id: String,
  kind: NodeKind,
}

#[derive(Default)]
struct PanelState {
  focus: Option<Focus>,
  draft: Draft,
  baseline: Signature,
  /// Snapshot signature captured when the node gained focus, used by the
  /// close-time flush comparison.
  mount_signature: Signature,
  state: SyncState,
  errors: ValidationErrors,
  close_flush_in_flight: bool,
  /// Monotonic id of the most recently staged persist. A completion
  /// carrying an older id must not settle the panel; a newer flush owns
  /// the state now.
  flush_generation: u64,
}

impl PanelState {
  /// Drop the draft and focus. The close-flush guard survives on purpose.
  fn reset(&mut self) {
    self.focus = None;
    self.draft = Draft::default();
    self.baseline = Signature::default();
    self.mount_signature = Signature::default();
    self.state = SyncState::Unsynced;
    self.errors = ValidationErrors::new();
  }
}

/// The reconciliation engine behind one configuration panel.
///
/// The authoritative node is owned by the canvas and only ever read here,
/// through the [`GraphProvider`]; every write goes through the
/// [`PersistenceSink`].
pub struct ConfigSyncEngine<G: GraphProvider, S: PersistenceSink> {
  provider: Arc<G>,
  sink: Arc<S>,
  validators: Arc<ValidatorRegistry>,
  mode: SyncMode,
  debounce: Arc<Mutex<Debouncer>>,
  panel: Arc<Mutex<PanelState>>,
}

impl<G, S> ConfigSyncEngine<G, S>
where
  G: GraphProvider + 'static,
  S: PersistenceSink + 'static,
{
  /// Create an engine with the built-in per-kind validators.
  pub fn new(provider: G, sink: S, mode: SyncMode) -> Self {
    Self::with_validators(provider, sink, mode, ValidatorRegistry::new())
  }

  /// Create an engine with a custom validator registry.
  pub fn with_validators(
    provider: G,
    sink: S,
    mode: SyncMode,
    validators: ValidatorRegistry,
  ) -> Self {
    Self {
      provider: Arc::new(provider),
      sink: Arc::new(sink),
      validators: Arc::new(validators),
      mode,
      debounce: Arc::new(Mutex::new(Debouncer::new(LIVE_SYNC_DEBOUNCE))),
      panel: Arc::new(Mutex::new(PanelState::default())),
    }
  }

  pub fn mode(&self) -> SyncMode {
    self.mode
  }

  pub fn state(&self) -> SyncState {
    self.panel.lock().unwrap().state
  }

  pub fn focused(&self) -> Option<String> {
    let panel = self.panel.lock().unwrap();
    panel.focus.as_ref().map(|f| f.node_id.clone())
  }

  /// The current draft. Clones; callers never hold the live copy.
  pub fn draft(&self) -> Draft {
    self.panel.lock().unwrap().draft.clone()
  }

  /// Validation errors for the current draft, recomputed on every edit.
  pub fn errors(&self) -> ValidationErrors {
    self.panel.lock().unwrap().errors.clone()
  }

  /// Move focus to another node.
  ///
  /// Cancels any pending flush timer, discards the current draft
  /// unconditionally (even when dirty), and rehydrates from the new node's
  /// authoritative state. Refocusing the already focused node is a no-op.
  pub fn focus(&mut self, node_id: &str) {
    let mut panel = self.panel.lock().unwrap();
    if panel.focus.as_ref().is_some_and(|f| f.node_id == node_id) {
      return;
    }

    self.debounce.lock().unwrap().cancel();
    if panel.state == SyncState::Dirty
      && let Some(focus) = &panel.focus
    {
      warn!(node_id = %focus.node_id, "focus changed with unsaved edits, discarding dirty draft");
    }
    panel.reset();

    let Some(node) = self.provider.node(node_id) else {
      debug!(node_id = %node_id, "focused node not in graph, staying unsynced");
      return;
    };

    let draft = Draft::from_node(&node);
    let signature = draft.signature();
    panel.errors = self.validators.validate(node.kind, &draft);
    panel.focus = Some(Focus {
      node_id: node_id.to_string(),
      kind: node.kind,
    });
    panel.draft = draft;
    panel.baseline = signature;
    panel.mount_signature = signature;
    panel.state = SyncState::Synced;
  }

  /// Re-read the focused node after an external change to the graph.
  ///
  /// When the authoritative signature differs from the stored baseline the
  /// draft is overwritten wholesale; a genuinely newer external copy wins.
  pub fn authoritative_changed(&mut self) {
    let mut panel = self.panel.lock().unwrap();
    let Some(focus) = panel.focus.clone() else {
      return;
    };
    let Some(node) = self.provider.node(&focus.node_id) else {
      return;
    };

    let incoming = Draft::from_node(&node);
    let signature = incoming.signature();
    if signature == panel.baseline {
      return;
    }

    debug!(node_id = %focus.node_id, "authoritative copy changed, overwriting draft");
    self.debounce.lock().unwrap().cancel();
    panel.errors = self.validators.validate(node.kind, &incoming);
    panel.draft = incoming;
    panel.baseline = signature;
    panel.state = SyncState::Synced;
    if let Some(focus) = panel.focus.as_mut() {
      focus.kind = node.kind;
    }
  }

  /// Set one config field on the draft.
  pub fn edit_field(&mut self, key: &str, value: Value) {
    let key = key.to_string();
    self.apply_edit(move |draft| {
      draft.config.insert(key.clone(), value);
      draft.edited.insert(key);
    });
  }

  /// Remove one config field from the draft. The removal is an edit and
  /// propagates through the merge.
  pub fn remove_field(&mut self, key: &str) {
    let key = key.to_string();
    self.apply_edit(move |draft| {
      draft.config.remove(&key);
      draft.edited.insert(key);
    });
  }

  pub fn set_oauth_scope(&mut self, scope: Option<String>) {
    self.apply_edit(move |draft| draft.oauth_scope = scope);
  }

  pub fn set_input_refs(&mut self, refs: Vec<String>) {
    self.apply_edit(move |draft| draft.input_refs = refs);
  }

  pub fn set_structured_output(&mut self, enabled: bool, schema: Option<Value>) {
    self.apply_edit(move |draft| {
      draft.use_structured_output = enabled;
      draft.structured_output_schema = schema;
    });
  }

  /// Common tail of every edit: mutate, refingerprint, revalidate, and in
  /// live mode (re)start the coalescing flush timer.
  fn apply_edit(&mut self, mutate: impl FnOnce(&mut Draft)) {
    let schedule = {
      let mut panel = self.panel.lock().unwrap();
      let Some(focus) = panel.focus.clone() else {
        debug!("edit ignored, no focused node");
        return;
      };

      let was_saving = panel.state == SyncState::Saving;
      mutate(&mut panel.draft);
      let signature = panel.draft.signature();
      panel.errors = self.validators.validate(focus.kind, &panel.draft);
      panel.state = if signature == panel.baseline {
        SyncState::Synced
      } else {
        SyncState::Dirty
      };

      // An edit during an in-flight flush needs a follow-up flush even if
      // it happens to restore the pre-flush content.
      panel.state == SyncState::Dirty || was_saving
    };

    if schedule && self.mode == SyncMode::Live {
      schedule_live_flush(&self.debounce, &self.panel, &self.provider, &self.sink);
    }
  }

  /// Validate, then merge-and-persist the draft, awaited to completion.
  ///
  /// Validation errors abort before the sink is touched and are returned
  /// in the outcome, never as an `Err`. A sink failure leaves the draft
  /// dirty and is retryable.
  pub async fn save(&mut self) -> Result<SaveOutcome, SyncError> {
    let (node_id, update, flushed, generation) = {
      let mut panel = self.panel.lock().unwrap();
      let focus = panel.focus.clone().ok_or(SyncError::NoFocusedNode)?;

      let errors = self.validators.validate(focus.kind, &panel.draft);
      if !errors.is_empty() {
        debug!(node_id = %focus.node_id, "manual save blocked by validation");
        panel.errors = errors.clone();
        return Ok(SaveOutcome::Invalid(errors));
      }

      let (update, flushed, generation) = stage_update(&mut panel, self.provider.as_ref(), &focus);
      (focus.node_id, update, flushed, generation)
    };

    let result = self
      .sink
      .update(&node_id, update, UpdateOptions::durable())
      .await;

    let mut panel = self.panel.lock().unwrap();
    let current = panel.focus.as_ref().is_some_and(|f| f.node_id == node_id)
      && panel.flush_generation == generation;
    match result {
      Ok(()) => {
        if current {
          settle_after_persist(&mut panel, flushed);
        }
        Ok(SaveOutcome::Saved)
      }
      Err(source) => {
        if current {
          panel.state = SyncState::Dirty;
        }
        Err(SyncError::Persistence { node_id, source })
      }
    }
  }

  /// Tear the panel down.
  ///
  /// In flush-on-close mode, a draft that differs from the snapshot taken
  /// at mount fires one best-effort durable persist, guarded by an
  /// in-flight flag that self-clears after [`CLOSE_FLUSH_GRACE`]. Never
  /// blocks; the draft is dropped either way.
  pub fn teardown(&mut self) {
    self.debounce.lock().unwrap().cancel();
    let mut panel = self.panel.lock().unwrap();

    if self.mode == SyncMode::FlushOnClose
      && let Some(focus) = panel.focus.clone()
      && panel.draft.signature() != panel.mount_signature
    {
      if panel.close_flush_in_flight {
        debug!(node_id = %focus.node_id, "close flush already in flight, skipping");
      } else {
        panel.close_flush_in_flight = true;
        let (update, _, _) = stage_update(&mut panel, self.provider.as_ref(), &focus);
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.panel);

        tokio::spawn(async move {
          tokio::select! {
            result = sink.update(&focus.node_id, update, UpdateOptions::durable()) => {
              if let Err(error) = result {
                warn!(node_id = %focus.node_id, error = %error, "close flush failed");
              }
            }
            _ = tokio::time::sleep(CLOSE_FLUSH_GRACE) => {
              warn!(node_id = %focus.node_id, "close flush did not settle within the grace period");
            }
          }
          shared.lock().unwrap().close_flush_in_flight = false;
        });
      }
    }

    panel.reset();
  }
}

/// Merge the draft over the authoritative config and stage it for persist.
fn stage_update<G: GraphProvider>(
  panel: &mut PanelState,
  provider: &G,
  focus: &Focus,
) -> (NodeUpdate, Signature, u64) {
  let authoritative = provider
    .node(&focus.node_id)
    .map(|node| Draft::from_node(&node).config)
    .unwrap_or_default();
  panel.draft.config = merge_config(&panel.draft, &authoritative, focus.kind.merge_policy());
  let signature = panel.draft.signature();
  panel.state = SyncState::Saving;
  panel.flush_generation += 1;
  (
    NodeUpdate::from_draft(&panel.draft),
    signature,
    panel.flush_generation,
  )
}

/// Settle the panel after a successful persist of `flushed`.
fn settle_after_persist(panel: &mut PanelState, flushed: Signature) {
  panel.baseline = flushed;
  if panel.draft.signature() == flushed {
    panel.draft.edited.clear();
    panel.state = SyncState::Synced;
  } else {
    // an edit landed while the persist was in flight
    panel.state = SyncState::Dirty;
  }
}

/// (Re)start the coalescing live-sync timer.
fn schedule_live_flush<G, S>(
  debounce: &Arc<Mutex<Debouncer>>,
  panel: &Arc<Mutex<PanelState>>,
  provider: &Arc<G>,
  sink: &Arc<S>,
) where
  G: GraphProvider + 'static,
  S: PersistenceSink + 'static,
{
  let debounce_cell = Arc::clone(debounce);
  let panel = Arc::clone(panel);
  let provider = Arc::clone(provider);
  let sink = Arc::clone(sink);

  debounce.lock().unwrap().call(move || {
    // Boxed so the flush can reschedule itself without a recursive type.
    let flush: Pin<Box<dyn Future<Output = ()> + Send>> =
      Box::pin(flush_live(debounce_cell, panel, provider, sink));
    flush
  });
}

/// Flush the current draft in live mode.
///
/// Reads the draft at fire time rather than a value captured when the
/// timer was scheduled; that is what makes coalescing correct under rapid
/// edits. Sink failures are logged and swallowed so editing is never
/// interrupted; the local draft stays authoritative until a newer external
/// signature arrives.
async fn flush_live<G, S>(
  debounce: Arc<Mutex<Debouncer>>,
  panel: Arc<Mutex<PanelState>>,
  provider: Arc<G>,
  sink: Arc<S>,
) where
  G: GraphProvider + 'static,
  S: PersistenceSink + 'static,
{
  let staged = {
    let mut guard = panel.lock().unwrap();
    let Some(focus) = guard.focus.clone() else {
      return;
    };
    match guard.state {
      SyncState::Dirty => {
        let (update, flushed, generation) = stage_update(&mut guard, provider.as_ref(), &focus);
        Some((focus.node_id, update, flushed, generation))
      }
      // Another flush is in flight; try again after a full window.
      SyncState::Saving => None,
      _ => return,
    }
  };

  let Some((node_id, update, flushed, generation)) = staged else {
    schedule_live_flush(&debounce, &panel, &provider, &sink);
    return;
  };

  let result = sink.update(&node_id, update, UpdateOptions::local()).await;

  let follow_up = {
    let mut guard = panel.lock().unwrap();
    // Focus may have moved while the persist was in flight; the new node's
    // panel state is not ours to touch.
    if guard.focus.as_ref().is_none_or(|f| f.node_id != node_id) {
      return;
    }
    // A newer persist was staged while this one was in flight; flushes can
    // complete out of order and only the latest may settle the panel.
    if guard.flush_generation != generation {
      return;
    }
    match result {
      Ok(()) => {
        settle_after_persist(&mut guard, flushed);
        // A mid-flight edit leaves the state dirty here; it needs one more
        // window even when its own timer already fired and bailed out.
        guard.state == SyncState::Dirty
      }
      Err(error) => {
        warn!(node_id = %node_id, error = %error, "live sync persist failed, keeping local draft");
        guard.state = if guard.draft.signature() == guard.baseline {
          SyncState::Synced
        } else {
          SyncState::Dirty
        };
        // Failures are retried on the next edit, not in a loop.
        false
      }
    }
  };

  if follow_up {
    schedule_live_flush(&debounce, &panel, &provider, &sink);
  }
}
