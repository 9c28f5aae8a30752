use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use trellis_config::Node;

use crate::draft::Draft;
use crate::error::SinkError;

/// Read-only access to the authoritative graph state.
///
/// The canvas owns the graph; the sync engine only ever looks the focused
/// node up to hydrate drafts and compute merges.
pub trait GraphProvider: Send + Sync {
  fn node(&self, node_id: &str) -> Option<Node>;
}

/// The partial update handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeUpdate {
  pub config: Map<String, Value>,
  pub oauth_scope: Option<String>,
  pub input_refs: Vec<String>,
  pub use_structured_output: bool,
  pub structured_output_schema: Option<Value>,
}

impl NodeUpdate {
  pub(crate) fn from_draft(draft: &Draft) -> Self {
    Self {
      config: draft.config.clone(),
      oauth_scope: draft.oauth_scope.clone(),
      input_refs: draft.input_refs.clone(),
      use_structured_output: draft.use_structured_output,
      structured_output_schema: draft.structured_output_schema.clone(),
    }
  }
}

/// How an update should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOptions {
  /// Durable/persisted write vs a lighter local-only write.
  pub durable: bool,
}

impl UpdateOptions {
  pub fn durable() -> Self {
    Self { durable: true }
  }

  pub fn local() -> Self {
    Self { durable: false }
  }
}

/// The single asynchronous persistence operation the engine depends on.
///
/// The engine treats the sink purely as resolve/reject and never inspects
/// what it does internally.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
  async fn update(
    &self,
    node_id: &str,
    update: NodeUpdate,
    options: UpdateOptions,
  ) -> Result<(), SinkError>;
}
