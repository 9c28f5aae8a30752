use thiserror::Error;

/// Opaque failure reported by a persistence sink.
///
/// The engine never inspects the contents; it only distinguishes success
/// from failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SinkError {
  message: String,
}

impl SinkError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum SyncError {
  #[error("no node is focused")]
  NoFocusedNode,

  #[error("persist failed for node '{node_id}': {source}")]
  Persistence {
    node_id: String,
    #[source]
    source: SinkError,
  },
}
