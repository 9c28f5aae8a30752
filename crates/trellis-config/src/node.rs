use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node as the configuration panel sees it.
///
/// `config` is free-form per kind; `output_shape` is a JSON-Schema-like
/// descriptor of the data the node produces at runtime. Entry-point
/// (`Input`) nodes declare their fields inside `config` instead of carrying
/// an `output_shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub node_id: String,
  pub kind: NodeKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(default)]
  pub config: Map<String, Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output_shape: Option<Value>,
}

/// The closed set of node kinds the panel can edit.
///
/// Each kind carries an associated merge policy; validators are dispatched
/// per kind in `trellis-sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
  /// Workflow entry point. Its declared fields feed the `inputs` namespace.
  Input,
  /// LLM agent step with an editable tool collection.
  Agent,
  /// Outbound HTTP request step.
  Http,
  /// User-authored code step.
  Code,
  /// Terminal node that surfaces workflow results.
  Output,
}

/// How a draft config merges over the authoritative copy for a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergePolicy {
  /// A field that, when present in the draft even as an empty collection,
  /// replaces the authoritative copy wholesale. An intentionally emptied
  /// collection is distinct from an absent one.
  pub collection_field: Option<&'static str>,
}

impl NodeKind {
  pub fn merge_policy(&self) -> MergePolicy {
    match self {
      NodeKind::Agent => MergePolicy {
        collection_field: Some("tools"),
      },
      _ => MergePolicy::default(),
    }
  }
}
