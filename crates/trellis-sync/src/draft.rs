use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use trellis_config::Node;
use xxhash_rust::xxh3::xxh3_64;

/// Config keys lifted out of the free-form map into typed draft fields.
pub const OAUTH_SCOPE_KEY: &str = "oauth_scope";
pub const INPUT_REFS_KEY: &str = "input_refs";
pub const USE_STRUCTURED_OUTPUT_KEY: &str = "use_structured_output";
pub const STRUCTURED_OUTPUT_SCHEMA_KEY: &str = "structured_output_schema";

/// A structural fingerprint of a draft, used for cheap equality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signature(u64);

/// The editable copy of a node's configuration.
///
/// Hydrated from the authoritative node when it gains focus; the reserved
/// config keys above are lifted into typed fields. `edited` tracks which
/// config keys the user actually touched, which is what the merge uses to
/// decide draft-wins vs authoritative-wins per key.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Draft {
  pub config: Map<String, Value>,
  pub oauth_scope: Option<String>,
  pub input_refs: Vec<String>,
  pub use_structured_output: bool,
  pub structured_output_schema: Option<Value>,
  #[serde(skip)]
  pub edited: BTreeSet<String>,
}

impl Draft {
  /// Hydrate a draft from the authoritative node.
  pub fn from_node(node: &Node) -> Self {
    let mut config = node.config.clone();

    let oauth_scope = config
      .remove(OAUTH_SCOPE_KEY)
      .and_then(|v| v.as_str().map(str::to_string));
    let input_refs = config
      .remove(INPUT_REFS_KEY)
      .and_then(|v| {
        v.as_array().map(|refs| {
          refs
            .iter()
            .filter_map(|r| r.as_str().map(str::to_string))
            .collect()
        })
      })
      .unwrap_or_default();
    let use_structured_output = config
      .remove(USE_STRUCTURED_OUTPUT_KEY)
      .and_then(|v| v.as_bool())
      .unwrap_or(false);
    let structured_output_schema = config.remove(STRUCTURED_OUTPUT_SCHEMA_KEY);

    Self {
      config,
      oauth_scope,
      input_refs,
      use_structured_output,
      structured_output_schema,
      edited: BTreeSet::new(),
    }
  }

  /// Fingerprint the draft's content.
  ///
  /// serde_json object maps are sorted, so the serialized form is canonical
  /// and structurally equal drafts hash equal.
  pub fn signature(&self) -> Signature {
    let bytes = serde_json::to_vec(self).unwrap_or_default();
    Signature(xxh3_64(&bytes))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use trellis_config::NodeKind;

  use super::*;

  fn node_with_config(config: serde_json::Value) -> Node {
    Node {
      node_id: "n1".to_string(),
      kind: NodeKind::Agent,
      label: None,
      config: config.as_object().cloned().unwrap_or_default(),
      output_shape: None,
    }
  }

  #[test]
  fn reserved_keys_are_lifted_out_of_config() {
    let node = node_with_config(json!({
      "model": "small",
      "oauth_scope": "drive.readonly",
      "input_refs": ["a", "b"],
      "use_structured_output": true,
      "structured_output_schema": { "type": "object" }
    }));
    let draft = Draft::from_node(&node);

    assert_eq!(draft.config.len(), 1);
    assert_eq!(draft.config["model"], json!("small"));
    assert_eq!(draft.oauth_scope.as_deref(), Some("drive.readonly"));
    assert_eq!(draft.input_refs, vec!["a", "b"]);
    assert!(draft.use_structured_output);
    assert!(draft.structured_output_schema.is_some());
    assert!(draft.edited.is_empty());
  }

  #[test]
  fn equal_content_means_equal_signature() {
    let node = node_with_config(json!({ "model": "small", "temperature": 0.2 }));
    let a = Draft::from_node(&node);
    let mut b = Draft::from_node(&node);
    b.edited.insert("model".to_string());

    // edit tracking does not participate in the fingerprint
    assert_eq!(a.signature(), b.signature());
  }

  #[test]
  fn changed_content_changes_the_signature() {
    let node = node_with_config(json!({ "model": "small" }));
    let a = Draft::from_node(&node);
    let mut b = a.clone();
    b.config.insert("model".to_string(), json!("large"));
    assert_ne!(a.signature(), b.signature());

    let mut c = a.clone();
    c.oauth_scope = Some("mail.send".to_string());
    assert_ne!(a.signature(), c.signature());
  }
}
