use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;
use trellis_config::{Node, NodeKind, Workflow};

use crate::alias::resolve_alias;
use crate::reachability::ancestors;

/// Reserved root for variables produced by entry-point nodes.
pub const INPUTS_TOKEN: &str = "inputs";

/// Compute the valid template-variable suggestions for a focused node.
///
/// Walks the graph upstream from `target`, derives an alias per ancestor,
/// and expands each ancestor's output shape into dotted/bracketed paths.
/// The result is deduplicated and lexicographically sorted.
///
/// This never fails on missing graph data: an unknown target yields an
/// empty list, and an ancestor with an absent or malformed shape simply
/// contributes no property paths.
pub fn variable_suggestions(workflow: &Workflow, target: &str) -> Vec<String> {
  if workflow.get_node(target).is_none() {
    debug!(node_id = %target, "focused node not in snapshot, no suggestions");
    return Vec::new();
  }

  let mut suggestions: BTreeSet<String> = BTreeSet::new();

  for ancestor_id in ancestors(target, &workflow.edges) {
    let Some(node) = workflow.get_node(&ancestor_id) else {
      debug!(node_id = %ancestor_id, "edge references unknown ancestor, skipping");
      continue;
    };

    match node.kind {
      NodeKind::Input => {
        suggestions.insert(INPUTS_TOKEN.to_string());
        for field in input_field_names(node) {
          suggestions.insert(format!("{}.{}", INPUTS_TOKEN, field));
        }
      }
      _ => {
        let alias = resolve_alias(node);
        if alias.is_empty() {
          continue;
        }
        suggestions.insert(alias.clone());
        if let Some(shape) = &node.output_shape {
          collect_shape_paths(&alias, shape, &mut suggestions);
        }
      }
    }
  }

  suggestions.into_iter().collect()
}

/// Field names an entry-point node declares in its config.
///
/// Accepts a singular `field_name` and/or a `fields` array whose entries
/// are either descriptor objects with a `name` or bare strings.
fn input_field_names(node: &Node) -> BTreeSet<String> {
  let mut names = BTreeSet::new();

  if let Some(name) = node.config.get("field_name").and_then(|v| v.as_str())
    && !name.is_empty()
  {
    names.insert(name.to_string());
  }

  if let Some(fields) = node.config.get("fields").and_then(|v| v.as_array()) {
    for field in fields {
      let name = match field {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => obj.get("name").and_then(|v| v.as_str()),
        _ => None,
      };
      if let Some(name) = name
        && !name.is_empty()
      {
        names.insert(name.to_string());
      }
    }
  }

  names
}

/// Expand a JSON-Schema-like output shape into suggestion paths.
///
/// Object schemas emit `prefix.prop` per property and recurse; array
/// schemas emit `prefix[0]` and recurse into the item schema. Anything
/// else is a leaf. Shapes that are not object-like contribute nothing.
fn collect_shape_paths(prefix: &str, shape: &Value, out: &mut BTreeSet<String>) {
  let Some(shape) = shape.as_object() else {
    return;
  };

  // Tolerate shapes that omit an explicit "type" but carry the
  // structural keys anyway.
  let shape_type = shape
    .get("type")
    .and_then(|t| t.as_str())
    .or_else(|| shape.contains_key("properties").then_some("object"))
    .or_else(|| shape.contains_key("items").then_some("array"));

  match shape_type {
    Some("object") => {
      if let Some(properties) = shape.get("properties").and_then(|p| p.as_object()) {
        for (name, sub) in properties {
          let path = format!("{}.{}", prefix, name);
          out.insert(path.clone());
          collect_shape_paths(&path, sub, out);
        }
      }
    }
    Some("array") => {
      let path = format!("{}[0]", prefix);
      out.insert(path.clone());
      if let Some(items) = shape.get("items") {
        collect_shape_paths(&path, items, out);
      }
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use serde_json::json;
  use trellis_config::Edge;

  use super::*;

  fn make_node(node_id: &str, kind: NodeKind, config: serde_json::Value) -> Node {
    Node {
      node_id: node_id.to_string(),
      kind,
      label: None,
      config: config.as_object().cloned().unwrap_or_default(),
      output_shape: None,
    }
  }

  fn make_workflow(nodes: Vec<Node>, edges: Vec<Edge>) -> Workflow {
    Workflow {
      workflow_id: "wf-1".to_string(),
      name: "test".to_string(),
      nodes: nodes
        .into_iter()
        .map(|n| (n.node_id.clone(), n))
        .collect::<HashMap<_, _>>(),
      edges,
    }
  }

  #[test]
  fn expands_object_and_array_shapes() {
    let mut fetch = make_node("fetch_users", NodeKind::Http, json!({}));
    fetch.output_shape = Some(json!({
      "type": "object",
      "properties": {
        "email": { "type": "string" },
        "items": {
          "type": "array",
          "items": {
            "type": "object",
            "properties": { "id": { "type": "string" } }
          }
        }
      }
    }));
    let target = make_node("send", NodeKind::Http, json!({}));
    let workflow = make_workflow(vec![fetch, target], vec![Edge::new("fetch_users", "send")]);

    assert_eq!(
      variable_suggestions(&workflow, "send"),
      vec![
        "fetch_users",
        "fetch_users.email",
        "fetch_users.items",
        "fetch_users.items[0]",
        "fetch_users.items[0].id",
      ]
    );
  }

  #[test]
  fn input_ancestors_use_the_reserved_token() {
    let input = make_node(
      "start",
      NodeKind::Input,
      json!({
        "field_name": "query",
        "fields": [ { "name": "user_id" }, "query", { "type": "string" } ]
      }),
    );
    let target = make_node("agent", NodeKind::Agent, json!({}));
    let workflow = make_workflow(vec![input, target], vec![Edge::new("start", "agent")]);

    assert_eq!(
      variable_suggestions(&workflow, "agent"),
      vec!["inputs", "inputs.query", "inputs.user_id"]
    );
  }

  #[test]
  fn unknown_target_yields_empty_list() {
    let workflow = make_workflow(vec![], vec![Edge::new("a", "b")]);
    assert!(variable_suggestions(&workflow, "b").is_empty());
  }

  #[test]
  fn non_ancestors_do_not_leak_in() {
    let upstream = make_node("up", NodeKind::Code, json!({}));
    let sibling = make_node("side", NodeKind::Code, json!({}));
    let target = make_node("t", NodeKind::Http, json!({}));
    let downstream = make_node("down", NodeKind::Http, json!({}));
    let workflow = make_workflow(
      vec![upstream, sibling, target, downstream],
      vec![Edge::new("up", "t"), Edge::new("t", "down"), Edge::new("up", "side")],
    );

    assert_eq!(variable_suggestions(&workflow, "t"), vec!["up"]);
  }

  #[test]
  fn malformed_shape_degrades_to_alias_only() {
    let mut bad = make_node("bad_shape", NodeKind::Http, json!({}));
    bad.output_shape = Some(json!("not a schema"));
    let target = make_node("t", NodeKind::Http, json!({}));
    let workflow = make_workflow(vec![bad, target], vec![Edge::new("bad_shape", "t")]);

    assert_eq!(variable_suggestions(&workflow, "t"), vec!["bad_shape"]);
  }

  #[test]
  fn edges_to_missing_nodes_are_skipped() {
    let target = make_node("t", NodeKind::Http, json!({}));
    let workflow = make_workflow(vec![target], vec![Edge::new("ghost", "t")]);
    assert!(variable_suggestions(&workflow, "t").is_empty());
  }

  #[test]
  fn suggestions_survive_cycles() {
    let mut a = make_node("a", NodeKind::Code, json!({}));
    a.output_shape = Some(json!({
      "type": "object",
      "properties": { "out": { "type": "string" } }
    }));
    let b = make_node("b", NodeKind::Code, json!({}));
    let workflow = make_workflow(
      vec![a, b],
      vec![Edge::new("a", "b"), Edge::new("b", "a")],
    );

    assert_eq!(variable_suggestions(&workflow, "b"), vec!["a", "a.out"]);
  }
}
