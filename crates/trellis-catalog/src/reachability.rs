use std::collections::{HashMap, HashSet};

use trellis_config::Edge;

/// Collect every node reachable by following edges backward from `target`.
///
/// Builds a reverse adjacency map in one pass over the edge list, then runs
/// an iterative traversal with an explicit stack so deep or cyclic graphs
/// cannot overflow. The target itself is never part of the result, even
/// when a cycle routes back to it; self-loops and duplicate edges are
/// absorbed by the visited set. Terminates in O(E) regardless of cycles.
pub fn ancestors(target: &str, edges: &[Edge]) -> HashSet<String> {
  let mut reverse_adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
  for edge in edges {
    reverse_adjacency
      .entry(edge.target.as_str())
      .or_default()
      .push(edge.source.as_str());
  }

  let mut visited: HashSet<String> = HashSet::new();
  let mut stack: Vec<&str> = reverse_adjacency
    .get(target)
    .map(|sources| sources.clone())
    .unwrap_or_default();

  while let Some(node_id) = stack.pop() {
    if node_id == target || visited.contains(node_id) {
      continue;
    }
    visited.insert(node_id.to_string());

    if let Some(sources) = reverse_adjacency.get(node_id) {
      for &source in sources {
        if source != target && !visited.contains(source) {
          stack.push(source);
        }
      }
    }
  }

  visited
}

#[cfg(test)]
mod tests {
  use super::*;

  fn edge(from: &str, to: &str) -> Edge {
    Edge::new(from, to)
  }

  #[test]
  fn collects_transitive_ancestors() {
    let edges = vec![edge("a", "b"), edge("b", "c"), edge("x", "b")];
    let result = ancestors("c", &edges);
    assert_eq!(
      result,
      ["a", "b", "x"].iter().map(|s| s.to_string()).collect()
    );
  }

  #[test]
  fn excludes_the_target_itself() {
    let edges = vec![edge("a", "b"), edge("b", "a")];
    let result = ancestors("a", &edges);
    assert!(!result.contains("a"));
    assert!(result.contains("b"));
  }

  #[test]
  fn terminates_on_cycles() {
    let edges = vec![
      edge("a", "b"),
      edge("b", "c"),
      edge("c", "a"),
      edge("c", "d"),
    ];
    let result = ancestors("d", &edges);
    assert_eq!(
      result,
      ["a", "b", "c"].iter().map(|s| s.to_string()).collect()
    );
  }

  #[test]
  fn absorbs_self_loops_and_duplicate_edges() {
    let edges = vec![
      edge("a", "a"),
      edge("a", "b"),
      edge("a", "b"),
      edge("b", "b"),
    ];
    let result = ancestors("b", &edges);
    assert_eq!(result, ["a"].iter().map(|s| s.to_string()).collect());
  }

  #[test]
  fn no_incoming_edges_means_no_ancestors() {
    let edges = vec![edge("a", "b")];
    assert!(ancestors("a", &edges).is_empty());
    assert!(ancestors("unknown", &edges).is_empty());
  }
}
