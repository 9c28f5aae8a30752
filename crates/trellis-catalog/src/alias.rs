use trellis_config::Node;

/// Config fields consulted when a node has no usable label.
const NAME_FIELDS: [&str; 2] = ["tool_name", "variable_name"];

/// Reduce a free-form candidate to an identifier-shaped alias.
///
/// Trims, lowercases, collapses every run of characters outside `[a-z0-9]`
/// to a single underscore, strips leading/trailing underscores, and
/// prefixes an underscore when the result would start with a digit.
/// Returns `None` when nothing usable remains.
pub fn sanitize(candidate: &str) -> Option<String> {
  let mut out = String::with_capacity(candidate.len());
  let mut pending_separator = false;

  for ch in candidate.trim().chars() {
    let ch = ch.to_ascii_lowercase();
    if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
      if pending_separator && !out.is_empty() {
        out.push('_');
      }
      pending_separator = false;
      out.push(ch);
    } else {
      pending_separator = true;
    }
  }

  if out.is_empty() {
    return None;
  }
  if out.starts_with(|c: char| c.is_ascii_digit()) {
    out.insert(0, '_');
  }
  Some(out)
}

/// Derive the template-variable root for a node.
///
/// Tries the display label, then a tool/variable-name config field, then
/// the raw node id; the first candidate that sanitizes to something usable
/// wins. Returns an empty string when every candidate is unusable.
pub fn resolve_alias(node: &Node) -> String {
  let name_fields = NAME_FIELDS
    .iter()
    .filter_map(|field| node.config.get(*field).and_then(|v| v.as_str()));

  node
    .label
    .as_deref()
    .into_iter()
    .chain(name_fields)
    .chain(std::iter::once(node.node_id.as_str()))
    .find_map(sanitize)
    .unwrap_or_default()
}
