use serde_json::{Map, Value};
use trellis_config::MergePolicy;

use crate::draft::Draft;

/// Build the config to persist: the draft's edits laid over the
/// authoritative copy.
///
/// Only keys the user actually edited override; authoritative keys the
/// draft never touched are preserved. The kind's designated collection
/// field is taken from the draft whenever the draft carries it, even as an
/// empty collection - an intentionally emptied collection is distinct from
/// an absent one.
///
/// Merging twice with no intervening edits is idempotent.
pub fn merge_config(
  draft: &Draft,
  authoritative: &Map<String, Value>,
  policy: MergePolicy,
) -> Map<String, Value> {
  let mut merged = authoritative.clone();

  for key in &draft.edited {
    match draft.config.get(key) {
      Some(value) => {
        merged.insert(key.clone(), value.clone());
      }
      None => {
        merged.remove(key);
      }
    }
  }

  if let Some(field) = policy.collection_field
    && let Some(value) = draft.config.get(field)
  {
    merged.insert(field.to_string(), value.clone());
  }

  merged
}
