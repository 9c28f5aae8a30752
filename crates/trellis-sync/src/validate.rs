use std::collections::HashMap;

use serde_json::Value;
use trellis_config::NodeKind;

use crate::draft::Draft;

/// Field name → human-readable message. Empty means valid.
pub type ValidationErrors = HashMap<String, String>;

/// A pluggable per-kind validator.
pub type ValidatorFn = Box<dyn Fn(&Draft) -> ValidationErrors + Send + Sync>;

/// Per-kind validators with built-in defaults.
///
/// Validation is recomputed eagerly on every edit so the panel can show
/// errors live; it gates manual save only. Live sync and close-time flushes
/// persist work in progress even while invalid.
#[derive(Default)]
pub struct ValidatorRegistry {
  overrides: HashMap<NodeKind, ValidatorFn>,
}

impl ValidatorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the validator for a kind.
  pub fn register(&mut self, kind: NodeKind, validator: ValidatorFn) {
    self.overrides.insert(kind, validator);
  }

  /// Validate a draft against its node kind.
  pub fn validate(&self, kind: NodeKind, draft: &Draft) -> ValidationErrors {
    match self.overrides.get(&kind) {
      Some(validator) => validator(draft),
      None => builtin_validate(kind, draft),
    }
  }
}

fn builtin_validate(kind: NodeKind, draft: &Draft) -> ValidationErrors {
  let mut errors = ValidationErrors::new();

  match kind {
    NodeKind::Agent => {
      require_string(draft, "model", &mut errors);
      if draft.use_structured_output && draft.structured_output_schema.is_none() {
        errors.insert(
          "structured_output_schema".to_string(),
          "a schema is required when structured output is enabled".to_string(),
        );
      }
    }
    NodeKind::Http => {
      require_string(draft, "url", &mut errors);
      if let Some(method) = draft.config.get("method").and_then(|v| v.as_str())
        && !matches!(
          method.to_ascii_uppercase().as_str(),
          "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD"
        )
      {
        errors.insert(
          "method".to_string(),
          format!("unknown HTTP method '{}'", method),
        );
      }
    }
    NodeKind::Code => {
      require_string(draft, "code", &mut errors);
    }
    NodeKind::Input => {
      if let Some(fields) = draft.config.get("fields").and_then(|v| v.as_array()) {
        for (index, field) in fields.iter().enumerate() {
          let named = match field {
            Value::String(s) => !s.is_empty(),
            Value::Object(obj) => obj
              .get("name")
              .and_then(|n| n.as_str())
              .is_some_and(|n| !n.is_empty()),
            _ => false,
          };
          if !named {
            errors.insert(
              format!("fields[{}]", index),
              "every input field needs a name".to_string(),
            );
          }
        }
      }
    }
    NodeKind::Output => {}
  }

  errors
}

fn require_string(draft: &Draft, key: &str, errors: &mut ValidationErrors) {
  let present = draft
    .config
    .get(key)
    .and_then(|v| v.as_str())
    .is_some_and(|s| !s.trim().is_empty());
  if !present {
    errors.insert(key.to_string(), format!("'{}' is required", key));
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn draft_with(config: serde_json::Value) -> Draft {
    Draft {
      config: config.as_object().cloned().unwrap_or_default(),
      ..Default::default()
    }
  }

  #[test]
  fn agent_requires_a_model() {
    let registry = ValidatorRegistry::new();
    let errors = registry.validate(NodeKind::Agent, &draft_with(json!({})));
    assert!(errors.contains_key("model"));

    let errors = registry.validate(NodeKind::Agent, &draft_with(json!({ "model": "small" })));
    assert!(errors.is_empty());
  }

  #[test]
  fn agent_structured_output_needs_a_schema() {
    let registry = ValidatorRegistry::new();
    let mut draft = draft_with(json!({ "model": "small" }));
    draft.use_structured_output = true;
    let errors = registry.validate(NodeKind::Agent, &draft);
    assert!(errors.contains_key("structured_output_schema"));

    draft.structured_output_schema = Some(json!({ "type": "object" }));
    assert!(registry.validate(NodeKind::Agent, &draft).is_empty());
  }

  #[test]
  fn http_checks_url_and_method() {
    let registry = ValidatorRegistry::new();
    let errors = registry.validate(
      NodeKind::Http,
      &draft_with(json!({ "url": "https://example.com", "method": "FETCH" })),
    );
    assert!(errors.contains_key("method"));
    assert!(!errors.contains_key("url"));

    let errors = registry.validate(
      NodeKind::Http,
      &draft_with(json!({ "url": "  ", "method": "get" })),
    );
    assert!(errors.contains_key("url"));
    assert!(!errors.contains_key("method"));
  }

  #[test]
  fn input_fields_need_names() {
    let registry = ValidatorRegistry::new();
    let errors = registry.validate(
      NodeKind::Input,
      &draft_with(json!({ "fields": [{ "name": "query" }, { "type": "string" }, ""] })),
    );
    assert!(errors.contains_key("fields[1]"));
    assert!(errors.contains_key("fields[2]"));
    assert!(!errors.contains_key("fields[0]"));
  }

  #[test]
  fn registered_override_replaces_the_builtin() {
    let mut registry = ValidatorRegistry::new();
    registry.register(
      NodeKind::Output,
      Box::new(|_| {
        let mut errors = ValidationErrors::new();
        errors.insert("always".to_string(), "nope".to_string());
        errors
      }),
    );
    let errors = registry.validate(NodeKind::Output, &draft_with(json!({})));
    assert_eq!(errors["always"], "nope");
  }
}
