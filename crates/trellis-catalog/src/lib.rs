//! Trellis Catalog
//!
//! Computes the template-variable suggestions offered while editing a node's
//! configuration. Given the workflow snapshot and a focused node, the
//! catalog walks the graph upstream, derives an alias per ancestor, and
//! expands each ancestor's output shape into dotted/bracketed paths.
//!
//! Everything here is a pure function over an injected snapshot: no I/O,
//! no shared state, and missing or malformed graph data degrades to an
//! empty result instead of failing.

mod alias;
mod catalog;
mod reachability;

pub use alias::{resolve_alias, sanitize};
pub use catalog::{INPUTS_TOKEN, variable_suggestions};
pub use reachability::ancestors;
