//! Trellis Config
//!
//! Serializable data model for the workflow builder: nodes, edges, and the
//! workflow snapshot the configuration panel reads from. These types are
//! owned by the canvas/graph state; everything in this crate is plain data
//! with no behavior beyond lookups.

mod edge;
mod node;
mod workflow;

pub use edge::Edge;
pub use node::{MergePolicy, Node, NodeKind};
pub use workflow::Workflow;
