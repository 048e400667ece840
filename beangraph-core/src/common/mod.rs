//! Utilities shared across the resolution phases.

mod graph_trait;

pub use graph_trait::GraphTraversal;
