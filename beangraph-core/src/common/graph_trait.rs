//! Shared graph traversal abstraction.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Breadth-first reachability over any adjacency structure.
///
/// Implemented by the interceptor binding closure, where an edge links a
/// binding to each binding it implies, and by the subtype graph that finds
/// types whose hierarchy reaches a cycle.
///
/// # Example
/// ```ignore
/// impl GraphTraversal for BindingClosure<'_> {
///     type Node = QualifierInstance;
///
///     fn neighbors(&self, node: &QualifierInstance) -> Vec<QualifierInstance> {
///         self.annotations.get(&node.name).map(|d| d.implies.clone()).unwrap_or_default()
///     }
///
///     fn contains_node(&self, node: &QualifierInstance) -> bool {
///         self.annotations.contains_key(&node.name)
///     }
/// }
/// ```
pub trait GraphTraversal {
    type Node: Clone + Eq + Hash;

    /// Outgoing edges of a node.
    fn neighbors(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn contains_node(&self, node: &Self::Node) -> bool;

    /// Multi-source BFS: every node reachable from any root, roots included.
    /// Roots unknown to the graph are ignored. Cycles terminate.
    fn reachable_from<I>(&self, roots: I) -> HashSet<Self::Node>
    where
        I: IntoIterator<Item = Self::Node>,
    {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if self.contains_node(&root) && visited.insert(root.clone()) {
                queue.push_back(root);
            }
        }

        while let Some(node) = queue.pop_front() {
            for neighbor in self.neighbors(&node) {
                if visited.insert(neighbor.clone()) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited
    }
}
