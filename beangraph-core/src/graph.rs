//! The binding graph: resolution results, interception chains and the
//! dependency graph between declarations.
//!
//! The graph is read-only once the pass has built it. Every collection is
//! ordered so its canonical JSON form, and therefore its fingerprint, only
//! depends on the declarations.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::{DeclId, InjectionPointId, InterceptionKind};

/// Outcome of resolving one injection point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "targets", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(DeclId),
    Unsatisfied,
    Ambiguous(Vec<DeclId>),
    /// Programmatic lookup, settled by the reachability analysis
    Deferred,
}

impl Resolution {
    pub fn target(&self) -> Option<&DeclId> {
        match self {
            Self::Resolved(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Unsatisfied | Self::Ambiguous(_))
    }
}

/// Resolution of one injection point together with its owning declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInjection {
    pub point: InjectionPointId,
    pub owner: DeclId,
    pub delegate: bool,
    pub resolution: Resolution,
}

/// Ordered interceptor chains of one class-derived component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterceptionChains {
    pub lifecycle: BTreeMap<InterceptionKind, Vec<DeclId>>,
    /// Around-invoke chains per business method
    pub methods: BTreeMap<String, Vec<DeclId>>,
}

impl InterceptionChains {
    pub fn is_empty(&self) -> bool {
        self.lifecycle.is_empty() && self.methods.is_empty()
    }

    pub fn lifecycle_chain(&self, kind: InterceptionKind) -> &[DeclId] {
        self.lifecycle.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn method_chain(&self, method: &str) -> &[DeclId] {
        self.methods.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every interceptor bound somewhere in these chains.
    pub fn interceptors(&self) -> BTreeSet<&DeclId> {
        self.lifecycle
            .values()
            .chain(self.methods.values())
            .flatten()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BindingGraph {
    /// Components, interceptors and decorators in declaration order
    nodes: Vec<DeclId>,
    resolutions: Vec<ResolvedInjection>,
    interceptors: BTreeMap<DeclId, InterceptionChains>,
    decorators: BTreeMap<DeclId, Vec<DeclId>>,
}

impl BindingGraph {
    pub(crate) fn new(
        nodes: Vec<DeclId>,
        resolutions: Vec<ResolvedInjection>,
        interceptors: BTreeMap<DeclId, InterceptionChains>,
        decorators: BTreeMap<DeclId, Vec<DeclId>>,
    ) -> Self {
        Self {
            nodes,
            resolutions,
            interceptors,
            decorators,
        }
    }

    pub fn nodes(&self) -> &[DeclId] {
        &self.nodes
    }

    pub fn resolutions(&self) -> &[ResolvedInjection] {
        &self.resolutions
    }

    pub fn resolution(&self, point: InjectionPointId) -> Option<&Resolution> {
        self.resolutions
            .get(point.0)
            .filter(|r| r.point == point)
            .map(|r| &r.resolution)
    }

    pub fn interceptor_chains(&self, component: &DeclId) -> Option<&InterceptionChains> {
        self.interceptors.get(component)
    }

    pub fn decorator_chain(&self, component: &DeclId) -> &[DeclId] {
        self.decorators
            .get(component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Targets of every resolved injection point except decorator delegates.
    pub fn injected(&self) -> HashSet<&DeclId> {
        self.resolutions
            .iter()
            .filter(|r| !r.delegate)
            .filter_map(|r| r.resolution.target())
            .collect()
    }

    /// Edges from an owner to every declaration it depends on: injected
    /// components, bound interceptors and applied decorators.
    fn edges(&self) -> Vec<(&DeclId, &DeclId)> {
        let mut edges = Vec::new();
        for r in &self.resolutions {
            if let Some(target) = r.resolution.target() {
                edges.push((&r.owner, target));
            }
        }
        for (component, chains) in &self.interceptors {
            for interceptor in chains.interceptors() {
                edges.push((component, interceptor));
            }
        }
        for (component, chain) in &self.decorators {
            for decorator in chain {
                edges.push((component, decorator));
            }
        }
        edges
    }

    /// Dependency graph between declarations.
    ///
    /// Uses `DiGraphMap<&str, ()>`: declaration ids are borrowed from the
    /// binding graph and edges carry no data.
    pub fn dependency_graph(&self) -> DiGraphMap<&str, ()> {
        let mut g = DiGraphMap::new();
        for id in &self.nodes {
            g.add_node(id.as_str());
        }
        for (from, to) in self.edges() {
            g.add_edge(from.as_str(), to.as_str(), ());
        }
        g
    }

    /// Export in visualizer-compatible JSON format.
    ///
    /// ```json
    /// {
    ///   "nodes": [{ "id": 0, "name": "OrderService", "removable": false }],
    ///   "edges": [{ "from": 0, "to": 1 }]
    /// }
    /// ```
    pub fn to_visualizer_json(&self, removable: &BTreeSet<DeclId>) -> serde_json::Value {
        let index: HashMap<&DeclId, usize> = self.nodes.iter().enumerate().map(|(i, n)| (n, i)).collect();

        let nodes: Vec<serde_json::Value> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, id)| {
                serde_json::json!({
                    "id": i,
                    "name": id.as_str(),
                    "removable": removable.contains(id),
                })
            })
            .collect();

        let mut edges: Vec<(usize, usize)> = self
            .edges()
            .into_iter()
            .filter_map(|(from, to)| Some((*index.get(from)?, *index.get(to)?)))
            .collect();
        edges.sort_unstable();
        edges.dedup();
        let edges: Vec<serde_json::Value> = edges
            .into_iter()
            .map(|(from, to)| serde_json::json!({ "from": from, "to": to }))
            .collect();

        serde_json::json!({
            "nodes": nodes,
            "edges": edges,
            "stats": {
                "total_declarations": self.nodes.len(),
                "total_edges": edges.len(),
                "removable": removable.len(),
            }
        })
    }

    /// Canonical JSON form of the graph.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// SHA-256 of the canonical JSON form, as 64 hex characters.
    pub fn fingerprint(&self) -> String {
        let mut sha = Sha256::new();
        sha.update(self.canonical_json().as_bytes());
        format!("{:x}", sha.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BindingGraph {
        let mut chains = InterceptionChains::default();
        chains
            .lifecycle
            .insert(InterceptionKind::PostConstruct, vec!["Audit".into()]);
        BindingGraph::new(
            vec!["Shop".into(), "Repo".into(), "Unused".into(), "Audit".into()],
            vec![
                ResolvedInjection {
                    point: InjectionPointId(0),
                    owner: "Shop".into(),
                    delegate: false,
                    resolution: Resolution::Resolved("Repo".into()),
                },
                ResolvedInjection {
                    point: InjectionPointId(1),
                    owner: "Shop".into(),
                    delegate: false,
                    resolution: Resolution::Deferred,
                },
            ],
            BTreeMap::from([(DeclId::from("Shop"), chains)]),
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_dependency_graph_edges() {
        let graph = sample();
        let g = graph.dependency_graph();
        assert_eq!(g.node_count(), 4);
        assert!(g.contains_edge("Shop", "Repo"));
        assert!(g.contains_edge("Shop", "Audit"));
        assert!(!g.contains_edge("Repo", "Shop"));
    }

    #[test]
    fn test_injected_targets() {
        let graph = sample();
        let injected = graph.injected();
        assert!(injected.contains(&DeclId::from("Repo")));
        assert!(!injected.contains(&DeclId::from("Unused")));
        assert_eq!(graph.resolution(InjectionPointId(1)), Some(&Resolution::Deferred));
        assert_eq!(graph.resolution(InjectionPointId(7)), None);
    }

    #[test]
    fn test_visualizer_json() {
        let graph = sample();
        let removable = BTreeSet::from([DeclId::from("Unused")]);
        let json = graph.to_visualizer_json(&removable);
        assert_eq!(json["nodes"][2]["removable"], true);
        assert_eq!(json["stats"]["total_edges"], 2);
        assert_eq!(json["stats"]["removable"], 1);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = sample().fingerprint();
        assert_eq!(a.len(), 64);
        assert_eq!(a, sample().fingerprint());

        let empty = BindingGraph::default().fingerprint();
        assert_ne!(a, empty);
    }
}
