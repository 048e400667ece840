//! Unused component detection.
//!
//! Pass 1 keeps every component with a reason to exist: it is named, marked
//! unremovable, excluded, injected somewhere (decorator delegates do not
//! count), declares an observer, or may be obtained through a programmatic
//! lookup. Components without such a reason are removable unless they declare
//! producers; those owners wait for pass 2, which removes an owner once all of
//! its producers turned out unused. Pass 2 repeats until nothing changes so
//! removal propagates through chains of producer owners.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;
use tracing::debug;

use crate::context::PassContext;
use crate::graph::BindingGraph;
use crate::model::{Component, DeclId, InjectionPoint};

/// Keeps matching components out of the removable set.
pub trait UnusedExclusion: Send + Sync {
    fn excludes(&self, component: &Component) -> bool;
}

impl<F> UnusedExclusion for F
where
    F: Fn(&Component) -> bool + Send + Sync,
{
    fn excludes(&self, component: &Component) -> bool {
        self(component)
    }
}

/// Excludes components whose id or provider type matches any pattern.
#[derive(Debug, Clone)]
pub struct PatternExclusion {
    patterns: Vec<Regex>,
}

impl PatternExclusion {
    pub fn new<S: AsRef<str>>(patterns: impl IntoIterator<Item = S>) -> Result<Self, regex::Error> {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl UnusedExclusion for PatternExclusion {
    fn excludes(&self, component: &Component) -> bool {
        let provider = component.provider_type().to_string();
        self.patterns
            .iter()
            .any(|p| p.is_match(component.id().as_str()) || p.is_match(&provider))
    }
}

/// Components that can be dropped without changing any resolution.
pub fn find_removable(
    ctx: &PassContext<'_>,
    graph: &BindingGraph,
    exclusions: &[Box<dyn UnusedExclusion>],
) -> BTreeSet<DeclId> {
    let deployment = ctx.deployment;
    let injected = graph.injected();
    let lookups: Vec<&InjectionPoint> = deployment
        .injection_points()
        .iter()
        .filter(|p| p.is_lookup())
        .collect();

    let is_used = |component: &Component| -> bool {
        component.name().is_some()
            || component.is_unremovable()
            || exclusions.iter().any(|e| e.excludes(component))
            || injected.contains(component.id())
            || deployment.declares_observer(component.id())
            || lookups.iter().any(|point| {
                ctx.type_matches(point, component)
                    && ctx
                        .qualifiers
                        .satisfies(point.qualifiers(), component.qualifiers())
            })
    };

    // 1. Direct usage
    let mut removable = BTreeSet::new();
    let mut unused_producers: HashSet<&DeclId> = HashSet::new();
    let mut pending: Vec<&Component> = Vec::new();
    for component in deployment.components() {
        if is_used(component) {
            continue;
        }
        if deployment.producers_of(component.id()).next().is_some() {
            pending.push(component);
            continue;
        }
        removable.insert(component.id().clone());
        if component.is_producer() {
            unused_producers.insert(component.id());
        }
    }

    // 2. Owners whose producers are all unused
    loop {
        let before = pending.len();
        pending.retain(|owner| {
            let all_unused = deployment
                .producers_of(owner.id())
                .all(|p| unused_producers.contains(p.id()));
            if all_unused {
                removable.insert(owner.id().clone());
                if owner.is_producer() {
                    unused_producers.insert(owner.id());
                }
            }
            !all_unused
        });
        if pending.len() == before {
            break;
        }
    }

    debug!(
        removable = removable.len(),
        kept_owners = pending.len(),
        "unused component analysis finished"
    );
    removable
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::deployment::Deployment;
    use crate::graph::{Resolution, ResolvedInjection};
    use crate::model::{
        DeclarationSnapshot, InjectionOwner, InjectionPointId, ObserverDecl, QualifierInstance, TypeDecl, TypeRef,
        AnnotationDecl,
    };

    fn graph_with_injections(targets: &[(&str, &str)]) -> BindingGraph {
        let resolutions = targets
            .iter()
            .enumerate()
            .map(|(i, (owner, target))| ResolvedInjection {
                point: InjectionPointId(i),
                owner: DeclId::from(*owner),
                delegate: false,
                resolution: Resolution::Resolved(DeclId::from(*target)),
            })
            .collect();
        BindingGraph::new(Vec::new(), resolutions, BTreeMap::new(), BTreeMap::new())
    }

    fn base() -> DeclarationSnapshot {
        let mut s = DeclarationSnapshot::new();
        s.add_type(TypeDecl::new("Service"))
            .add_type(TypeDecl::new("Event"))
            .add_annotation(AnnotationDecl::qualifier("Fast"));
        s
    }

    fn removable_ids(s: &DeclarationSnapshot, graph: &BindingGraph, exclusions: &[Box<dyn UnusedExclusion>]) -> Vec<String> {
        let d = Deployment::build(s).unwrap();
        let ctx = PassContext::new(&d);
        find_removable(&ctx, graph, exclusions)
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn test_keep_reasons() {
        let mut s = base();
        s.add_component(Component::class("Unused", TypeRef::class("Service")).done())
            .add_component(Component::class("Named", TypeRef::class("Service")).named("named").done())
            .add_component(Component::class("Pinned", TypeRef::class("Service")).unremovable().done())
            .add_component(Component::class("Injected", TypeRef::class("Service")).done())
            .add_component(Component::class("Listener", TypeRef::class("Service")).done())
            .add_component(Component::class("MockService", TypeRef::class("Service")).done())
            .add_observer(ObserverDecl::new("Listener", TypeRef::class("Event")));
        let graph = graph_with_injections(&[("Client", "Injected")]);
        let exclusions: Vec<Box<dyn UnusedExclusion>> = vec![Box::new(PatternExclusion::new(["^Mock"]).unwrap())];
        assert_eq!(removable_ids(&s, &graph, &exclusions), vec!["Unused"]);
    }

    #[test]
    fn test_lookup_keeps_matching_components() {
        let mut s = base();
        s.add_component(Component::class("Plain", TypeRef::class("Service")).done())
            .add_component(
                Component::class("FastService", TypeRef::class("Service"))
                    .qualifier(QualifierInstance::new("Fast"))
                    .done(),
            )
            .add_component(Component::class("Looker", TypeRef::class("Event")).unremovable().done())
            .add_injection_point(
                InjectionPoint::lookup(InjectionOwner::Component("Looker".into()), TypeRef::class("Service"))
                    .qualifier(QualifierInstance::new("Fast"))
                    .done(),
            );
        let graph = graph_with_injections(&[]);
        assert_eq!(removable_ids(&s, &graph, &[]), vec!["Plain"]);
    }

    #[test]
    fn test_unqualified_lookup_requires_default() {
        let mut s = base();
        s.add_component(Component::class("Plain", TypeRef::class("Service")).done())
            .add_component(
                Component::class("FastService", TypeRef::class("Service"))
                    .qualifier(QualifierInstance::new("Fast"))
                    .done(),
            )
            .add_component(Component::class("Looker", TypeRef::class("Event")).unremovable().done())
            .add_injection_point(
                InjectionPoint::lookup(InjectionOwner::Component("Looker".into()), TypeRef::class("Service")).done(),
            );
        let graph = graph_with_injections(&[]);
        assert_eq!(removable_ids(&s, &graph, &[]), vec!["FastService"]);
    }

    #[test]
    fn test_producer_owner_propagation() {
        let mut s = base();
        s.add_component(Component::class("OwnerX", TypeRef::class("Event")).done())
            .add_component(Component::producer_method("OwnerX#produceY", "OwnerX", TypeRef::class("Service")).done());
        let graph = graph_with_injections(&[]);
        assert_eq!(removable_ids(&s, &graph, &[]), vec!["OwnerX", "OwnerX#produceY"]);

        // Injecting the produced type keeps both
        let graph = graph_with_injections(&[("Client", "OwnerX#produceY")]);
        assert!(removable_ids(&s, &graph, &[]).is_empty());
    }

    #[test]
    fn test_closure_exclusion() {
        let mut s = base();
        s.add_component(Component::class("Unused", TypeRef::class("Service")).done());
        let graph = graph_with_injections(&[]);
        let exclusions: Vec<Box<dyn UnusedExclusion>> = vec![Box::new(|c: &Component| c.id().as_str() == "Unused")];
        assert!(removable_ids(&s, &graph, &exclusions).is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(PatternExclusion::new(["("]).is_err());
    }
}
