//! Builder API for running a resolution pass.
//!
//! ```rust,ignore
//! use beangraph_core::prelude::*;
//!
//! let outcome = Resolver::new(snapshot)
//!     .remove_unused(true)
//!     .exclude(|c: &Component| c.id().as_str().starts_with("test."))
//!     .run()?;
//!
//! for id in &outcome.removable {
//!     println!("Unused component: {}", id);
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::BeanGraphConfig;
use crate::context::PassContext;
use crate::deployment::Deployment;
use crate::error::{BeanGraphError, BeanGraphResult};
use crate::graph::{BindingGraph, Resolution, ResolvedInjection};
use crate::logging::{log_problems, log_summary};
use crate::model::{Component, DeclId, DeclarationSnapshot, InjectionPoint, InjectionPointId, TypeName};
use crate::reachability::{find_removable, PatternExclusion, UnusedExclusion};
use crate::resolve::{
    AlternativePriorities, BeanResolver, DecoratorResolver, DeclaredPriorities, InterceptorResolver,
};

/// Configures and runs one resolution pass over a snapshot.
pub struct Resolver {
    snapshot: DeclarationSnapshot,

    /// Run the unused-component analysis
    remove_unused: bool,

    /// Resolve injection points on the rayon pool
    parallel: bool,

    exclusions: Vec<Box<dyn UnusedExclusion>>,

    priorities: Box<dyn AlternativePriorities>,

    /// Non-binding members added to the snapshot's own overrides
    nonbinding: BTreeMap<TypeName, BTreeSet<String>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("components", &self.snapshot.components.len())
            .field("remove_unused", &self.remove_unused)
            .field("parallel", &self.parallel)
            .field("exclusions", &self.exclusions.len())
            .field("nonbinding", &self.nonbinding)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(snapshot: DeclarationSnapshot) -> Self {
        Self {
            snapshot,
            remove_unused: true,
            parallel: true,
            exclusions: Vec::new(),
            priorities: Box::new(DeclaredPriorities),
            nonbinding: BTreeMap::new(),
        }
    }

    /// Enable or disable the unused-component analysis.
    pub fn remove_unused(mut self, enabled: bool) -> Self {
        self.remove_unused = enabled;
        self
    }

    /// Resolve injection points in parallel. Output is identical either way.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Keep components matched by `exclusion` out of the removable set.
    pub fn exclude(mut self, exclusion: impl UnusedExclusion + 'static) -> Self {
        self.exclusions.push(Box::new(exclusion));
        self
    }

    /// Exclude components whose id or provider type matches a regex.
    pub fn exclude_patterns<S: AsRef<str>>(
        self,
        patterns: impl IntoIterator<Item = S>,
    ) -> std::result::Result<Self, regex::Error> {
        Ok(self.exclude(PatternExclusion::new(patterns)?))
    }

    pub fn alternative_priorities(mut self, priorities: impl AlternativePriorities + 'static) -> Self {
        self.priorities = Box::new(priorities);
        self
    }

    /// Treat `member` of `annotation` as non-binding.
    pub fn nonbinding(mut self, annotation: impl Into<TypeName>, member: impl Into<String>) -> Self {
        self.nonbinding
            .entry(annotation.into())
            .or_default()
            .insert(member.into());
        self
    }

    /// Apply settings from `beangraph.toml`.
    pub fn with_config(mut self, cfg: &BeanGraphConfig) -> Result<Self> {
        if let Some(remove_unused) = cfg.remove_unused {
            self.remove_unused = remove_unused;
        }
        if let Some(parallel) = cfg.parallel {
            self.parallel = parallel;
        }
        if let Some(patterns) = &cfg.exclude {
            self = self
                .exclude_patterns(patterns)
                .context("Invalid exclude pattern in configuration")?;
        }
        let overrides = cfg.priority_overrides();
        if !overrides.is_empty() {
            self.priorities = Box::new(overrides);
        }
        for (annotation, members) in cfg.nonbinding_overrides() {
            self.nonbinding.entry(annotation).or_default().extend(members);
        }
        Ok(self)
    }

    fn parallel_enabled(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }

    /// Run the pass.
    ///
    /// Definition, unsatisfied and ambiguous problems are collected in the
    /// outcome; only an internal invariant violation returns `Err`.
    pub fn run(&self) -> BeanGraphResult<ResolutionOutcome> {
        // 1. Validate and index declarations
        let mut deployment = Deployment::build_with(&self.snapshot, &self.nonbinding)?;
        let mut problems = deployment.take_problems();

        let (graph, removable) = {
            let ctx = PassContext::new(&deployment);
            let beans = BeanResolver::new(&ctx, self.priorities.as_ref());

            // 2. Injection points
            let resolve_one = |(i, point): (usize, &InjectionPoint)| {
                let resolution = beans.resolve(point);
                let problem = beans.problem(point, &resolution);
                let resolved = ResolvedInjection {
                    point: InjectionPointId(i),
                    owner: point.owner().declaring_id().clone(),
                    delegate: point.is_delegate(),
                    resolution,
                };
                (resolved, problem)
            };
            let points = deployment.injection_points();
            let results: Vec<(ResolvedInjection, Option<BeanGraphError>)> = if self.parallel_enabled() {
                points.par_iter().enumerate().map(resolve_one).collect()
            } else {
                points.iter().enumerate().map(resolve_one).collect()
            };
            let mut resolutions = Vec::with_capacity(results.len());
            for (resolved, problem) in results {
                resolutions.push(resolved);
                problems.extend(problem);
            }
            debug!(
                injection_points = resolutions.len(),
                parallel = self.parallel_enabled(),
                type_cache = ctx.types.cache_len(),
                "injection points resolved"
            );

            // 3. Interceptor and decorator chains
            let interceptors = InterceptorResolver::new(&ctx);
            let decorators = DecoratorResolver::new(&ctx);
            let mut interceptor_chains = BTreeMap::new();
            let mut decorator_chains = BTreeMap::new();
            for component in deployment.components().iter().filter(|c| c.is_class()) {
                let chains = interceptors.chains_for(component);
                if !chains.is_empty() {
                    interceptor_chains.insert(component.id().clone(), chains);
                }
                let chain: Vec<DeclId> = decorators
                    .resolve(component)
                    .into_iter()
                    .map(|d| d.id.clone())
                    .collect();
                if !chain.is_empty() {
                    decorator_chains.insert(component.id().clone(), chain);
                }
            }

            // 4. Named components
            problems.extend(beans.validate_names());

            let nodes: Vec<DeclId> = deployment
                .components()
                .iter()
                .map(|c| c.id().clone())
                .chain(deployment.interceptors().iter().map(|i| i.id.clone()))
                .chain(deployment.decorators().iter().map(|d| d.id.clone()))
                .collect();
            let graph = BindingGraph::new(nodes, resolutions, interceptor_chains, decorator_chains);

            // 5. Unused components
            let removable = if self.remove_unused {
                find_removable(&ctx, &graph, &self.exclusions)
            } else {
                BTreeSet::new()
            };
            (graph, removable)
        };

        log_problems(&problems);
        log_summary(
            deployment.components().len(),
            deployment.injection_points().len(),
            removable.len(),
            problems.len(),
        );

        Ok(ResolutionOutcome {
            deployment,
            graph,
            removable,
            problems,
        })
    }
}

/// Everything one pass produced.
#[derive(Debug)]
pub struct ResolutionOutcome {
    pub deployment: Deployment,
    pub graph: BindingGraph,
    pub removable: BTreeSet<DeclId>,
    /// Definition, unsatisfied, ambiguous and ambiguous-name problems
    pub problems: Vec<BeanGraphError>,
}

/// Counters for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeStats {
    pub components: usize,
    pub interceptors: usize,
    pub decorators: usize,
    pub injection_points: usize,
    pub resolved: usize,
    pub unsatisfied: usize,
    pub ambiguous: usize,
    pub deferred: usize,
    pub removable: usize,
    pub problems: usize,
}

impl ResolutionOutcome {
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Fails with every collected problem at once.
    pub fn into_result(self) -> BeanGraphResult<Self> {
        if self.problems.is_empty() {
            Ok(self)
        } else {
            Err(BeanGraphError::Validation {
                problems: self.problems,
            })
        }
    }

    pub fn is_removable(&self, id: &DeclId) -> bool {
        self.removable.contains(id)
    }

    /// Components that survive unused-component removal.
    pub fn retained_components(&self) -> Vec<&Component> {
        self.deployment
            .components()
            .iter()
            .filter(|c| !self.removable.contains(c.id()))
            .collect()
    }

    pub fn stats(&self) -> OutcomeStats {
        let mut stats = OutcomeStats {
            components: self.deployment.components().len(),
            interceptors: self.deployment.interceptors().len(),
            decorators: self.deployment.decorators().len(),
            injection_points: self.graph.resolutions().len(),
            removable: self.removable.len(),
            problems: self.problems.len(),
            ..OutcomeStats::default()
        };
        for r in self.graph.resolutions() {
            match r.resolution {
                Resolution::Resolved(_) => stats.resolved += 1,
                Resolution::Unsatisfied => stats.unsatisfied += 1,
                Resolution::Ambiguous(_) => stats.ambiguous += 1,
                Resolution::Deferred => stats.deferred += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InjectionOwner, TypeDecl, TypeRef};

    fn snapshot() -> DeclarationSnapshot {
        let mut s = DeclarationSnapshot::new();
        s.add_type(TypeDecl::new("Greeter"))
            .add_type(TypeDecl::new("Shop"))
            .add_component(Component::class("Shop", TypeRef::class("Shop")).unremovable().done())
            .add_component(Component::class("Greeter", TypeRef::class("Greeter")).done())
            .add_component(Component::class("Leftover", TypeRef::class("Shop")).named("leftover").done())
            .add_injection_point(
                InjectionPoint::field(InjectionOwner::Component("Shop".into()), TypeRef::class("Greeter")).done(),
            );
        s
    }

    #[test]
    fn test_run_basic() {
        let outcome = Resolver::new(snapshot()).run().unwrap();
        assert!(!outcome.has_problems(), "{:?}", outcome.problems);
        assert_eq!(
            outcome.graph.resolution(InjectionPointId(0)),
            Some(&Resolution::Resolved("Greeter".into()))
        );
        assert!(outcome.removable.is_empty());
        let stats = outcome.stats();
        assert_eq!(stats.components, 3);
        assert_eq!(stats.resolved, 1);
    }

    #[test]
    fn test_remove_unused_toggle() {
        let mut s = snapshot();
        s.add_component(Component::class("Unused", TypeRef::class("Shop")).done());
        let outcome = Resolver::new(s.clone()).run().unwrap();
        assert!(outcome.is_removable(&"Unused".into()));
        assert_eq!(outcome.retained_components().len(), 3);

        let outcome = Resolver::new(s).remove_unused(false).run().unwrap();
        assert!(outcome.removable.is_empty());
    }

    #[test]
    fn test_into_result_aggregates() {
        let mut s = snapshot();
        s.add_injection_point(
            InjectionPoint::field(InjectionOwner::Component("Shop".into()), TypeRef::class("Shop")).done(),
        );
        let err = Resolver::new(s).run().unwrap().into_result().unwrap_err();
        match err {
            BeanGraphError::Validation { problems } => {
                assert_eq!(problems.len(), 1);
                assert!(matches!(problems[0], BeanGraphError::Ambiguous { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_with_config() {
        let cfg: BeanGraphConfig = toml::from_str(
            r#"
remove_unused = false
parallel = false
exclude = ["^Leftover$"]
"#,
        )
        .unwrap();
        let resolver = Resolver::new(snapshot()).with_config(&cfg).unwrap();
        assert!(!resolver.remove_unused);
        assert!(!resolver.parallel);
        assert_eq!(resolver.exclusions.len(), 1);

        let bad: BeanGraphConfig = toml::from_str(r#"exclude = ["("]"#).unwrap();
        assert!(Resolver::new(snapshot()).with_config(&bad).is_err());
    }
}
