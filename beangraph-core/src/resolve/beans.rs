//! Injection point resolution with alternative disambiguation.

use std::collections::{BTreeMap, HashMap};

use crate::context::PassContext;
use crate::error::BeanGraphError;
use crate::graph::Resolution;
use crate::model::{format_qualifiers, required_qualifiers, Component, DeclId, InjectionPoint};

/// Supplies alternative priorities that take precedence over declared ones.
pub trait AlternativePriorities: Send + Sync {
    /// Override for `component`, or `None` to keep its declared priority.
    fn priority(&self, component: &Component) -> Option<i32>;
}

/// Uses declared priorities only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredPriorities;

impl AlternativePriorities for DeclaredPriorities {
    fn priority(&self, _component: &Component) -> Option<i32> {
        None
    }
}

/// Fixed per-component overrides, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct PriorityOverrides {
    overrides: HashMap<DeclId, i32>,
}

impl PriorityOverrides {
    pub fn new(overrides: impl IntoIterator<Item = (DeclId, i32)>) -> Self {
        Self {
            overrides: overrides.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl AlternativePriorities for PriorityOverrides {
    fn priority(&self, component: &Component) -> Option<i32> {
        self.overrides.get(component.id()).copied()
    }
}

pub struct BeanResolver<'c, 'd> {
    ctx: &'c PassContext<'d>,
    priorities: &'c dyn AlternativePriorities,
}

impl<'c, 'd> BeanResolver<'c, 'd> {
    pub fn new(ctx: &'c PassContext<'d>, priorities: &'c dyn AlternativePriorities) -> Self {
        Self { ctx, priorities }
    }

    /// Type and qualifiers of `component` satisfy `point`.
    pub fn matches(&self, point: &InjectionPoint, component: &Component) -> bool {
        self.ctx.type_matches(point, component)
            && self
                .ctx
                .qualifiers
                .satisfies(point.qualifiers(), component.qualifiers())
    }

    pub fn candidates(&self, point: &InjectionPoint) -> Vec<&'d Component> {
        self.ctx
            .deployment
            .components()
            .iter()
            .filter(|c| self.matches(point, c))
            .collect()
    }

    pub fn resolve(&self, point: &InjectionPoint) -> Resolution {
        if point.is_lookup() {
            return Resolution::Deferred;
        }
        let candidates = self.candidates(point);
        match candidates.len() {
            0 => Resolution::Unsatisfied,
            1 => Resolution::Resolved(candidates[0].id().clone()),
            _ => match self.resolve_ambiguity(&candidates) {
                Some(selected) => Resolution::Resolved(selected.id().clone()),
                None => Resolution::Ambiguous(candidates.iter().map(|c| c.id().clone()).collect()),
            },
        }
    }

    /// Pick the single winning alternative among `candidates`, if there is one.
    pub fn resolve_ambiguity(&self, candidates: &[&'d Component]) -> Option<&'d Component> {
        let alternatives: Vec<&'d Component> = candidates
            .iter()
            .copied()
            .filter(|c| self.is_alternative(c))
            .collect();
        match alternatives.as_slice() {
            [] => None,
            [single] => Some(*single),
            _ => {
                let ranked: Vec<(Option<i32>, &'d Component)> = alternatives
                    .iter()
                    .map(|c| (self.effective_priority(c), *c))
                    .collect();
                let highest = ranked.iter().map(|(p, _)| *p).max()?;
                let mut winners = ranked.iter().filter(|(p, _)| *p == highest);
                match (winners.next(), winners.next()) {
                    (Some((_, winner)), None) => Some(*winner),
                    _ => None,
                }
            }
        }
    }

    /// Alternatives are flagged directly or inherit the flag from the
    /// component declaring them.
    pub fn is_alternative(&self, component: &Component) -> bool {
        component.is_alternative()
            || self
                .declaring(component)
                .map(Component::is_alternative)
                .unwrap_or(false)
    }

    /// Override first, then the declared priority, then the declaring
    /// component's. `None` ranks below every value.
    pub fn effective_priority(&self, component: &Component) -> Option<i32> {
        self.priorities
            .priority(component)
            .or_else(|| component.priority())
            .or_else(|| {
                self.declaring(component)
                    .and_then(|d| self.priorities.priority(d).or_else(|| d.priority()))
            })
    }

    fn declaring(&self, component: &Component) -> Option<&'d Component> {
        component
            .declaring()
            .and_then(|id| self.ctx.deployment.component(id))
    }

    /// Error for an unsatisfied or ambiguous resolution.
    pub fn problem(&self, point: &InjectionPoint, resolution: &Resolution) -> Option<BeanGraphError> {
        let required_type = point.required_type().to_string();
        let qualifiers = format_qualifiers(&required_qualifiers(point.qualifiers()));
        match resolution {
            Resolution::Unsatisfied => Some(BeanGraphError::Unsatisfied {
                required_type,
                qualifiers,
                point: point.describe(),
                owner: point.owner().to_string(),
            }),
            Resolution::Ambiguous(ids) => Some(BeanGraphError::Ambiguous {
                required_type,
                qualifiers,
                point: point.describe(),
                owner: point.owner().to_string(),
                candidates: ids.iter().map(ToString::to_string).collect(),
            }),
            Resolution::Resolved(_) | Resolution::Deferred => None,
        }
    }

    /// Components sharing a name that disambiguation cannot settle.
    pub fn validate_names(&self) -> Vec<BeanGraphError> {
        let mut by_name: BTreeMap<&str, Vec<&'d Component>> = BTreeMap::new();
        for component in self.ctx.deployment.components() {
            if let Some(name) = component.name() {
                by_name.entry(name).or_default().push(component);
            }
        }
        by_name
            .into_iter()
            .filter(|(_, group)| group.len() > 1 && self.resolve_ambiguity(group).is_none())
            .map(|(name, group)| BeanGraphError::AmbiguousName {
                name: name.to_string(),
                candidates: group.iter().map(|c| c.id().to_string()).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::Deployment;
    use crate::model::{DeclarationSnapshot, InjectionOwner, TypeDecl, TypeRef};

    fn snapshot(components: Vec<Component>) -> DeclarationSnapshot {
        let mut s = DeclarationSnapshot::new();
        s.add_type(TypeDecl::new("Greeter"))
            .add_type(TypeDecl::new("Config"));
        for c in components {
            s.add_component(c);
        }
        s
    }

    fn greeter_point() -> InjectionPoint {
        InjectionPoint::field(InjectionOwner::Component("Client".into()), TypeRef::class("Greeter")).done()
    }

    #[test]
    fn test_two_plain_candidates_are_ambiguous() {
        let s = snapshot(vec![
            Component::class("A", TypeRef::class("Greeter")).done(),
            Component::class("B", TypeRef::class("Greeter")).done(),
        ]);
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = BeanResolver::new(&ctx, &DeclaredPriorities);
        let resolution = resolver.resolve(&greeter_point());
        assert_eq!(resolution, Resolution::Ambiguous(vec!["A".into(), "B".into()]));
        let err = resolver.problem(&greeter_point(), &resolution).unwrap();
        assert!(err.to_string().contains("Ambiguous dependencies for type Greeter"));
    }

    #[test]
    fn test_single_alternative_wins() {
        let s = snapshot(vec![
            Component::class("A", TypeRef::class("Greeter")).done(),
            Component::class("B", TypeRef::class("Greeter")).alternative(Some(1)).done(),
        ]);
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = BeanResolver::new(&ctx, &DeclaredPriorities);
        assert_eq!(resolver.resolve(&greeter_point()), Resolution::Resolved("B".into()));
    }

    #[test]
    fn test_highest_priority_alternative_wins() {
        let s = snapshot(vec![
            Component::class("Low", TypeRef::class("Greeter")).alternative(Some(1)).done(),
            Component::class("High", TypeRef::class("Greeter")).alternative(Some(10)).done(),
            Component::class("Unranked", TypeRef::class("Greeter")).alternative(None).done(),
        ]);
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = BeanResolver::new(&ctx, &DeclaredPriorities);
        assert_eq!(resolver.resolve(&greeter_point()), Resolution::Resolved("High".into()));

        let overrides = PriorityOverrides::new([(DeclId::from("Low"), 100)]);
        let resolver = BeanResolver::new(&ctx, &overrides);
        assert_eq!(resolver.resolve(&greeter_point()), Resolution::Resolved("Low".into()));
    }

    #[test]
    fn test_equal_priorities_stay_ambiguous() {
        let s = snapshot(vec![
            Component::class("A", TypeRef::class("Greeter")).alternative(Some(5)).done(),
            Component::class("B", TypeRef::class("Greeter")).alternative(Some(5)).done(),
        ]);
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = BeanResolver::new(&ctx, &DeclaredPriorities);
        assert!(matches!(resolver.resolve(&greeter_point()), Resolution::Ambiguous(_)));
    }

    #[test]
    fn test_producer_inherits_alternative_from_declaring() {
        let s = snapshot(vec![
            Component::class("Plain", TypeRef::class("Greeter")).done(),
            Component::class("Factory", TypeRef::class("Config")).alternative(Some(3)).done(),
            Component::producer_method("Factory#greeter", "Factory", TypeRef::class("Greeter")).done(),
        ]);
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = BeanResolver::new(&ctx, &DeclaredPriorities);
        let producer = d.component(&"Factory#greeter".into()).unwrap();
        assert!(resolver.is_alternative(producer));
        assert_eq!(resolver.effective_priority(producer), Some(3));
        assert_eq!(
            resolver.resolve(&greeter_point()),
            Resolution::Resolved("Factory#greeter".into())
        );
    }

    #[test]
    fn test_unsatisfied_and_lookup() {
        let s = snapshot(vec![]);
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = BeanResolver::new(&ctx, &DeclaredPriorities);
        let point = greeter_point();
        let resolution = resolver.resolve(&point);
        assert_eq!(resolution, Resolution::Unsatisfied);
        let err = resolver.problem(&point, &resolution).unwrap();
        assert!(err.to_string().contains("[@Default, @Any]"));

        let lookup = InjectionPoint::lookup(InjectionOwner::Component("Client".into()), TypeRef::class("Greeter")).done();
        let resolution = resolver.resolve(&lookup);
        assert_eq!(resolution, Resolution::Deferred);
        assert!(resolver.problem(&lookup, &resolution).is_none());
    }

    #[test]
    fn test_ambiguous_names() {
        let s = snapshot(vec![
            Component::class("A", TypeRef::class("Greeter")).named("greeter").done(),
            Component::class("B", TypeRef::class("Config")).named("greeter").done(),
            Component::class("C", TypeRef::class("Config")).named("config").done(),
        ]);
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let problems = BeanResolver::new(&ctx, &DeclaredPriorities).validate_names();
        assert_eq!(problems.len(), 1);
        assert!(matches!(&problems[0], BeanGraphError::AmbiguousName { name, .. } if name == "greeter"));
    }
}
