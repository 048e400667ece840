//! State shared by every phase of one resolution pass.

use crate::deployment::Deployment;
use crate::matching::{QualifierMatcher, RuleSet, TypeMatcher};
use crate::model::{Component, InjectionPoint};

/// Borrowed deployment plus the matchers and their caches.
///
/// The context is dropped with the pass, and the memoised results with it.
#[derive(Debug)]
pub struct PassContext<'d> {
    pub deployment: &'d Deployment,
    pub types: TypeMatcher<'d>,
    pub qualifiers: QualifierMatcher<'d>,
}

impl<'d> PassContext<'d> {
    pub fn new(deployment: &'d Deployment) -> Self {
        Self {
            deployment,
            types: TypeMatcher::new(deployment.registry()),
            qualifiers: QualifierMatcher::new(deployment.annotations(), deployment.nonbinding()),
        }
    }

    /// Rule set an injection point is resolved with.
    pub fn rules_for(point: &InjectionPoint) -> RuleSet {
        if point.is_delegate() {
            RuleSet::Delegate
        } else {
            RuleSet::Standard
        }
    }

    /// Some bean type of `component` satisfies the point's required type.
    pub fn type_matches(&self, point: &InjectionPoint, component: &Component) -> bool {
        self.types
            .satisfies_any(Self::rules_for(point), point.required_type(), component.bean_types())
    }
}
