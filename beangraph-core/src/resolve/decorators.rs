//! Decorator chains.

use crate::context::PassContext;
use crate::matching::RuleSet;
use crate::model::{Component, DecoratorDecl};

pub struct DecoratorResolver<'c, 'd> {
    ctx: &'c PassContext<'d>,
}

impl<'c, 'd> DecoratorResolver<'c, 'd> {
    pub fn new(ctx: &'c PassContext<'d>) -> Self {
        Self { ctx }
    }

    /// The delegate accepts one of the component's bean types and qualifiers,
    /// and every decorated type is implemented by the component.
    pub fn applies(&self, decorator: &DecoratorDecl, component: &Component) -> bool {
        if !component.is_class() {
            return false;
        }
        let Some((_, delegate)) = self.ctx.deployment.delegate_of(&decorator.id) else {
            return false;
        };
        let types = &self.ctx.types;
        let bean_types = component.bean_types();
        types.satisfies_any(RuleSet::Delegate, delegate.required_type(), bean_types)
            && self
                .ctx
                .qualifiers
                .satisfies(delegate.qualifiers(), component.qualifiers())
            && decorator
                .decorated_types
                .iter()
                .all(|t| types.satisfies_any(RuleSet::Standard, t, bean_types))
    }

    /// Decorators applying to `component`, ordered by ascending priority.
    pub fn resolve(&self, component: &Component) -> Vec<&'d DecoratorDecl> {
        let mut matched: Vec<&'d DecoratorDecl> = self
            .ctx
            .deployment
            .decorators()
            .iter()
            .filter(|d| self.applies(d, component))
            .collect();
        matched.sort_by_key(|d| d.priority);
        matched
    }
}
