//! Interceptor chains.

use std::collections::{BTreeMap, HashMap};

use crate::common::GraphTraversal;
use crate::context::PassContext;
use crate::graph::InterceptionChains;
use crate::model::{AnnotationDecl, Component, DeclId, InterceptionKind, InterceptorDecl, QualifierInstance, TypeName};

/// Interceptor bindings linked to the bindings they imply.
struct BindingClosure<'d> {
    annotations: &'d HashMap<TypeName, AnnotationDecl>,
}

impl GraphTraversal for BindingClosure<'_> {
    type Node = QualifierInstance;

    fn neighbors(&self, node: &QualifierInstance) -> Vec<QualifierInstance> {
        self.annotations
            .get(&node.name)
            .map(|decl| decl.implies.clone())
            .unwrap_or_default()
    }

    fn contains_node(&self, node: &QualifierInstance) -> bool {
        self.annotations.contains_key(&node.name)
    }
}

pub struct InterceptorResolver<'c, 'd> {
    ctx: &'c PassContext<'d>,
}

impl<'c, 'd> InterceptorResolver<'c, 'd> {
    pub fn new(ctx: &'c PassContext<'d>) -> Self {
        Self { ctx }
    }

    /// Bindings plus everything they transitively imply, in a stable order.
    pub fn expand_bindings(&self, bindings: &[QualifierInstance]) -> Vec<QualifierInstance> {
        let closure = BindingClosure {
            annotations: self.ctx.deployment.annotations(),
        };
        let mut expanded: Vec<QualifierInstance> = closure.reachable_from(bindings.iter().cloned()).into_iter().collect();
        expanded.sort();
        expanded
    }

    /// Interceptors supporting `kind` bound through `bindings`, ordered by
    /// ascending priority.
    pub fn resolve(&self, kind: InterceptionKind, bindings: &[QualifierInstance]) -> Vec<&'d InterceptorDecl> {
        if bindings.is_empty() {
            return Vec::new();
        }
        let expanded = self.expand_bindings(bindings);
        let mut matched: Vec<&'d InterceptorDecl> = self
            .ctx
            .deployment
            .interceptors()
            .iter()
            .filter(|i| i.intercepts(kind))
            .filter(|i| {
                i.bindings
                    .iter()
                    .any(|b| expanded.iter().any(|e| self.ctx.qualifiers.matches(b, e)))
            })
            .collect();
        // Stable: equal priorities keep declaration order
        matched.sort_by_key(|i| i.priority);
        matched
    }

    /// Lifecycle chains from class-level bindings and around-invoke chains
    /// per declared method. Only class-derived components are intercepted.
    pub fn chains_for(&self, component: &Component) -> InterceptionChains {
        let mut chains = InterceptionChains::default();
        if !component.is_class() {
            return chains;
        }
        for kind in InterceptionKind::LIFECYCLE {
            let chain = ids(self.resolve(kind, component.bindings()));
            if !chain.is_empty() {
                chains.lifecycle.insert(kind, chain);
            }
        }
        let mut methods = BTreeMap::new();
        for method in component.methods() {
            let bindings = merge_bindings(component.bindings(), &method.bindings);
            let chain = ids(self.resolve(InterceptionKind::AroundInvoke, &bindings));
            if !chain.is_empty() {
                methods.insert(method.name.clone(), chain);
            }
        }
        chains.methods = methods;
        chains
    }
}

fn ids(interceptors: Vec<&InterceptorDecl>) -> Vec<DeclId> {
    interceptors.into_iter().map(|i| i.id.clone()).collect()
}

/// Method-level bindings replace class-level bindings of the same annotation.
fn merge_bindings(class_level: &[QualifierInstance], method_level: &[QualifierInstance]) -> Vec<QualifierInstance> {
    let mut merged = method_level.to_vec();
    merged.extend(
        class_level
            .iter()
            .filter(|c| !method_level.iter().any(|m| m.name == c.name))
            .cloned(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::Deployment;
    use crate::model::{AnnotationValue, DeclarationSnapshot, MemberDecl, TypeDecl, TypeRef};

    fn logged() -> QualifierInstance {
        QualifierInstance::new("Logged")
    }

    fn snapshot() -> DeclarationSnapshot {
        let mut s = DeclarationSnapshot::new();
        s.add_type(TypeDecl::new("Shop"))
            .add_annotation(AnnotationDecl::interceptor_binding("Audited"))
            .add_annotation(AnnotationDecl::interceptor_binding("Logged").implies(QualifierInstance::new("Audited")))
            .add_annotation(
                AnnotationDecl::interceptor_binding("Timed")
                    .member(MemberDecl::new("unit").with_default(AnnotationValue::Str("ms".into()))),
            )
            .add_interceptor(
                InterceptorDecl::new("A", 10)
                    .binding(logged())
                    .hook(InterceptionKind::AroundInvoke)
                    .hook(InterceptionKind::PostConstruct),
            )
            .add_interceptor(InterceptorDecl::new("B", 5).binding(logged()).hook(InterceptionKind::AroundInvoke))
            .add_interceptor(
                InterceptorDecl::new("AuditInterceptor", 20)
                    .binding(QualifierInstance::new("Audited"))
                    .hook(InterceptionKind::AroundInvoke),
            )
            .add_interceptor(
                InterceptorDecl::new("SecondsTimer", 1)
                    .binding(QualifierInstance::new("Timed").with("unit", AnnotationValue::Str("s".into())))
                    .hook(InterceptionKind::AroundInvoke),
            );
        s
    }

    #[test]
    fn test_ascending_priority() {
        let d = Deployment::build(&snapshot()).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = InterceptorResolver::new(&ctx);
        let chain: Vec<&str> = resolver
            .resolve(InterceptionKind::AroundInvoke, &[logged()])
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(chain, vec!["B", "A", "AuditInterceptor"]);
    }

    #[test]
    fn test_transitive_binding() {
        let d = Deployment::build(&snapshot()).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = InterceptorResolver::new(&ctx);
        let expanded = resolver.expand_bindings(&[logged()]);
        assert_eq!(expanded, vec![QualifierInstance::new("Audited"), logged()]);
    }

    #[test]
    fn test_kind_filter_and_member_values() {
        let d = Deployment::build(&snapshot()).unwrap();
        let ctx = PassContext::new(&d);
        let resolver = InterceptorResolver::new(&ctx);
        let post: Vec<&str> = resolver
            .resolve(InterceptionKind::PostConstruct, &[logged()])
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(post, vec!["A"]);

        // Default unit is "ms", the interceptor requires "s"
        assert!(resolver
            .resolve(InterceptionKind::AroundInvoke, &[QualifierInstance::new("Timed")])
            .is_empty());
        assert!(resolver.resolve(InterceptionKind::AroundInvoke, &[]).is_empty());
    }

    #[test]
    fn test_chains_for_component() {
        let mut s = snapshot();
        s.add_component(
            Component::class("Shop", TypeRef::class("Shop"))
                .binding(logged())
                .method("checkout", [QualifierInstance::new("Timed").with("unit", AnnotationValue::Str("s".into()))])
                .method("browse", [])
                .done(),
        );
        let d = Deployment::build(&s).unwrap();
        let ctx = PassContext::new(&d);
        let chains = InterceptorResolver::new(&ctx).chains_for(d.component(&"Shop".into()).unwrap());

        assert_eq!(chains.lifecycle_chain(InterceptionKind::PostConstruct), &[DeclId::from("A")]);
        assert!(chains.lifecycle_chain(InterceptionKind::PreDestroy).is_empty());
        assert_eq!(
            chains.method_chain("checkout"),
            &[DeclId::from("SecondsTimer"), "B".into(), "A".into(), "AuditInterceptor".into()]
        );
        assert_eq!(chains.method_chain("browse").len(), 3);
    }

    #[test]
    fn test_method_binding_overrides_class_binding() {
        let class_level = vec![QualifierInstance::new("Timed")];
        let method_level = vec![QualifierInstance::new("Timed").with("unit", AnnotationValue::Str("s".into()))];
        assert_eq!(merge_bindings(&class_level, &method_level), method_level);
    }
}
