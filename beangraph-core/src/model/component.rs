//! Component (bean) declarations and their builder.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::annotation::{normalize_component_qualifiers, QualifierInstance, NAMED_QUALIFIER};
use super::types::TypeRef;

/// Identity of a declaration; unique across components, interceptors and decorators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(String);

impl DeclId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeclId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeclId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque scope annotation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    pub const DEPENDENT: &'static str = "Dependent";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self(Self::DEPENDENT.to_string())
    }
}

/// How a component was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Class,
    ProducerMethod,
    ProducerField,
    Synthetic,
}

impl ComponentKind {
    pub fn is_producer(self) -> bool {
        matches!(self, Self::ProducerMethod | Self::ProducerField)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "CLASS",
            Self::ProducerMethod => "PRODUCER_METHOD",
            Self::ProducerField => "PRODUCER_FIELD",
            Self::Synthetic => "SYNTHETIC",
        }
    }
}

/// A business method of a class-derived component with its own interceptor bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub bindings: Vec<QualifierInstance>,
}

/// A declared component. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub(crate) id: DeclId,
    pub(crate) kind: ComponentKind,
    pub(crate) provider_type: TypeRef,
    /// Exposed types; computed from the provider type's closure when left empty
    #[serde(default)]
    pub(crate) bean_types: Vec<TypeRef>,
    #[serde(default)]
    pub(crate) scope: Scope,
    #[serde(default)]
    pub(crate) qualifiers: Vec<QualifierInstance>,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) alternative: bool,
    #[serde(default)]
    pub(crate) priority: Option<i32>,
    #[serde(default)]
    pub(crate) unremovable: bool,
    #[serde(default)]
    pub(crate) declaring: Option<DeclId>,
    /// Class-level interceptor bindings
    #[serde(default)]
    pub(crate) bindings: Vec<QualifierInstance>,
    #[serde(default)]
    pub(crate) methods: Vec<MethodDecl>,
}

impl Component {
    /// Start a class-derived component.
    pub fn class(id: impl Into<DeclId>, provider_type: TypeRef) -> ComponentBuilder {
        ComponentBuilder::new(id.into(), ComponentKind::Class, provider_type)
    }

    /// Start a producer-method component owned by `declaring`.
    pub fn producer_method(
        id: impl Into<DeclId>,
        declaring: impl Into<DeclId>,
        produced_type: TypeRef,
    ) -> ComponentBuilder {
        ComponentBuilder::new(id.into(), ComponentKind::ProducerMethod, produced_type)
            .declared_by(declaring)
    }

    /// Start a producer-field component owned by `declaring`.
    pub fn producer_field(
        id: impl Into<DeclId>,
        declaring: impl Into<DeclId>,
        produced_type: TypeRef,
    ) -> ComponentBuilder {
        ComponentBuilder::new(id.into(), ComponentKind::ProducerField, produced_type)
            .declared_by(declaring)
    }

    /// Start a synthetic component registered programmatically.
    pub fn synthetic(id: impl Into<DeclId>, provider_type: TypeRef) -> ComponentBuilder {
        ComponentBuilder::new(id.into(), ComponentKind::Synthetic, provider_type)
    }

    pub fn id(&self) -> &DeclId {
        &self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn provider_type(&self) -> &TypeRef {
        &self.provider_type
    }

    pub fn bean_types(&self) -> &[TypeRef] {
        &self.bean_types
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn qualifiers(&self) -> &[QualifierInstance] {
        &self.qualifiers
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_alternative(&self) -> bool {
        self.alternative
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn is_unremovable(&self) -> bool {
        self.unremovable
    }

    pub fn declaring(&self) -> Option<&DeclId> {
        self.declaring.as_ref()
    }

    pub fn bindings(&self) -> &[QualifierInstance] {
        &self.bindings
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    pub fn is_producer(&self) -> bool {
        self.kind.is_producer()
    }

    pub fn is_class(&self) -> bool {
        self.kind == ComponentKind::Class
    }

    /// Apply qualifier defaults and the `Named` qualifier. Idempotent.
    pub(crate) fn normalize(&mut self) {
        if let Some(name) = &self.name {
            if !self.qualifiers.iter().any(|q| q.is(NAMED_QUALIFIER)) {
                self.qualifiers.push(QualifierInstance::named(name.clone()));
            }
        }
        normalize_component_qualifiers(&mut self.qualifiers);
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} component {} [types={}, qualifiers={}",
            self.kind.as_str(),
            self.id,
            self.bean_types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            super::annotation::format_qualifiers(&self.qualifiers)
        )?;
        if let Some(declaring) = &self.declaring {
            write!(f, ", declaringComponent={}", declaring)?;
        }
        f.write_str("]")
    }
}

/// Collects component attributes; `done()` consumes it and yields the immutable component.
#[derive(Debug)]
#[must_use = "call done() to obtain the component"]
pub struct ComponentBuilder {
    component: Component,
}

impl ComponentBuilder {
    fn new(id: DeclId, kind: ComponentKind, provider_type: TypeRef) -> Self {
        Self {
            component: Component {
                id,
                kind,
                provider_type,
                bean_types: Vec::new(),
                scope: Scope::default(),
                qualifiers: Vec::new(),
                name: None,
                alternative: false,
                priority: None,
                unremovable: false,
                declaring: None,
                bindings: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn bean_type(mut self, ty: TypeRef) -> Self {
        if !self.component.bean_types.contains(&ty) {
            self.component.bean_types.push(ty);
        }
        self
    }

    pub fn bean_types(self, types: impl IntoIterator<Item = TypeRef>) -> Self {
        types.into_iter().fold(self, |b, t| b.bean_type(t))
    }

    pub fn qualifier(mut self, qualifier: QualifierInstance) -> Self {
        self.component.qualifiers.push(qualifier);
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.component.scope = Scope::new(scope);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.component.name = Some(name.into());
        self
    }

    /// Mark as alternative, optionally with a priority.
    pub fn alternative(mut self, priority: Option<i32>) -> Self {
        self.component.alternative = true;
        if priority.is_some() {
            self.component.priority = priority;
        }
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.component.priority = Some(priority);
        self
    }

    pub fn unremovable(mut self) -> Self {
        self.component.unremovable = true;
        self
    }

    pub fn declared_by(mut self, declaring: impl Into<DeclId>) -> Self {
        self.component.declaring = Some(declaring.into());
        self
    }

    pub fn binding(mut self, binding: QualifierInstance) -> Self {
        self.component.bindings.push(binding);
        self
    }

    pub fn method(mut self, name: impl Into<String>, bindings: impl IntoIterator<Item = QualifierInstance>) -> Self {
        self.component.methods.push(MethodDecl {
            name: name.into(),
            bindings: bindings.into_iter().collect(),
        });
        self
    }

    pub fn done(self) -> Component {
        let mut component = self.component;
        component.normalize();
        component
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::annotation::{ANY_QUALIFIER, DEFAULT_QUALIFIER};

    #[test]
    fn test_builder_defaults() {
        let c = Component::class("Foo", TypeRef::class("Foo")).done();
        assert_eq!(c.kind(), ComponentKind::Class);
        assert_eq!(c.scope().as_str(), Scope::DEPENDENT);
        assert_eq!(c.qualifiers().len(), 2);
        assert!(c.qualifiers().iter().any(|q| q.is(DEFAULT_QUALIFIER)));
        assert!(c.qualifiers().iter().any(|q| q.is(ANY_QUALIFIER)));
        assert!(!c.is_alternative());
    }

    #[test]
    fn test_named_adds_qualifier() {
        let c = Component::class("Foo", TypeRef::class("Foo"))
            .named("foo")
            .done();
        assert_eq!(c.name(), Some("foo"));
        assert!(c.qualifiers().contains(&QualifierInstance::named("foo")));
    }

    #[test]
    fn test_producer_has_declaring() {
        let p = Component::producer_method("Owner#create", "Owner", TypeRef::class("Conn")).done();
        assert!(p.is_producer());
        assert_eq!(p.declaring(), Some(&DeclId::from("Owner")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut c = Component::class("Foo", TypeRef::class("Foo")).named("foo").done();
        let before = c.qualifiers().to_vec();
        c.normalize();
        assert_eq!(c.qualifiers(), before.as_slice());
    }
}
