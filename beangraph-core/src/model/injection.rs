//! Injection point declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::annotation::{format_qualifiers, QualifierInstance};
use super::component::DeclId;
use super::types::TypeRef;

/// Position of an injection point in the deployment's injection point list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InjectionPointId(pub usize);

impl fmt::Display for InjectionPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declaration that owns an injection point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner", content = "id", rename_all = "snake_case")]
pub enum InjectionOwner {
    Component(DeclId),
    Interceptor(DeclId),
    Decorator(DeclId),
    /// Disposer method declared on a component
    Disposer(DeclId),
    /// Invoker targeting a component's method
    Invoker(DeclId),
    /// Observer method declared on a component
    Observer(DeclId),
}

impl InjectionOwner {
    /// The declaration the owning member lives on.
    pub fn declaring_id(&self) -> &DeclId {
        match self {
            Self::Component(id)
            | Self::Interceptor(id)
            | Self::Decorator(id)
            | Self::Disposer(id)
            | Self::Invoker(id)
            | Self::Observer(id) => id,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Component(_) => "component",
            Self::Interceptor(_) => "interceptor",
            Self::Decorator(_) => "decorator",
            Self::Disposer(_) => "disposer",
            Self::Invoker(_) => "invoker",
            Self::Observer(_) => "observer",
        }
    }
}

impl fmt::Display for InjectionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind_str(), self.declaring_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionKind {
    Field,
    ConstructorParam,
    MethodParam,
    /// Decorator delegate
    Delegate,
    /// Programmatic lookup wrapper; the required type is the looked-up element type
    Lookup,
}

impl InjectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::ConstructorParam => "constructor parameter",
            Self::MethodParam => "method parameter",
            Self::Delegate => "delegate",
            Self::Lookup => "lookup",
        }
    }
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionPoint {
    pub(crate) owner: InjectionOwner,
    pub(crate) kind: InjectionKind,
    pub(crate) required_type: TypeRef,
    #[serde(default)]
    pub(crate) qualifiers: Vec<QualifierInstance>,
    /// Member the point belongs to (field or parameter description)
    #[serde(default)]
    pub(crate) member: Option<String>,
}

impl InjectionPoint {
    pub fn field(owner: InjectionOwner, required_type: TypeRef) -> InjectionPointBuilder {
        InjectionPointBuilder::new(owner, InjectionKind::Field, required_type)
    }

    pub fn constructor_param(owner: InjectionOwner, required_type: TypeRef) -> InjectionPointBuilder {
        InjectionPointBuilder::new(owner, InjectionKind::ConstructorParam, required_type)
    }

    pub fn method_param(owner: InjectionOwner, required_type: TypeRef) -> InjectionPointBuilder {
        InjectionPointBuilder::new(owner, InjectionKind::MethodParam, required_type)
    }

    /// Delegate injection point of the decorator `decorator`.
    pub fn delegate(decorator: impl Into<DeclId>, delegate_type: TypeRef) -> InjectionPointBuilder {
        InjectionPointBuilder::new(
            InjectionOwner::Decorator(decorator.into()),
            InjectionKind::Delegate,
            delegate_type,
        )
    }

    /// Programmatic lookup of `element_type`.
    pub fn lookup(owner: InjectionOwner, element_type: TypeRef) -> InjectionPointBuilder {
        InjectionPointBuilder::new(owner, InjectionKind::Lookup, element_type)
    }

    pub fn owner(&self) -> &InjectionOwner {
        &self.owner
    }

    pub fn kind(&self) -> InjectionKind {
        self.kind
    }

    pub fn required_type(&self) -> &TypeRef {
        &self.required_type
    }

    pub fn qualifiers(&self) -> &[QualifierInstance] {
        &self.qualifiers
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn is_delegate(&self) -> bool {
        self.kind == InjectionKind::Delegate
    }

    pub fn is_lookup(&self) -> bool {
        self.kind == InjectionKind::Lookup
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match &self.member {
            Some(member) => format!("{} {}", self.kind.as_str(), member),
            None => format!("{} of type {}", self.kind.as_str(), self.required_type),
        }
    }
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {}",
            self.required_type,
            format_qualifiers(&self.qualifiers),
            self.owner
        )
    }
}

#[derive(Debug)]
#[must_use = "call done() to obtain the injection point"]
pub struct InjectionPointBuilder {
    point: InjectionPoint,
}

impl InjectionPointBuilder {
    fn new(owner: InjectionOwner, kind: InjectionKind, required_type: TypeRef) -> Self {
        Self {
            point: InjectionPoint {
                owner,
                kind,
                required_type,
                qualifiers: Vec::new(),
                member: None,
            },
        }
    }

    pub fn qualifier(mut self, qualifier: QualifierInstance) -> Self {
        self.point.qualifiers.push(qualifier);
        self
    }

    pub fn member(mut self, member: impl Into<String>) -> Self {
        self.point.member = Some(member.into());
        self
    }

    pub fn done(self) -> InjectionPoint {
        self.point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaring_id_for_every_owner() {
        let id = DeclId::from("Owner");
        for owner in [
            InjectionOwner::Component(id.clone()),
            InjectionOwner::Interceptor(id.clone()),
            InjectionOwner::Decorator(id.clone()),
            InjectionOwner::Disposer(id.clone()),
            InjectionOwner::Invoker(id.clone()),
            InjectionOwner::Observer(id.clone()),
        ] {
            assert_eq!(owner.declaring_id(), &id);
        }
    }

    #[test]
    fn test_delegate_builder() {
        let ip = InjectionPoint::delegate("Deco", TypeRef::class("Service"))
            .member("delegate")
            .done();
        assert!(ip.is_delegate());
        assert_eq!(ip.owner(), &InjectionOwner::Decorator("Deco".into()));
        assert_eq!(ip.describe(), "delegate delegate");
    }

    #[test]
    fn test_owner_serde_shape() {
        let owner = InjectionOwner::Observer("Listener".into());
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["owner"], "observer");
        assert_eq!(json["id"], "Listener");
    }
}
