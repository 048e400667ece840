//! Interceptor, decorator and observer declarations.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::annotation::QualifierInstance;
use super::component::DeclId;
use super::types::TypeRef;

/// Hook an interceptor can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterceptionKind {
    AroundInvoke,
    AroundConstruct,
    PostConstruct,
    PreDestroy,
}

impl InterceptionKind {
    /// Kinds resolved once per component from class-level bindings.
    pub const LIFECYCLE: [InterceptionKind; 3] = [
        InterceptionKind::PostConstruct,
        InterceptionKind::PreDestroy,
        InterceptionKind::AroundConstruct,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AroundInvoke => "AROUND_INVOKE",
            Self::AroundConstruct => "AROUND_CONSTRUCT",
            Self::PostConstruct => "POST_CONSTRUCT",
            Self::PreDestroy => "PRE_DESTROY",
        }
    }
}

impl fmt::Display for InterceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptorDecl {
    pub id: DeclId,
    #[serde(default)]
    pub bindings: Vec<QualifierInstance>,
    /// Lower value runs first (outermost)
    pub priority: i32,
    #[serde(default)]
    pub hooks: BTreeSet<InterceptionKind>,
}

impl InterceptorDecl {
    pub fn new(id: impl Into<DeclId>, priority: i32) -> Self {
        Self {
            id: id.into(),
            bindings: Vec::new(),
            priority,
            hooks: BTreeSet::new(),
        }
    }

    pub fn binding(mut self, binding: QualifierInstance) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn hook(mut self, kind: InterceptionKind) -> Self {
        self.hooks.insert(kind);
        self
    }

    pub fn intercepts(&self, kind: InterceptionKind) -> bool {
        self.hooks.contains(&kind)
    }
}

/// A decorator. Its delegate is the single `Delegate` injection point it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorDecl {
    pub id: DeclId,
    #[serde(default)]
    pub decorated_types: Vec<TypeRef>,
    pub priority: i32,
}

impl DecoratorDecl {
    pub fn new(id: impl Into<DeclId>, priority: i32) -> Self {
        Self {
            id: id.into(),
            decorated_types: Vec::new(),
            priority,
        }
    }

    pub fn decorates(mut self, ty: TypeRef) -> Self {
        self.decorated_types.push(ty);
        self
    }
}

/// Observer method declared on a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverDecl {
    pub declaring: DeclId,
    pub observed_type: TypeRef,
    #[serde(default)]
    pub qualifiers: Vec<QualifierInstance>,
}

impl ObserverDecl {
    pub fn new(declaring: impl Into<DeclId>, observed_type: TypeRef) -> Self {
        Self {
            declaring: declaring.into(),
            observed_type,
            qualifiers: Vec::new(),
        }
    }
}
