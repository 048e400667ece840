//! Declaration model consumed by a resolution pass.
//!
//! Declarations are plain data. Components and injection points are produced by
//! consuming builders (`done()`), so nothing mutates them once they are part of a
//! [`DeclarationSnapshot`].

pub mod annotation;
pub mod component;
pub mod injection;
pub mod interception;
pub mod snapshot;
pub mod types;

pub use annotation::{
    builtin_annotations, format_qualifiers, required_qualifiers, AnnotationDecl, AnnotationKind,
    AnnotationValue, MemberDecl, QualifierInstance, ANY_QUALIFIER, DEFAULT_QUALIFIER,
    NAMED_QUALIFIER,
};
pub use component::{Component, ComponentBuilder, ComponentKind, DeclId, MethodDecl, Scope};
pub use injection::{InjectionKind, InjectionOwner, InjectionPoint, InjectionPointBuilder, InjectionPointId};
pub use interception::{DecoratorDecl, InterceptionKind, InterceptorDecl, ObserverDecl};
pub use snapshot::DeclarationSnapshot;
pub use types::{TypeDecl, TypeName, TypeRef, TypeRegistry, PRIMITIVES, TOP_TYPE};
