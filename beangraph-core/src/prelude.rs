//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use beangraph_core::prelude::*;
//! ```

// Declarations
pub use crate::model::{
    AnnotationDecl, AnnotationValue, Component, DeclId, DeclarationSnapshot, DecoratorDecl, InjectionOwner,
    InjectionPoint, InterceptionKind, InterceptorDecl, MemberDecl, ObserverDecl, QualifierInstance, TypeDecl,
    TypeRef,
};

// Errors
pub use crate::error::{BeanGraphError, BeanGraphResult};

// Builder API
pub use crate::builder::{ResolutionOutcome, Resolver};

// Results
pub use crate::graph::{BindingGraph, Resolution};

// Extension points
pub use crate::reachability::UnusedExclusion;
pub use crate::resolve::{AlternativePriorities, PriorityOverrides};

// Configuration
pub use crate::config::{load_config, BeanGraphConfig};
