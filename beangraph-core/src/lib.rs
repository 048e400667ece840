//! beangraph-core: build-time resolution for a declarative component-injection model
//!
//! Given a closed set of declared components, their injection points,
//! interceptors, decorators and qualifier metadata, a single deterministic
//! pass computes:
//!
//! - which component satisfies each injection point, with precise errors
//!   for unsatisfied and ambiguous dependencies
//! - the ordered interceptor and decorator chains of every component
//! - the components that nothing can reach and that may be removed
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use beangraph_core::prelude::*;
//!
//! let snapshot = DeclarationSnapshot::load(Path::new("snapshot.json"))?;
//! let outcome = Resolver::new(snapshot).run()?.into_result()?;
//!
//! for id in &outcome.removable {
//!     println!("Unused component: {}", id);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`model`]: Declaration data model and JSON snapshots
//! - [`deployment`]: Validation and indexing of a snapshot
//! - [`matching`]: Type and qualifier matching
//! - [`resolve`]: Bean, interceptor and decorator resolution
//! - [`graph`]: The binding graph produced by a pass
//! - [`reachability`]: Unused component detection
//! - [`builder`]: Fluent API running the whole pass
//! - [`error`]: Typed error handling
//!
//! # Cargo Features
//!
//! - `dot` (default): Graphviz DOT output
//! - `parallel` (default): Resolve injection points on the rayon pool
//! - `full`: Enable all optional features

pub mod builder;
pub mod common;
pub mod config;
pub mod context;
pub mod deployment;
pub mod error;
pub mod graph;
pub mod logging;
pub mod matching;
pub mod model;
pub mod prelude;
pub mod reachability;
pub mod report;
pub mod resolve;

#[cfg(feature = "dot")]
pub mod visualize;

pub use common::GraphTraversal;

// ============================================================================
// Explicit Re-exports
// ============================================================================

// Error types
pub use error::{BeanGraphError, BeanGraphResult, IoResultExt};

// Builder API
pub use builder::{OutcomeStats, ResolutionOutcome, Resolver};

// Configuration
pub use config::{load_config, load_config_file, BeanGraphConfig, OutputConfig, CONFIG_FILE};

// Declarations
pub use deployment::Deployment;
pub use model::{
    AnnotationDecl, AnnotationKind, AnnotationValue, Component, ComponentKind, DeclId, DeclarationSnapshot,
    DecoratorDecl, InjectionKind, InjectionOwner, InjectionPoint, InjectionPointId, InterceptionKind,
    InterceptorDecl, MemberDecl, MethodDecl, ObserverDecl, QualifierInstance, Scope, TypeDecl, TypeName, TypeRef,
    TypeRegistry,
};

// Matching and resolution
pub use context::PassContext;
pub use matching::{QualifierMatcher, RuleSet, TypeMatcher};
pub use resolve::{
    AlternativePriorities, BeanResolver, DeclaredPriorities, DecoratorResolver, InterceptorResolver,
    PriorityOverrides,
};

// Results
pub use graph::{BindingGraph, InterceptionChains, Resolution, ResolvedInjection};
pub use reachability::{find_removable, PatternExclusion, UnusedExclusion};

// Logging
pub use logging::{init_structured_logging, log_problems, log_summary};

// Reporting
pub use report::{outcome_to_json, print_json, print_plain, render_plain};

#[cfg(feature = "dot")]
pub use visualize::generate_dot;
