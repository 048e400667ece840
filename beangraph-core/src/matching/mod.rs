//! Type and qualifier matching.

pub mod qualifiers;
pub mod types;

pub use qualifiers::QualifierMatcher;
pub use types::{RuleSet, TypeMatcher};
