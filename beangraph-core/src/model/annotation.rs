//! Qualifier and interceptor binding annotations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::TypeName;

/// Built-in qualifier applied when nothing else is declared.
pub const DEFAULT_QUALIFIER: &str = "Default";
/// Built-in qualifier every component carries.
pub const ANY_QUALIFIER: &str = "Any";
/// Built-in qualifier carrying the component name.
pub const NAMED_QUALIFIER: &str = "Named";

/// Value of an annotation member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Enum constant name
    Enum(String),
    Class(TypeName),
    Array(Vec<AnnotationValue>),
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Enum(e) => f.write_str(e),
            Self::Class(c) => write!(f, "{}.class", c),
            Self::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// An annotation use: qualifier on a component or injection point, or an
/// interceptor binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifierInstance {
    pub name: TypeName,
    #[serde(default)]
    pub values: BTreeMap<String, AnnotationValue>,
}

impl QualifierInstance {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, member: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.insert(member.into(), value);
        self
    }

    pub fn default_qualifier() -> Self {
        Self::new(DEFAULT_QUALIFIER)
    }

    pub fn any() -> Self {
        Self::new(ANY_QUALIFIER)
    }

    pub fn named(value: impl Into<String>) -> Self {
        Self::new(NAMED_QUALIFIER).with("value", AnnotationValue::Str(value.into()))
    }

    pub fn value(&self, member: &str) -> Option<&AnnotationValue> {
        self.values.get(member)
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.as_str() == name
    }
}

impl fmt::Display for QualifierInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.values.is_empty() {
            f.write_str("(")?;
            for (i, (member, value)) in self.values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", member, value)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Render a qualifier set as `[@A, @B(x=1)]`.
pub fn format_qualifiers(qualifiers: &[QualifierInstance]) -> String {
    let parts: Vec<String> = qualifiers.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Qualifiers an injection point effectively requires: `{Default, Any}` when
/// it declares none.
pub fn required_qualifiers(declared: &[QualifierInstance]) -> Vec<QualifierInstance> {
    if declared.is_empty() {
        vec![QualifierInstance::default_qualifier(), QualifierInstance::any()]
    } else {
        declared.to_vec()
    }
}

/// Complete a component's declared qualifiers: `Any` is always present and
/// `Default` is added unless a qualifier other than `Named`/`Any` is declared.
pub fn normalize_component_qualifiers(qualifiers: &mut Vec<QualifierInstance>) {
    let has_custom = qualifiers
        .iter()
        .any(|q| !q.is(NAMED_QUALIFIER) && !q.is(ANY_QUALIFIER));
    if !has_custom && !qualifiers.iter().any(|q| q.is(DEFAULT_QUALIFIER)) {
        qualifiers.push(QualifierInstance::default_qualifier());
    }
    if !qualifiers.iter().any(|q| q.is(ANY_QUALIFIER)) {
        qualifiers.push(QualifierInstance::any());
    }
    qualifiers.sort();
    qualifiers.dedup();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Qualifier,
    InterceptorBinding,
}

/// Declared member of an annotation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    #[serde(default)]
    pub default: Option<AnnotationValue>,
    /// Ignored when comparing instances
    #[serde(default)]
    pub nonbinding: bool,
}

impl MemberDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            nonbinding: false,
        }
    }

    pub fn with_default(mut self, value: AnnotationValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn nonbinding(mut self) -> Self {
        self.nonbinding = true;
        self
    }
}

/// Declaration of a qualifier or interceptor binding annotation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDecl {
    pub name: TypeName,
    pub kind: AnnotationKind,
    #[serde(default)]
    pub members: Vec<MemberDecl>,
    /// Bindings this interceptor binding is itself annotated with
    #[serde(default)]
    pub implies: Vec<QualifierInstance>,
}

impl AnnotationDecl {
    pub fn qualifier(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            kind: AnnotationKind::Qualifier,
            members: Vec::new(),
            implies: Vec::new(),
        }
    }

    pub fn interceptor_binding(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            kind: AnnotationKind::InterceptorBinding,
            members: Vec::new(),
            implies: Vec::new(),
        }
    }

    pub fn member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    pub fn implies(mut self, binding: QualifierInstance) -> Self {
        self.implies.push(binding);
        self
    }

    pub fn find_member(&self, name: &str) -> Option<&MemberDecl> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Qualifier declarations registered for every deployment.
pub fn builtin_annotations() -> Vec<AnnotationDecl> {
    vec![
        AnnotationDecl::qualifier(DEFAULT_QUALIFIER),
        AnnotationDecl::qualifier(ANY_QUALIFIER),
        AnnotationDecl::qualifier(NAMED_QUALIFIER)
            .member(MemberDecl::new("value").with_default(AnnotationValue::Str(String::new()))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_instance() {
        let q = QualifierInstance::new("Color")
            .with("value", AnnotationValue::Enum("RED".into()))
            .with("weight", AnnotationValue::Int(3));
        assert_eq!(q.to_string(), "@Color(value=RED, weight=3)");
        assert_eq!(format_qualifiers(&[QualifierInstance::any()]), "[@Any]");
    }

    #[test]
    fn test_normalize_empty_qualifiers() {
        let mut qualifiers = Vec::new();
        normalize_component_qualifiers(&mut qualifiers);
        assert_eq!(qualifiers.len(), 2);
        assert!(qualifiers.iter().any(|q| q.is(DEFAULT_QUALIFIER)));
        assert!(qualifiers.iter().any(|q| q.is(ANY_QUALIFIER)));
    }

    #[test]
    fn test_normalize_named_keeps_default() {
        let mut qualifiers = vec![QualifierInstance::named("cache")];
        normalize_component_qualifiers(&mut qualifiers);
        assert!(qualifiers.iter().any(|q| q.is(DEFAULT_QUALIFIER)));
        assert_eq!(qualifiers.len(), 3);
    }

    #[test]
    fn test_normalize_custom_drops_default() {
        let mut qualifiers = vec![QualifierInstance::new("Fast")];
        normalize_component_qualifiers(&mut qualifiers);
        assert!(!qualifiers.iter().any(|q| q.is(DEFAULT_QUALIFIER)));
        assert!(qualifiers.iter().any(|q| q.is(ANY_QUALIFIER)));
    }

    #[test]
    fn test_required_qualifiers_default() {
        let required = required_qualifiers(&[]);
        assert_eq!(
            required,
            vec![QualifierInstance::default_qualifier(), QualifierInstance::any()]
        );
    }
}
