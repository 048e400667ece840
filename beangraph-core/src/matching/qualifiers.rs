//! Member-wise qualifier equivalence.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{required_qualifiers, AnnotationDecl, AnnotationValue, QualifierInstance, TypeName};

/// Compares qualifier and interceptor binding instances.
///
/// Two instances are equal when their annotation names match and every
/// binding member has the same value, falling back to declared defaults.
/// Members flagged non-binding on the declaration, or listed in the external
/// override set, are ignored.
#[derive(Debug, Clone, Copy)]
pub struct QualifierMatcher<'d> {
    annotations: &'d HashMap<TypeName, AnnotationDecl>,
    nonbinding: &'d BTreeMap<TypeName, BTreeSet<String>>,
}

impl<'d> QualifierMatcher<'d> {
    pub fn new(
        annotations: &'d HashMap<TypeName, AnnotationDecl>,
        nonbinding: &'d BTreeMap<TypeName, BTreeSet<String>>,
    ) -> Self {
        Self {
            annotations,
            nonbinding,
        }
    }

    pub fn is_nonbinding(&self, annotation: &TypeName, member: &str) -> bool {
        let declared = self
            .annotations
            .get(annotation)
            .and_then(|d| d.find_member(member))
            .map(|m| m.nonbinding)
            .unwrap_or(false);
        declared
            || self
                .nonbinding
                .get(annotation)
                .map(|members| members.contains(member))
                .unwrap_or(false)
    }

    pub fn matches(&self, required: &QualifierInstance, candidate: &QualifierInstance) -> bool {
        if required.name != candidate.name {
            return false;
        }
        let decl = self.annotations.get(&required.name);
        let mut members: BTreeSet<&str> = required
            .values
            .keys()
            .chain(candidate.values.keys())
            .map(String::as_str)
            .collect();
        if let Some(decl) = decl {
            members.extend(decl.members.iter().map(|m| m.name.as_str()));
        }
        members
            .into_iter()
            .filter(|member| !self.is_nonbinding(&required.name, member))
            .all(|member| value_or_default(decl, required, member) == value_or_default(decl, candidate, member))
    }

    /// `carried` contains an instance equal to `required`.
    pub fn has_qualifier(&self, carried: &[QualifierInstance], required: &QualifierInstance) -> bool {
        carried.iter().any(|c| self.matches(required, c))
    }

    /// Every qualifier in `required` is carried. No implicit defaults apply.
    pub fn carries_all(&self, required: &[QualifierInstance], carried: &[QualifierInstance]) -> bool {
        required.iter().all(|r| self.has_qualifier(carried, r))
    }

    /// A component carrying `carried` satisfies an injection point declaring
    /// `declared`; an empty declaration requires `{Default, Any}`.
    pub fn satisfies(&self, declared: &[QualifierInstance], carried: &[QualifierInstance]) -> bool {
        self.carries_all(&required_qualifiers(declared), carried)
    }
}

fn value_or_default<'a>(
    decl: Option<&'a AnnotationDecl>,
    instance: &'a QualifierInstance,
    member: &str,
) -> Option<&'a AnnotationValue> {
    instance
        .value(member)
        .or_else(|| decl.and_then(|d| d.find_member(member)).and_then(|m| m.default.as_ref()))
}
