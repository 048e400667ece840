//! Type matching between required types and bean types.
//!
//! Two rule sets exist: the standard rules used by ordinary injection points
//! and the delegate rules used by decorator delegates, which additionally
//! relate type variables in both directions.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::model::{TypeRef, TypeRegistry};

/// Nesting limit for recursive argument and bound checks.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleSet {
    Standard,
    Delegate,
}

type CacheKey = (RuleSet, TypeRef, TypeRef);

/// Decides whether a candidate type satisfies a required type.
///
/// Results of top-level queries are memoised for the lifetime of the matcher.
/// The cache is read-mostly and shared by the resolution workers.
#[derive(Debug)]
pub struct TypeMatcher<'r> {
    registry: &'r TypeRegistry,
    cache: RwLock<HashMap<CacheKey, bool>>,
}

impl<'r> TypeMatcher<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Standard rules.
    pub fn satisfies(&self, required: &TypeRef, candidate: &TypeRef) -> bool {
        self.matches(RuleSet::Standard, required, candidate)
    }

    /// Delegate rules.
    pub fn satisfies_delegate(&self, required: &TypeRef, candidate: &TypeRef) -> bool {
        self.matches(RuleSet::Delegate, required, candidate)
    }

    /// True when some type in `candidates` satisfies `required`.
    pub fn satisfies_any(&self, rules: RuleSet, required: &TypeRef, candidates: &[TypeRef]) -> bool {
        candidates.iter().any(|c| self.matches(rules, required, c))
    }

    pub fn matches(&self, rules: RuleSet, required: &TypeRef, candidate: &TypeRef) -> bool {
        let key = (rules, required.clone(), candidate.clone());
        if let Some(&hit) = self.cache.read().get(&key) {
            return hit;
        }
        let result = self.match_types(rules, required, candidate, 0);
        self.cache.write().insert(key, result);
        result
    }

    /// `from` can be used where `to` is expected.
    pub fn is_assignable(&self, to: &TypeRef, from: &TypeRef) -> bool {
        self.assignable(to, from, 0)
    }

    /// Number of memoised queries.
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    fn match_types(&self, rules: RuleSet, required: &TypeRef, candidate: &TypeRef, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if required == candidate || required.is_top() {
            return true;
        }
        match (required, candidate) {
            (TypeRef::Class { name: a }, TypeRef::Class { name: b }) => a == b,
            (TypeRef::Array { component: a }, TypeRef::Array { component: b }) => {
                self.match_types(rules, a, b, depth + 1)
            }
            (
                TypeRef::Parameterized { raw: r1, args: a1 },
                TypeRef::Parameterized { raw: r2, args: a2 },
            ) => {
                r1 == r2
                    && a1.len() == a2.len()
                    && a1
                        .iter()
                        .zip(a2)
                        .all(|(r, c)| self.arguments_match(rules, r, c, depth + 1))
            }
            // Raw usage of a generic type
            (TypeRef::Class { name }, TypeRef::Parameterized { raw, args })
            | (TypeRef::Parameterized { raw, args }, TypeRef::Class { name }) => {
                name == raw && args.iter().all(|a| a.is_top() || a.is_unbounded_variable())
            }
            _ => false,
        }
    }

    fn arguments_match(&self, rules: RuleSet, required: &TypeRef, candidate: &TypeRef, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        match (required, candidate) {
            (r, c) if r.is_actual() && c.is_actual() => self.match_types(rules, r, c, depth + 1),
            (TypeRef::Wildcard { upper, lower }, c) if c.is_actual() => {
                upper.as_deref().map_or(true, |u| self.assignable(u, c, depth + 1))
                    && lower.as_deref().map_or(true, |l| self.assignable(c, l, depth + 1))
            }
            (TypeRef::Wildcard { upper, lower }, c @ TypeRef::Variable { .. }) => {
                let bounds = c.variable_bounds();
                match rules {
                    RuleSet::Standard => {
                        bounds.iter().all(|b| {
                            upper.as_deref().map_or(true, |u| self.assignable(u, b, depth + 1))
                                && lower.as_deref().map_or(true, |l| self.assignable(b, l, depth + 1))
                        })
                    }
                    RuleSet::Delegate => bounds.iter().all(|b| {
                        upper
                            .as_deref()
                            .map_or(true, |u| self.related(u, b, depth + 1))
                            && lower
                                .as_deref()
                                .map_or(true, |l| self.related(l, b, depth + 1))
                    }),
                }
            }
            (r @ TypeRef::Variable { .. }, c @ TypeRef::Variable { .. }) => {
                let candidate_bounds = c.variable_bounds();
                r.variable_bounds().iter().all(|rb| {
                    candidate_bounds
                        .iter()
                        .any(|cb| self.assignable(rb, cb, depth + 1))
                })
            }
            (r @ TypeRef::Variable { .. }, c) if rules == RuleSet::Delegate && c.is_actual() => r
                .variable_bounds()
                .iter()
                .all(|rb| self.assignable(rb, c, depth + 1)),
            _ => false,
        }
    }

    fn related(&self, a: &TypeRef, b: &TypeRef, depth: usize) -> bool {
        self.assignable(a, b, depth) || self.assignable(b, a, depth)
    }

    fn assignable(&self, to: &TypeRef, from: &TypeRef, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if to.is_top() {
            return true;
        }
        self.registry
            .type_closure(from)
            .iter()
            .any(|t| self.match_types(RuleSet::Standard, to, t, depth + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDecl;

    fn registry() -> TypeRegistry {
        TypeRegistry::new([
            TypeDecl::new("Number"),
            TypeDecl::new("Integer").extends(TypeRef::class("Number")),
            TypeDecl::new("String"),
            TypeDecl::new("List").type_param("E"),
            TypeDecl::new("ArrayList")
                .type_param("E")
                .extends(TypeRef::parameterized("List", [TypeRef::variable("E")])),
        ])
    }

    fn list(arg: TypeRef) -> TypeRef {
        TypeRef::parameterized("List", [arg])
    }

    #[test]
    fn test_top_type_absorbs_everything() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        for candidate in [
            TypeRef::class("String"),
            list(TypeRef::class("Integer")),
            TypeRef::array(TypeRef::class("int")),
            TypeRef::variable("T"),
        ] {
            assert!(m.satisfies(&TypeRef::top(), &candidate), "{}", candidate);
        }
    }

    #[test]
    fn test_reflexive() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        for ty in [
            TypeRef::class("Number"),
            list(TypeRef::extends(TypeRef::class("Number"))),
            TypeRef::bounded_variable("T", [TypeRef::class("Number")]),
            TypeRef::array(list(TypeRef::class("String"))),
        ] {
            assert!(m.satisfies(&ty, &ty), "{}", ty);
            assert!(m.satisfies_delegate(&ty, &ty), "{}", ty);
        }
    }

    #[test]
    fn test_class_names_must_be_identical() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        assert!(!m.satisfies(&TypeRef::class("Number"), &TypeRef::class("Integer")));
    }

    #[test]
    fn test_parameterized_arguments() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        assert!(m.satisfies(&list(TypeRef::class("String")), &list(TypeRef::class("String"))));
        assert!(!m.satisfies(&list(TypeRef::class("String")), &list(TypeRef::class("Integer"))));
        assert!(!m.satisfies(
            &TypeRef::parameterized("ArrayList", [TypeRef::class("String")]),
            &list(TypeRef::class("String"))
        ));
    }

    #[test]
    fn test_wildcard_bounds() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        let extends_number = list(TypeRef::extends(TypeRef::class("Number")));
        assert!(m.satisfies(&extends_number, &list(TypeRef::class("Integer"))));
        assert!(!m.satisfies(&extends_number, &list(TypeRef::class("String"))));

        let super_integer = list(TypeRef::super_of(TypeRef::class("Integer")));
        assert!(m.satisfies(&super_integer, &list(TypeRef::class("Number"))));
        assert!(!m.satisfies(&super_integer, &list(TypeRef::class("String"))));

        assert!(m.satisfies(&list(TypeRef::wildcard()), &list(TypeRef::class("String"))));
    }

    #[test]
    fn test_wildcard_against_variable() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        let bounded = list(TypeRef::bounded_variable("T", [TypeRef::class("Integer")]));
        assert!(m.satisfies(&list(TypeRef::extends(TypeRef::class("Number"))), &bounded));
        assert!(!m.satisfies(&list(TypeRef::extends(TypeRef::class("Number"))), &list(TypeRef::variable("T"))));
        // Delegate rules accept bounds related in the other direction
        let number_var = list(TypeRef::bounded_variable("T", [TypeRef::class("Number")]));
        assert!(!m.satisfies(&list(TypeRef::extends(TypeRef::class("Integer"))), &number_var));
        assert!(m.satisfies_delegate(&list(TypeRef::extends(TypeRef::class("Integer"))), &number_var));
    }

    #[test]
    fn test_variable_rules() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        let required = list(TypeRef::bounded_variable("T", [TypeRef::class("Number")]));
        let candidate = list(TypeRef::bounded_variable("U", [TypeRef::class("Integer")]));
        assert!(m.satisfies(&required, &candidate));
        assert!(!m.satisfies(&candidate, &required));

        // Variable against an actual type is only legal for delegates
        let actual = list(TypeRef::class("Integer"));
        assert!(!m.satisfies(&required, &actual));
        assert!(m.satisfies_delegate(&required, &actual));
        assert!(!m.satisfies_delegate(&required, &list(TypeRef::class("String"))));
    }

    #[test]
    fn test_raw_and_parameterized() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        assert!(m.satisfies(&TypeRef::class("List"), &list(TypeRef::variable("E"))));
        assert!(m.satisfies(&list(TypeRef::top()), &TypeRef::class("List")));
        assert!(!m.satisfies(&TypeRef::class("List"), &list(TypeRef::class("String"))));
    }

    #[test]
    fn test_arrays() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        assert!(m.satisfies(
            &TypeRef::array(TypeRef::class("String")),
            &TypeRef::array(TypeRef::class("String"))
        ));
        assert!(!m.satisfies(
            &TypeRef::array(TypeRef::class("String")),
            &TypeRef::array(TypeRef::class("int"))
        ));
    }

    #[test]
    fn test_assignability_walks_generic_supertypes() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        let array_list = TypeRef::parameterized("ArrayList", [TypeRef::class("Integer")]);
        assert!(m.is_assignable(&list(TypeRef::class("Integer")), &array_list));
        assert!(!m.is_assignable(&list(TypeRef::class("String")), &array_list));
        assert!(m.is_assignable(&TypeRef::class("Number"), &TypeRef::class("Integer")));
        assert!(!m.is_assignable(&TypeRef::class("Integer"), &TypeRef::class("Number")));
    }

    #[test]
    fn test_results_are_memoised() {
        let reg = registry();
        let m = TypeMatcher::new(&reg);
        m.satisfies(&TypeRef::class("Number"), &TypeRef::class("Number"));
        m.satisfies(&TypeRef::class("Number"), &TypeRef::class("Number"));
        m.satisfies_delegate(&TypeRef::class("Number"), &TypeRef::class("Number"));
        assert_eq!(m.cache_len(), 2);
    }
}
