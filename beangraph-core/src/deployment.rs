//! Validated, indexed view of a declaration snapshot.
//!
//! Building a [`Deployment`] is the graph-construction phase: malformed
//! declarations are reported as definition errors and left out, while an
//! inconsistent snapshot (a reference to a declaration that does not exist)
//! aborts with an internal error.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::common::GraphTraversal;
use crate::error::{BeanGraphError, BeanGraphResult};
use crate::model::{
    builtin_annotations, AnnotationDecl, AnnotationKind, Component, DeclId, DeclarationSnapshot,
    DecoratorDecl, InjectionKind, InjectionOwner, InjectionPoint, InjectionPointId, InterceptorDecl,
    ObserverDecl, QualifierInstance, TypeDecl, TypeName, TypeRef, TypeRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Component,
    Interceptor,
    Decorator,
}

impl DeclKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Interceptor => "interceptor",
            Self::Decorator => "decorator",
        }
    }
}

/// The declarations of one pass after validation.
#[derive(Debug)]
pub struct Deployment {
    registry: TypeRegistry,
    annotations: HashMap<TypeName, AnnotationDecl>,
    nonbinding: BTreeMap<TypeName, BTreeSet<String>>,
    components: Vec<Component>,
    component_index: HashMap<DeclId, usize>,
    interceptors: Vec<InterceptorDecl>,
    decorators: Vec<DecoratorDecl>,
    observers: Vec<ObserverDecl>,
    injection_points: Vec<InjectionPoint>,
    delegates: HashMap<DeclId, InjectionPointId>,
    problems: Vec<BeanGraphError>,
}

/// Declared types read from supertype to subtype.
struct Subtypes<'a> {
    edges: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> GraphTraversal for Subtypes<'a> {
    type Node = &'a str;

    fn neighbors(&self, node: &&'a str) -> Vec<&'a str> {
        self.edges.get(node).cloned().unwrap_or_default()
    }

    fn contains_node(&self, node: &&'a str) -> bool {
        self.edges.contains_key(node)
    }
}

/// Types on a cycle of the raw supertype graph, and every type whose
/// hierarchy reaches one of them. Closures of the latter never end.
fn cyclic_hierarchies(types: &[TypeDecl]) -> (BTreeSet<&str>, HashSet<&str>) {
    let mut supertypes: DiGraphMap<&str, ()> = DiGraphMap::new();
    let mut subtypes = Subtypes { edges: HashMap::new() };
    for decl in types {
        let name = decl.name.as_str();
        supertypes.add_node(name);
        subtypes.edges.entry(name).or_default();
        for raw in decl.supertypes.iter().filter_map(TypeRef::raw_name) {
            supertypes.add_edge(name, raw.as_str(), ());
            subtypes.edges.entry(raw.as_str()).or_default().push(name);
        }
    }

    let cyclic: BTreeSet<&str> = tarjan_scc(&supertypes)
        .into_iter()
        .filter(|scc| scc.len() > 1 || scc.iter().any(|&n| supertypes.contains_edge(n, n)))
        .flatten()
        .collect();
    let tainted = subtypes.reachable_from(cyclic.iter().copied());
    (cyclic, tainted)
}

/// Reference checks shared by every declaration kind.
struct Checker<'a> {
    registry: &'a TypeRegistry,
    annotations: &'a HashMap<TypeName, AnnotationDecl>,
    cyclic: &'a HashSet<TypeName>,
    problems: Vec<BeanGraphError>,
}

impl<'a> Checker<'a> {
    fn check_type(&mut self, decl: &str, ty: &TypeRef) -> bool {
        let unknown = self.registry.unknown_names(ty);
        if unknown.is_empty() {
            return true;
        }
        for name in unknown {
            let message = if self.cyclic.contains(name) {
                format!("type {} refers to {} whose supertype hierarchy is cyclic", ty, name)
            } else {
                format!("type {} refers to unknown type {}", ty, name)
            };
            self.problems.push(BeanGraphError::definition(decl, message));
        }
        false
    }

    fn check_types<'t>(&mut self, decl: &str, types: impl IntoIterator<Item = &'t TypeRef>) -> bool {
        types
            .into_iter()
            .fold(true, |ok, ty| self.check_type(decl, ty) && ok)
    }

    fn check_annotations(&mut self, decl: &str, instances: &[QualifierInstance], expected: AnnotationKind) -> bool {
        let mut ok = true;
        for instance in instances {
            let what = match expected {
                AnnotationKind::Qualifier => "qualifier",
                AnnotationKind::InterceptorBinding => "interceptor binding",
            };
            match self.annotations.get(&instance.name) {
                Some(annotation) if annotation.kind == expected => {}
                Some(_) => {
                    self.problems.push(BeanGraphError::definition(
                        decl,
                        format!("{} is not a {}", instance, what),
                    ));
                    ok = false;
                }
                None => {
                    self.problems.push(BeanGraphError::definition(
                        decl,
                        format!("unknown {} {}", what, instance),
                    ));
                    ok = false;
                }
            }
        }
        ok
    }
}

impl Deployment {
    /// Validate and index a snapshot.
    pub fn build(snapshot: &DeclarationSnapshot) -> BeanGraphResult<Self> {
        Self::build_with(snapshot, &BTreeMap::new())
    }

    /// Validate and index a snapshot, adding non-binding member overrides
    /// supplied by configuration.
    pub fn build_with(
        snapshot: &DeclarationSnapshot,
        extra_nonbinding: &BTreeMap<TypeName, BTreeSet<String>>,
    ) -> BeanGraphResult<Self> {
        let mut problems = Vec::new();

        // 0. Type hierarchies; types reaching a cycle stay out of the registry
        let (cycles, reaching) = cyclic_hierarchies(&snapshot.types);
        for name in cycles {
            problems.push(BeanGraphError::definition(
                name,
                "type takes part in a cyclic supertype hierarchy",
            ));
        }
        let cyclic: HashSet<TypeName> = reaching.into_iter().map(TypeName::from).collect();
        let registry = TypeRegistry::new(
            snapshot
                .types
                .iter()
                .filter(|t| !cyclic.contains(&t.name))
                .cloned(),
        );

        // 1. Annotation types
        let mut annotations = HashMap::new();
        for decl in builtin_annotations() {
            annotations.insert(decl.name.clone(), decl);
        }
        for decl in &snapshot.annotations {
            if annotations.contains_key(&decl.name) {
                problems.push(BeanGraphError::definition(
                    decl.name.as_str(),
                    "annotation type declared more than once",
                ));
                continue;
            }
            annotations.insert(decl.name.clone(), decl.clone());
        }
        let mut implied_problems = Vec::new();
        for decl in annotations.values() {
            for implied in &decl.implies {
                let is_binding = annotations
                    .get(&implied.name)
                    .map(|a| a.kind == AnnotationKind::InterceptorBinding)
                    .unwrap_or(false);
                if decl.kind != AnnotationKind::InterceptorBinding || !is_binding {
                    implied_problems.push(BeanGraphError::definition(
                        decl.name.as_str(),
                        format!("only interceptor bindings may imply interceptor bindings: {}", implied),
                    ));
                }
            }
        }
        implied_problems.sort_by_key(ToString::to_string);
        problems.extend(implied_problems);

        let mut nonbinding = snapshot.nonbinding.clone();
        for (annotation, members) in extra_nonbinding {
            nonbinding
                .entry(annotation.clone())
                .or_default()
                .extend(members.iter().cloned());
        }

        // 2. Declaration identities
        let mut kinds: HashMap<DeclId, DeclKind> = HashMap::new();
        let mut component_ok = vec![true; snapshot.components.len()];
        let mut interceptor_ok = vec![true; snapshot.interceptors.len()];
        let mut decorator_ok = vec![true; snapshot.decorators.len()];

        let ids = snapshot
            .components
            .iter()
            .map(|c| (c.id(), DeclKind::Component))
            .chain(snapshot.interceptors.iter().map(|i| (&i.id, DeclKind::Interceptor)))
            .chain(snapshot.decorators.iter().map(|d| (&d.id, DeclKind::Decorator)));
        for (id, kind) in ids {
            if let Some(existing) = kinds.get(id) {
                problems.push(BeanGraphError::definition(
                    id.as_str(),
                    format!(
                        "{} identity already used by a {}",
                        kind.as_str(),
                        existing.as_str()
                    ),
                ));
            } else {
                kinds.insert(id.clone(), kind);
            }
        }
        // Only the first declaration of a duplicated id survives
        let mut first_seen = HashSet::new();
        for (i, c) in snapshot.components.iter().enumerate() {
            if !first_seen.insert(c.id().clone()) {
                component_ok[i] = false;
            }
        }
        for (i, d) in snapshot.interceptors.iter().enumerate() {
            if !first_seen.insert(d.id.clone()) {
                interceptor_ok[i] = false;
            }
        }
        for (i, d) in snapshot.decorators.iter().enumerate() {
            if !first_seen.insert(d.id.clone()) {
                decorator_ok[i] = false;
            }
        }

        let mut checker = Checker {
            registry: &registry,
            annotations: &annotations,
            cyclic: &cyclic,
            problems: Vec::new(),
        };

        // 3. Components
        for (i, component) in snapshot.components.iter().enumerate() {
            if !component_ok[i] {
                continue;
            }
            let id = component.id().as_str();
            let mut ok = checker.check_type(id, component.provider_type());
            ok &= checker.check_types(id, component.bean_types());
            ok &= checker.check_annotations(id, component.qualifiers(), AnnotationKind::Qualifier);
            ok &= checker.check_annotations(id, component.bindings(), AnnotationKind::InterceptorBinding);
            for method in component.methods() {
                ok &= checker.check_annotations(id, &method.bindings, AnnotationKind::InterceptorBinding);
            }

            match component.declaring() {
                Some(declaring) => match kinds.get(declaring) {
                    None => {
                        return Err(BeanGraphError::internal(format!(
                            "declaring component {} of {} is not part of the snapshot",
                            declaring, id
                        )));
                    }
                    Some(kind @ (DeclKind::Interceptor | DeclKind::Decorator)) => {
                        checker.problems.push(BeanGraphError::definition(
                            id,
                            format!("{} {} must not declare a producer", kind.as_str(), declaring),
                        ));
                        ok = false;
                    }
                    Some(DeclKind::Component) => {}
                },
                None if component.is_producer() => {
                    checker.problems.push(BeanGraphError::definition(
                        id,
                        "producer has no declaring component",
                    ));
                    ok = false;
                }
                None => {}
            }
            component_ok[i] = ok;
        }

        // Producers of rejected components are rejected too
        let mut position: HashMap<&DeclId, usize> = HashMap::new();
        for (i, component) in snapshot.components.iter().enumerate() {
            position.entry(component.id()).or_insert(i);
        }
        loop {
            let mut changed = false;
            for (i, component) in snapshot.components.iter().enumerate() {
                if !component_ok[i] {
                    continue;
                }
                let Some(declaring) = component.declaring() else {
                    continue;
                };
                let declaring_ok = position.get(declaring).map(|&j| component_ok[j]).unwrap_or(false);
                if !declaring_ok {
                    checker.problems.push(BeanGraphError::definition(
                        component.id().as_str(),
                        format!("declaring component {} is not valid", declaring),
                    ));
                    component_ok[i] = false;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut components = Vec::new();
        for (i, component) in snapshot.components.iter().enumerate() {
            if !component_ok[i] {
                continue;
            }
            let mut component = component.clone();
            if component.bean_types.is_empty() {
                component.bean_types = registry.type_closure(&component.provider_type);
            } else {
                // Explicit bean types still expose the provider type and the top type
                if !component.bean_types.contains(&component.provider_type) {
                    component.bean_types.insert(0, component.provider_type.clone());
                }
                if !component.bean_types.iter().any(TypeRef::is_top) {
                    component.bean_types.push(TypeRef::top());
                }
            }
            component.normalize();
            components.push(component);
        }
        let component_index: HashMap<DeclId, usize> = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id().clone(), i))
            .collect();

        // 4. Interceptors
        for (i, interceptor) in snapshot.interceptors.iter().enumerate() {
            if !interceptor_ok[i] {
                continue;
            }
            let id = interceptor.id.as_str();
            if interceptor.bindings.is_empty() {
                checker.problems.push(BeanGraphError::definition(
                    id,
                    "interceptor declares no interceptor binding",
                ));
                interceptor_ok[i] = false;
                continue;
            }
            interceptor_ok[i] =
                checker.check_annotations(id, &interceptor.bindings, AnnotationKind::InterceptorBinding);
        }

        // 5. Decorators (delegates are counted with the injection points)
        for (i, decorator) in snapshot.decorators.iter().enumerate() {
            if !decorator_ok[i] {
                continue;
            }
            let id = decorator.id.as_str();
            if decorator.decorated_types.is_empty() {
                checker.problems.push(BeanGraphError::definition(
                    id,
                    "decorator has no decorated type",
                ));
                decorator_ok[i] = false;
                continue;
            }
            decorator_ok[i] = checker.check_types(id, &decorator.decorated_types);
        }

        let valid_owner = |owner: &InjectionOwner| -> bool {
            let id = owner.declaring_id();
            match owner {
                InjectionOwner::Interceptor(_) => snapshot
                    .interceptors
                    .iter()
                    .enumerate()
                    .any(|(i, d)| interceptor_ok[i] && &d.id == id),
                InjectionOwner::Decorator(_) => snapshot
                    .decorators
                    .iter()
                    .enumerate()
                    .any(|(i, d)| decorator_ok[i] && &d.id == id),
                _ => component_index.contains_key(id),
            }
        };

        // 6. Injection points
        let mut accepted = Vec::new();
        for point in &snapshot.injection_points {
            let owner = point.owner();
            let id = owner.declaring_id();
            let expected = match owner {
                InjectionOwner::Interceptor(_) => DeclKind::Interceptor,
                InjectionOwner::Decorator(_) => DeclKind::Decorator,
                _ => DeclKind::Component,
            };
            match kinds.get(id) {
                None => {
                    return Err(BeanGraphError::internal(format!(
                        "injection point {} is declared on unknown {} {}",
                        point.describe(),
                        expected.as_str(),
                        id
                    )));
                }
                Some(kind) if *kind != expected => {
                    return Err(BeanGraphError::internal(format!(
                        "injection point {} names {} as a {} but it is a {}",
                        point.describe(),
                        id,
                        expected.as_str(),
                        kind.as_str()
                    )));
                }
                Some(_) => {}
            }
            if !valid_owner(owner) {
                continue;
            }
            let decl = format!("{} ({})", id, point.describe());
            if point.kind() == InjectionKind::Delegate && expected != DeclKind::Decorator {
                checker.problems.push(BeanGraphError::definition(
                    decl,
                    "delegate injection point declared outside a decorator",
                ));
                continue;
            }
            let mut ok = checker.check_type(&decl, point.required_type());
            ok &= checker.check_annotations(&decl, point.qualifiers(), AnnotationKind::Qualifier);
            if ok {
                accepted.push(point.clone());
            }
        }

        for (i, decorator) in snapshot.decorators.iter().enumerate() {
            if !decorator_ok[i] {
                continue;
            }
            let count = accepted
                .iter()
                .filter(|p| p.is_delegate() && p.owner().declaring_id() == &decorator.id)
                .count();
            if count != 1 {
                checker.problems.push(BeanGraphError::definition(
                    decorator.id.as_str(),
                    format!(
                        "decorator must declare exactly one delegate injection point, found {}",
                        count
                    ),
                ));
                decorator_ok[i] = false;
            }
        }

        let decorators: Vec<DecoratorDecl> = snapshot
            .decorators
            .iter()
            .enumerate()
            .filter(|(i, _)| decorator_ok[*i])
            .map(|(_, d)| d.clone())
            .collect();
        let interceptors: Vec<InterceptorDecl> = snapshot
            .interceptors
            .iter()
            .enumerate()
            .filter(|(i, _)| interceptor_ok[*i])
            .map(|(_, d)| d.clone())
            .collect();

        let injection_points: Vec<InjectionPoint> = accepted
            .into_iter()
            .filter(|p| match p.owner() {
                InjectionOwner::Decorator(id) => decorators.iter().any(|d| &d.id == id),
                _ => true,
            })
            .collect();
        let delegates = injection_points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_delegate())
            .map(|(i, p)| (p.owner().declaring_id().clone(), InjectionPointId(i)))
            .collect();

        // 7. Observers
        let mut observers = Vec::new();
        for observer in &snapshot.observers {
            match kinds.get(&observer.declaring) {
                None => {
                    return Err(BeanGraphError::internal(format!(
                        "observer of {} is declared on unknown component {}",
                        observer.observed_type, observer.declaring
                    )));
                }
                Some(DeclKind::Component) => {}
                Some(kind) => {
                    checker.problems.push(BeanGraphError::definition(
                        observer.declaring.as_str(),
                        format!("{} must not declare an observer method", kind.as_str()),
                    ));
                    continue;
                }
            }
            if !component_index.contains_key(&observer.declaring) {
                continue;
            }
            let decl = format!("observer of {} on {}", observer.observed_type, observer.declaring);
            let mut ok = checker.check_type(&decl, &observer.observed_type);
            ok &= checker.check_annotations(&decl, &observer.qualifiers, AnnotationKind::Qualifier);
            if ok {
                observers.push(observer.clone());
            }
        }

        problems.extend(checker.problems);

        debug!(
            components = components.len(),
            interceptors = interceptors.len(),
            decorators = decorators.len(),
            injection_points = injection_points.len(),
            definition_errors = problems.len(),
            "deployment built"
        );

        Ok(Self {
            registry,
            annotations,
            nonbinding,
            components,
            component_index,
            interceptors,
            decorators,
            observers,
            injection_points,
            delegates,
            problems,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn annotations(&self) -> &HashMap<TypeName, AnnotationDecl> {
        &self.annotations
    }

    pub fn annotation(&self, name: &TypeName) -> Option<&AnnotationDecl> {
        self.annotations.get(name)
    }

    pub fn nonbinding(&self) -> &BTreeMap<TypeName, BTreeSet<String>> {
        &self.nonbinding
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, id: &DeclId) -> Option<&Component> {
        self.component_index.get(id).map(|&i| &self.components[i])
    }

    pub fn interceptors(&self) -> &[InterceptorDecl] {
        &self.interceptors
    }

    pub fn decorators(&self) -> &[DecoratorDecl] {
        &self.decorators
    }

    pub fn observers(&self) -> &[ObserverDecl] {
        &self.observers
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    pub fn injection_point(&self, id: InjectionPointId) -> Option<&InjectionPoint> {
        self.injection_points.get(id.0)
    }

    /// The delegate injection point of a decorator.
    pub fn delegate_of(&self, decorator: &DeclId) -> Option<(InjectionPointId, &InjectionPoint)> {
        self.delegates
            .get(decorator)
            .map(|&id| (id, &self.injection_points[id.0]))
    }

    /// Components derived from producers declared on `owner`.
    pub fn producers_of<'a>(&'a self, owner: &'a DeclId) -> impl Iterator<Item = &'a Component> + 'a {
        self.components
            .iter()
            .filter(move |c| c.is_producer() && c.declaring() == Some(owner))
    }

    pub fn declares_observer(&self, id: &DeclId) -> bool {
        self.observers.iter().any(|o| &o.declaring == id)
    }

    /// Definition errors found while building.
    pub fn problems(&self) -> &[BeanGraphError] {
        &self.problems
    }

    pub(crate) fn take_problems(&mut self) -> Vec<BeanGraphError> {
        std::mem::take(&mut self.problems)
    }
}
