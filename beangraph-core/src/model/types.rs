//! Type usages and the declared type registry.
//!
//! A [`TypeRef`] is a use of a type at some declaration site: a bean type, the
//! required type of an injection point, a wildcard bound. The [`TypeRegistry`]
//! knows every declared type together with its direct supertypes, which is what
//! assignability checks and bean type closures walk.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the universal top type.
pub const TOP_TYPE: &str = "Object";

/// Upper bound on the size of a type closure. Supertype declarations that
/// keep nesting a type in itself would otherwise expand forever.
pub const MAX_CLOSURE: usize = 256;

/// Primitive type names accepted without a declaration.
pub const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// Fully qualified name of a declared type or annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_top(&self) -> bool {
        self.0 == TOP_TYPE
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(&self.0.as_str())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A type usage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// Concrete, non-generic use of a class, interface or primitive
    Class { name: TypeName },
    /// Generic type with ordered type arguments
    Parameterized { raw: TypeName, args: Vec<TypeRef> },
    /// Type variable with its upper bounds (empty means the top type)
    Variable {
        name: String,
        #[serde(default)]
        bounds: Vec<TypeRef>,
    },
    /// Wildcard argument (`?`, `? extends U`, `? super L`)
    Wildcard {
        #[serde(default)]
        upper: Option<Box<TypeRef>>,
        #[serde(default)]
        lower: Option<Box<TypeRef>>,
    },
    /// Array of a component type
    Array { component: Box<TypeRef> },
}

impl TypeRef {
    pub fn class(name: impl Into<TypeName>) -> Self {
        Self::Class { name: name.into() }
    }

    pub fn top() -> Self {
        Self::class(TOP_TYPE)
    }

    pub fn parameterized(raw: impl Into<TypeName>, args: impl IntoIterator<Item = TypeRef>) -> Self {
        Self::Parameterized {
            raw: raw.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    pub fn bounded_variable(name: impl Into<String>, bounds: impl IntoIterator<Item = TypeRef>) -> Self {
        Self::Variable {
            name: name.into(),
            bounds: bounds.into_iter().collect(),
        }
    }

    /// Unbounded wildcard `?`.
    pub fn wildcard() -> Self {
        Self::Wildcard {
            upper: None,
            lower: None,
        }
    }

    /// `? extends upper`
    pub fn extends(upper: TypeRef) -> Self {
        Self::Wildcard {
            upper: Some(Box::new(upper)),
            lower: None,
        }
    }

    /// `? super lower`
    pub fn super_of(lower: TypeRef) -> Self {
        Self::Wildcard {
            upper: None,
            lower: Some(Box::new(lower)),
        }
    }

    pub fn array(component: TypeRef) -> Self {
        Self::Array {
            component: Box::new(component),
        }
    }

    /// Raw type name for class and parameterized usages.
    pub fn raw_name(&self) -> Option<&TypeName> {
        match self {
            Self::Class { name } => Some(name),
            Self::Parameterized { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Self::Class { name } if name.is_top())
    }

    /// Class, parameterized and array usages are "actual" types.
    pub fn is_actual(&self) -> bool {
        matches!(
            self,
            Self::Class { .. } | Self::Parameterized { .. } | Self::Array { .. }
        )
    }

    pub fn is_unbounded_variable(&self) -> bool {
        match self {
            Self::Variable { bounds, .. } => bounds.is_empty() || bounds.iter().all(TypeRef::is_top),
            _ => false,
        }
    }

    /// Upper bounds of a variable, with the implicit top bound when none is declared.
    pub fn variable_bounds(&self) -> Vec<TypeRef> {
        match self {
            Self::Variable { bounds, .. } if !bounds.is_empty() => bounds.clone(),
            Self::Variable { .. } => vec![TypeRef::top()],
            _ => Vec::new(),
        }
    }

    /// Replace type variables by name.
    pub fn substitute(&self, bindings: &HashMap<&str, &TypeRef>) -> TypeRef {
        match self {
            Self::Variable { name, bounds } => match bindings.get(name.as_str()) {
                Some(bound) => (*bound).clone(),
                None => Self::Variable {
                    name: name.clone(),
                    bounds: bounds.iter().map(|b| b.substitute(bindings)).collect(),
                },
            },
            Self::Parameterized { raw, args } => Self::Parameterized {
                raw: raw.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::Wildcard { upper, lower } => Self::Wildcard {
                upper: upper.as_ref().map(|u| Box::new(u.substitute(bindings))),
                lower: lower.as_ref().map(|l| Box::new(l.substitute(bindings))),
            },
            Self::Array { component } => Self::array(component.substitute(bindings)),
            Self::Class { .. } => self.clone(),
        }
    }

    /// Raw form with type arguments dropped.
    pub fn erasure(&self) -> TypeRef {
        match self {
            Self::Parameterized { raw, .. } => Self::class(raw.clone()),
            Self::Array { component } => Self::array(component.erasure()),
            Self::Variable { bounds, .. } => bounds.first().map(TypeRef::erasure).unwrap_or_else(TypeRef::top),
            Self::Wildcard { upper, .. } => upper.as_ref().map(|u| u.erasure()).unwrap_or_else(TypeRef::top),
            Self::Class { .. } => self.clone(),
        }
    }

    /// Every raw type name referenced anywhere in this usage.
    pub fn referenced_names(&self) -> Vec<&TypeName> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a TypeName>) {
        match self {
            Self::Class { name } => out.push(name),
            Self::Parameterized { raw, args } => {
                out.push(raw);
                for arg in args {
                    arg.collect_names(out);
                }
            }
            Self::Variable { bounds, .. } => {
                for bound in bounds {
                    bound.collect_names(out);
                }
            }
            Self::Wildcard { upper, lower } => {
                if let Some(u) = upper {
                    u.collect_names(out);
                }
                if let Some(l) = lower {
                    l.collect_names(out);
                }
            }
            Self::Array { component } => component.collect_names(out),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { name } => write!(f, "{}", name),
            Self::Parameterized { raw, args } => {
                write!(f, "{}<", raw)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
            Self::Variable { name, bounds } => {
                f.write_str(name)?;
                if !bounds.is_empty() {
                    f.write_str(" extends ")?;
                    for (i, bound) in bounds.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" & ")?;
                        }
                        write!(f, "{}", bound)?;
                    }
                }
                Ok(())
            }
            Self::Wildcard { upper, lower } => {
                f.write_str("?")?;
                if let Some(u) = upper {
                    write!(f, " extends {}", u)?;
                }
                if let Some(l) = lower {
                    write!(f, " super {}", l)?;
                }
                Ok(())
            }
            Self::Array { component } => write!(f, "{}[]", component),
        }
    }
}

/// A declared class or interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: TypeName,
    /// Type parameter names, in declaration order
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Direct superclass and interfaces; may refer to `type_params` as variables
    #[serde(default)]
    pub supertypes: Vec<TypeRef>,
}

impl TypeDecl {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            supertypes: Vec::new(),
        }
    }

    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn extends(mut self, supertype: TypeRef) -> Self {
        self.supertypes.push(supertype);
        self
    }
}

/// Registry of declared types, read-only for the whole pass.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    decls: HashMap<TypeName, TypeDecl>,
}

impl TypeRegistry {
    pub fn new(decls: impl IntoIterator<Item = TypeDecl>) -> Self {
        let mut registry = Self::default();
        for decl in decls {
            registry.decls.insert(decl.name.clone(), decl);
        }
        registry
    }

    pub fn get(&self, name: &TypeName) -> Option<&TypeDecl> {
        self.decls.get(name)
    }

    /// Declared, primitive or the top type.
    pub fn is_known(&self, name: &TypeName) -> bool {
        name.is_top() || name.is_primitive() || self.decls.contains_key(name)
    }

    /// Names referenced by `ty` that the registry does not know.
    pub fn unknown_names<'t>(&self, ty: &'t TypeRef) -> Vec<&'t TypeName> {
        ty.referenced_names()
            .into_iter()
            .filter(|n| !self.is_known(n))
            .collect()
    }

    /// Direct supertypes of a usage, with type arguments substituted.
    pub fn direct_supertypes(&self, ty: &TypeRef) -> Vec<TypeRef> {
        match ty {
            TypeRef::Class { name } if name.is_top() => Vec::new(),
            TypeRef::Class { name } => match self.decls.get(name) {
                // Raw use of a generic type sees raw supertypes
                Some(decl) if !decl.type_params.is_empty() => {
                    decl.supertypes.iter().map(TypeRef::erasure).collect()
                }
                Some(decl) => decl.supertypes.clone(),
                None => Vec::new(),
            },
            TypeRef::Parameterized { raw, args } => match self.decls.get(raw) {
                Some(decl) => {
                    let bindings: HashMap<&str, &TypeRef> = decl
                        .type_params
                        .iter()
                        .map(String::as_str)
                        .zip(args.iter())
                        .collect();
                    decl.supertypes.iter().map(|s| s.substitute(&bindings)).collect()
                }
                None => Vec::new(),
            },
            TypeRef::Variable { .. } => ty.variable_bounds(),
            TypeRef::Wildcard { upper, .. } => vec![upper
                .as_ref()
                .map(|u| (**u).clone())
                .unwrap_or_else(TypeRef::top)],
            TypeRef::Array { .. } => vec![TypeRef::top()],
        }
    }

    /// Breadth-first supertype closure of `ty`, starting with `ty` itself and
    /// always ending with the top type.
    pub fn type_closure(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut queue = VecDeque::new();
        seen.insert(ty.clone());
        queue.push_back(ty.clone());

        while let Some(current) = queue.pop_front() {
            if ordered.len() >= MAX_CLOSURE {
                break;
            }
            let mut supertypes = self.direct_supertypes(&current);
            if supertypes.is_empty() && !current.is_top() {
                supertypes.push(TypeRef::top());
            }
            ordered.push(current);
            for s in supertypes {
                if seen.insert(s.clone()) {
                    queue.push_back(s);
                }
            }
        }

        // Keep the top type last so closures read from specific to general
        match ordered.iter().position(TypeRef::is_top) {
            Some(pos) => {
                let top = ordered.remove(pos);
                ordered.push(top);
            }
            None => ordered.push(TypeRef::top()),
        }
        ordered
    }
}
