//! Closed declaration snapshot handed over by the indexing collaborator.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::annotation::AnnotationDecl;
use super::component::Component;
use super::injection::InjectionPoint;
use super::interception::{DecoratorDecl, InterceptorDecl, ObserverDecl};
use super::types::{TypeDecl, TypeName};
use crate::error::{BeanGraphError, BeanGraphResult, IoResultExt};

/// Every declaration taking part in one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationSnapshot {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub annotations: Vec<AnnotationDecl>,
    /// Externally supplied non-binding members per annotation type
    #[serde(default)]
    pub nonbinding: BTreeMap<TypeName, BTreeSet<String>>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub interceptors: Vec<InterceptorDecl>,
    #[serde(default)]
    pub decorators: Vec<DecoratorDecl>,
    #[serde(default)]
    pub observers: Vec<ObserverDecl>,
    #[serde(default)]
    pub injection_points: Vec<InjectionPoint>,
}

impl DeclarationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, decl: TypeDecl) -> &mut Self {
        self.types.push(decl);
        self
    }

    pub fn add_annotation(&mut self, decl: AnnotationDecl) -> &mut Self {
        self.annotations.push(decl);
        self
    }

    pub fn add_nonbinding(&mut self, annotation: impl Into<TypeName>, member: impl Into<String>) -> &mut Self {
        self.nonbinding
            .entry(annotation.into())
            .or_default()
            .insert(member.into());
        self
    }

    pub fn add_component(&mut self, component: Component) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn add_interceptor(&mut self, interceptor: InterceptorDecl) -> &mut Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn add_decorator(&mut self, decorator: DecoratorDecl) -> &mut Self {
        self.decorators.push(decorator);
        self
    }

    pub fn add_observer(&mut self, observer: ObserverDecl) -> &mut Self {
        self.observers.push(observer);
        self
    }

    pub fn add_injection_point(&mut self, point: InjectionPoint) -> &mut Self {
        self.injection_points.push(point);
        self
    }

    /// Decode a snapshot from JSON.
    pub fn from_json(json: &str) -> BeanGraphResult<Self> {
        serde_json::from_str(json).map_err(|e| BeanGraphError::snapshot(e.to_string()))
    }

    /// Encode the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> BeanGraphResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BeanGraphError::snapshot(e.to_string()))
    }

    /// Read a JSON snapshot from disk.
    pub fn load(path: &Path) -> BeanGraphResult<Self> {
        let content = fs::read_to_string(path).with_path(path)?;
        Self::from_json(&content).map_err(|e| match e {
            BeanGraphError::Snapshot { message } => {
                BeanGraphError::snapshot(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }
}
