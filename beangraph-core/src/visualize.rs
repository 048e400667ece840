//! Graphviz DOT visualization of the binding graph.

use std::fmt::Write;

use crate::builder::ResolutionOutcome;

/// Generate a Graphviz DOT representation of a resolution outcome.
///
/// - retained components are lightgreen boxes
/// - removable components are lightcoral boxes
/// - interceptors are lightblue ellipses, decorators khaki hexagons
/// - edges point from a declaration to what it depends on
pub fn generate_dot(outcome: &ResolutionOutcome) -> String {
    let graph = outcome.graph.dependency_graph();
    let estimated_capacity = (graph.node_count() * 80) + (graph.edge_count() * 40) + 150;
    let mut dot = String::with_capacity(estimated_capacity);

    if let Err(e) = write_dot_content(&mut dot, outcome) {
        tracing::error!(error = %e, "failed to generate DOT output");
        return "digraph beangraph {\n}\n".to_string();
    }
    dot
}

fn write_dot_content(dot: &mut String, outcome: &ResolutionOutcome) -> std::fmt::Result {
    writeln!(dot, "digraph beangraph {{")?;
    writeln!(dot, "  rankdir=LR;")?;
    writeln!(dot, "  node [shape=box, style=filled, fontname=\"JetBrains Mono\"];")?;
    writeln!(dot)?;

    let deployment = &outcome.deployment;
    for component in deployment.components() {
        let color = if outcome.is_removable(component.id()) {
            "lightcoral"
        } else {
            "lightgreen"
        };
        writeln!(dot, "  \"{}\" [fillcolor={}];", component.id(), color)?;
    }
    for interceptor in deployment.interceptors() {
        writeln!(dot, "  \"{}\" [shape=ellipse, fillcolor=lightblue];", interceptor.id)?;
    }
    for decorator in deployment.decorators() {
        writeln!(dot, "  \"{}\" [shape=hexagon, fillcolor=khaki];", decorator.id)?;
    }

    writeln!(dot)?;

    let graph = outcome.graph.dependency_graph();
    for (from, to, _) in graph.all_edges() {
        writeln!(dot, "  \"{}\" -> \"{}\";", from, to)?;
    }

    writeln!(dot, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Resolver;
    use crate::model::{
        Component, DeclarationSnapshot, DecoratorDecl, InjectionOwner, InjectionPoint, TypeDecl, TypeRef,
    };

    #[test]
    fn test_generate_dot_empty() {
        let outcome = Resolver::new(DeclarationSnapshot::new()).run().unwrap();
        let dot = generate_dot(&outcome);
        assert!(dot.starts_with("digraph beangraph {"));
        assert!(dot.contains("rankdir=LR"));
    }

    #[test]
    fn test_generate_dot_with_components() {
        let mut s = DeclarationSnapshot::new();
        s.add_type(TypeDecl::new("Shop"))
            .add_type(TypeDecl::new("Repo"))
            .add_component(Component::class("Shop", TypeRef::class("Shop")).unremovable().done())
            .add_component(Component::class("Repo", TypeRef::class("Repo")).done())
            .add_component(Component::class("Dead", TypeRef::class("Shop")).done())
            .add_decorator(DecoratorDecl::new("RepoDecorator", 1).decorates(TypeRef::class("Repo")))
            .add_injection_point(InjectionPoint::delegate("RepoDecorator", TypeRef::class("Repo")).done())
            .add_injection_point(
                InjectionPoint::field(InjectionOwner::Component("Shop".into()), TypeRef::class("Repo")).done(),
            );
        let outcome = Resolver::new(s).run().unwrap();
        let dot = generate_dot(&outcome);

        assert!(dot.contains("\"Shop\" [fillcolor=lightgreen];"));
        assert!(dot.contains("\"Dead\" [fillcolor=lightcoral];"));
        assert!(dot.contains("\"RepoDecorator\" [shape=hexagon, fillcolor=khaki];"));
        assert!(dot.contains("\"Shop\" -> \"Repo\";"));
        assert!(dot.contains("\"Repo\" -> \"RepoDecorator\";"));
        assert!(dot.contains("\"RepoDecorator\" -> \"Repo\";"));
    }
}
