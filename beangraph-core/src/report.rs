//! Output formatting - plaintext and JSON.

use std::fmt::Write;

use serde_json::json;

use crate::builder::ResolutionOutcome;

/// Plain-text report.
pub fn render_plain(outcome: &ResolutionOutcome) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_plain(&mut out, outcome);
    out
}

fn write_plain(out: &mut String, outcome: &ResolutionOutcome) -> std::fmt::Result {
    let stats = outcome.stats();
    writeln!(
        out,
        "COMPONENTS: {} ({} interceptors, {} decorators)",
        stats.components, stats.interceptors, stats.decorators
    )?;
    writeln!(
        out,
        "INJECTION POINTS: {} ({} resolved, {} unsatisfied, {} ambiguous, {} deferred)",
        stats.injection_points, stats.resolved, stats.unsatisfied, stats.ambiguous, stats.deferred
    )?;

    if outcome.problems.is_empty() {
        writeln!(out, "No problems found.")?;
    } else {
        writeln!(out, "PROBLEMS ({}):", outcome.problems.len())?;
        for (i, problem) in outcome.problems.iter().enumerate() {
            writeln!(out, "[{}] {}", i + 1, problem)?;
        }
    }

    if outcome.removable.is_empty() {
        writeln!(out, "No unused components found.")?;
    } else {
        writeln!(out, "UNUSED COMPONENTS ({}):", outcome.removable.len())?;
        for id in &outcome.removable {
            writeln!(out, "- {}", id)?;
        }
    }

    for component in outcome.deployment.components() {
        let id = component.id();
        let chains = outcome.graph.interceptor_chains(id);
        let decorators = outcome.graph.decorator_chain(id);
        if chains.is_none() && decorators.is_empty() {
            continue;
        }
        writeln!(out, "{}:", id)?;
        if let Some(chains) = chains {
            for (kind, chain) in &chains.lifecycle {
                writeln!(out, "    {}: {}", kind, join(chain))?;
            }
            for (method, chain) in &chains.methods {
                writeln!(out, "    {}(): {}", method, join(chain))?;
            }
        }
        if !decorators.is_empty() {
            writeln!(out, "    decorators: {}", join(decorators))?;
        }
    }
    Ok(())
}

fn join(ids: &[crate::model::DeclId]) -> String {
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}

/// Prints the plain-text report to stdout.
pub fn print_plain(outcome: &ResolutionOutcome) {
    print!("{}", render_plain(outcome));
}

/// JSON report with a generation timestamp and the graph fingerprint.
pub fn outcome_to_json(outcome: &ResolutionOutcome) -> serde_json::Value {
    json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "fingerprint": outcome.graph.fingerprint(),
        "stats": outcome.stats(),
        "removable": outcome.removable,
        "problems": outcome.problems.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "graph": outcome.graph,
    })
}

/// Prints the JSON report to stdout.
pub fn print_json(outcome: &ResolutionOutcome) {
    match serde_json::to_string_pretty(&outcome_to_json(outcome)) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!(error = %e, "JSON serialization failed");
            println!("{{\"removable\": {:?}}}", outcome.removable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Resolver;
    use crate::model::{
        AnnotationDecl, Component, DeclarationSnapshot, InjectionOwner, InjectionPoint, InterceptionKind,
        InterceptorDecl, QualifierInstance, TypeDecl, TypeRef,
    };

    fn outcome() -> ResolutionOutcome {
        let mut s = DeclarationSnapshot::new();
        s.add_type(TypeDecl::new("Shop"))
            .add_type(TypeDecl::new("Mailer"))
            .add_annotation(AnnotationDecl::interceptor_binding("Logged"))
            .add_interceptor(
                InterceptorDecl::new("LogInterceptor", 1)
                    .binding(QualifierInstance::new("Logged"))
                    .hook(InterceptionKind::PostConstruct),
            )
            .add_component(
                Component::class("Shop", TypeRef::class("Shop"))
                    .unremovable()
                    .binding(QualifierInstance::new("Logged"))
                    .done(),
            )
            .add_component(Component::class("Mailer", TypeRef::class("Mailer")).done())
            .add_injection_point(
                InjectionPoint::field(InjectionOwner::Component("Shop".into()), TypeRef::class("Missing")).done(),
            );
        Resolver::new(s).run().unwrap()
    }

    #[test]
    fn test_plain_report() {
        let text = render_plain(&outcome());
        assert!(text.contains("COMPONENTS: 2 (1 interceptors, 0 decorators)"));
        assert!(text.contains("PROBLEMS (1):"));
        assert!(text.contains("unknown type Missing"));
        assert!(text.contains("UNUSED COMPONENTS (1):\n- Mailer"));
        assert!(text.contains("Shop:\n    POST_CONSTRUCT: LogInterceptor"));
    }

    #[test]
    fn test_json_report() {
        let outcome = outcome();
        let json = outcome_to_json(&outcome);
        assert_eq!(json["removable"][0], "Mailer");
        assert_eq!(json["stats"]["components"], 2);
        assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);
        assert!(json["generated_at"].is_string());
        assert_eq!(json["problems"].as_array().unwrap().len(), 1);
    }
}
