//! Structured logging using **tracing**.
//!
//! The library only emits events; installing a subscriber is left to the
//! binary, which calls [`init_structured_logging`] once.

use tracing::{error, info, warn};

use crate::error::BeanGraphError;

/// Initializes the global tracing subscriber with JSON output on stderr.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=beangraph_core=debug`)
pub fn init_structured_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        // stdout is reserved for the report
        .with_writer(std::io::stderr)
        .init();
}

/// Emits one event per problem: `error!` for fatal ones, `warn!` otherwise.
pub fn log_problems(problems: &[BeanGraphError]) {
    for problem in problems {
        let kind = problem_kind(problem);
        if problem.is_fatal() {
            error!(kind, detail = %problem);
        } else {
            warn!(kind, detail = %problem);
        }
    }
}

/// Summary event for a finished pass.
pub fn log_summary(components: usize, injection_points: usize, removable: usize, problems: usize) {
    info!(components, injection_points, removable, problems, "resolution finished");
}

fn problem_kind(problem: &BeanGraphError) -> &'static str {
    match problem {
        BeanGraphError::Definition { .. } => "definition",
        BeanGraphError::Unsatisfied { .. } => "unsatisfied",
        BeanGraphError::Ambiguous { .. } => "ambiguous",
        BeanGraphError::AmbiguousName { .. } => "ambiguous_name",
        BeanGraphError::Internal { .. } => "internal",
        BeanGraphError::Io { .. } => "io",
        BeanGraphError::Config { .. } => "config",
        BeanGraphError::Snapshot { .. } => "snapshot",
        BeanGraphError::Validation { .. } => "validation",
    }
}
