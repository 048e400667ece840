//! beangraph CLI - static bean resolution for declaration snapshots.
//!
//! Features:
//! - Typesafe resolution with unsatisfied and ambiguous dependency reports
//! - Interceptor and decorator chains per component
//! - Unused component detection
//! - Graphviz DOT and visualizer JSON export

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use beangraph_core::{
    generate_dot, init_structured_logging, load_config, load_config_file, print_json, print_plain,
    BeanGraphConfig, DeclarationSnapshot, Resolver,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Static bean resolution for component-injection snapshots")]
pub struct Cli {
    /// Path to the JSON declaration snapshot
    snapshot: String,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Configuration file (defaults to beangraph.toml next to the snapshot)
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Skip unused component detection
    #[arg(long)]
    keep_unused: bool,

    /// Regex patterns of component ids or types that are never removed
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,

    /// Resolve injection points on a single thread
    #[arg(long)]
    sequential: bool,

    /// Generate Graphviz DOT output for the binding graph
    #[arg(long)]
    dot: bool,

    /// Write DOT output to a specified file instead of stdout
    #[arg(long)]
    dot_file: Option<String>,

    /// Export the binding graph to a JSON file (visualizer format)
    #[arg(long, value_name = "FILE")]
    export_graph: Option<String>,
}

/// Explicit `--config` wins; otherwise look next to the snapshot.
fn resolve_config(cli: &Cli) -> Result<Option<BeanGraphConfig>> {
    if let Some(ref path) = cli.config {
        return load_config_file(Path::new(path)).map(Some);
    }
    let dir = Path::new(&cli.snapshot)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    load_config(dir)
}

fn validate_output_path(path: &str) -> Result<PathBuf> {
    if path.contains('\0') {
        return Err(anyhow!("Output path contains null bytes"));
    }

    let p = PathBuf::from(path);

    if p.is_absolute() {
        return Err(anyhow!(
            "Output path must be relative, not absolute: {}",
            path
        ));
    }

    for component in p.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(anyhow!(
                "Path traversal (..) not allowed in output paths: {}",
                path
            ));
        }
    }

    let normalized = path.replace('\\', "/");
    if normalized.contains("/../") || normalized.starts_with("../") {
        return Err(anyhow!("Path traversal attempt detected: {}", path));
    }

    Ok(p)
}

fn build_resolver(cli: &Cli, snapshot: DeclarationSnapshot, cfg: Option<&BeanGraphConfig>) -> Result<Resolver> {
    let mut resolver = Resolver::new(snapshot);
    if let Some(cfg) = cfg {
        resolver = resolver.with_config(cfg)?;
    }
    // Flags override the configuration file
    if cli.keep_unused {
        resolver = resolver.remove_unused(false);
    }
    if cli.sequential {
        resolver = resolver.parallel(false);
    }
    if !cli.exclude.is_empty() {
        resolver = resolver
            .exclude_patterns(&cli.exclude)
            .context("Invalid --exclude pattern")?;
    }
    Ok(resolver)
}

/// Exit code when the pass panicked or an output path was rejected.
const EXIT_INTERNAL: i32 = 2;

/// Runs `f`, turning a panic into [`EXIT_INTERNAL`].
fn run_guarded<F>(f: F) -> Result<i32>
where
    F: FnOnce() -> Result<i32> + std::panic::UnwindSafe,
{
    std::panic::catch_unwind(f).unwrap_or(Ok(EXIT_INTERNAL))
}

/// One full run; returns the process exit code.
fn run(cli: &Cli) -> Result<i32> {
    // 1. Inputs
    let snapshot = DeclarationSnapshot::load(Path::new(&cli.snapshot))
        .with_context(|| format!("Failed to load snapshot: {}", cli.snapshot))?;
    let cfg = resolve_config(cli)?;
    let json_output = cli.json || cfg.as_ref().and_then(|c| c.output_format()) == Some("json");

    // 2. Resolution pass (internal errors abort here)
    let resolver = build_resolver(cli, snapshot, cfg.as_ref())?;
    let outcome = resolver.run().context("Resolution pass aborted")?;

    // 3. Visualizer export
    if let Some(ref path) = cli.export_graph {
        let safe_path = validate_output_path(path)
            .with_context(|| format!("Invalid output path: {}", path))?;
        let json = outcome.graph.to_visualizer_json(&outcome.removable);
        let serialized = serde_json::to_string_pretty(&json)
            .context("Failed to serialize binding graph to JSON")?;
        fs::write(&safe_path, &serialized)
            .with_context(|| format!("Failed to write binding graph to {}", safe_path.display()))?;
        eprintln!("[beangraph] Binding graph exported → {}", safe_path.display());
    }

    // 4. Report results
    if json_output {
        print_json(&outcome);
    } else {
        print_plain(&outcome);
    }

    // 5. DOT/Graphviz output (don't crash on write errors)
    if cli.dot || cli.dot_file.is_some() {
        let dot = generate_dot(&outcome);
        if let Some(ref file) = cli.dot_file {
            match validate_output_path(file) {
                Ok(safe_path) => {
                    if let Err(e) = fs::write(&safe_path, &dot) {
                        eprintln!("[WARN] DOT write failed to {}: {}", safe_path.display(), e);
                    }
                }
                Err(e) => {
                    eprintln!("[ERROR] Invalid output path: {}", e);
                    return Ok(EXIT_INTERNAL);
                }
            }
        } else {
            println!("{}", dot);
        }
    }

    // 6. Exit code (CI-friendly)
    Ok(if outcome.has_problems() { 1 } else { 0 })
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] beangraph internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code {}.", EXIT_INTERNAL);
    }));

    // JSON logs to stderr, respects RUST_LOG
    init_structured_logging();

    let cli = Cli::parse();
    let code = run_guarded(|| run(&cli))?;
    std::process::exit(code);
}
