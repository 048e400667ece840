//! Configuration loading from beangraph.toml.
//!
//! ```toml
//! remove_unused = true
//! parallel = true
//! exclude = ["^test\\.", "Mock"]
//!
//! [priorities]
//! FastGreeter = 100
//!
//! [nonbinding]
//! Color = ["comment"]
//!
//! [output]
//! format = "json"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{DeclId, TypeName};
use crate::resolve::PriorityOverrides;

pub const CONFIG_FILE: &str = "beangraph.toml";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct BeanGraphConfig {
    /// Run the unused-component analysis (default true).
    pub remove_unused: Option<bool>,
    /// Resolve injection points on the rayon pool (default true).
    pub parallel: Option<bool>,
    /// Regex patterns; matching component ids or provider types are never removed.
    pub exclude: Option<Vec<String>>,
    /// Alternative priority overrides keyed by component id.
    pub priorities: Option<BTreeMap<String, i32>>,
    /// Extra non-binding members keyed by annotation name.
    pub nonbinding: Option<BTreeMap<String, Vec<String>>>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct OutputConfig {
    /// Output format: "plain" or "json".
    pub format: Option<String>,
}

impl BeanGraphConfig {
    pub fn output_format(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.format.as_deref())
    }

    pub fn priority_overrides(&self) -> PriorityOverrides {
        PriorityOverrides::new(
            self.priorities
                .iter()
                .flatten()
                .map(|(id, priority)| (DeclId::from(id.as_str()), *priority)),
        )
    }

    pub fn nonbinding_overrides(&self) -> BTreeMap<TypeName, BTreeSet<String>> {
        self.nonbinding
            .iter()
            .flatten()
            .map(|(annotation, members)| {
                (
                    TypeName::from(annotation.as_str()),
                    members.iter().cloned().collect(),
                )
            })
            .collect()
    }
}

/// Loads `beangraph.toml` from `root` if it exists.
pub fn load_config(root: &Path) -> Result<Option<BeanGraphConfig>> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Loads a configuration file from an explicit path.
pub fn load_config_file(path: &Path) -> Result<BeanGraphConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg = toml::from_str(&content)
        .with_context(|| format!("Invalid {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, TypeRef};
    use crate::resolve::AlternativePriorities;

    #[test]
    fn test_parse_all_fields() {
        let cfg: BeanGraphConfig = toml::from_str(
            r#"
remove_unused = false
exclude = ["Mock$"]

[priorities]
FastGreeter = 100

[nonbinding]
Color = ["comment", "note"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.remove_unused, Some(false));
        assert_eq!(cfg.parallel, None);
        assert_eq!(cfg.output_format(), None);

        let fast = Component::class("FastGreeter", TypeRef::class("Greeter")).done();
        assert_eq!(cfg.priority_overrides().priority(&fast), Some(100));

        let nonbinding = cfg.nonbinding_overrides();
        assert_eq!(nonbinding[&TypeName::from("Color")].len(), 2);
    }

    #[test]
    fn test_empty_config() {
        let cfg: BeanGraphConfig = toml::from_str("").unwrap();
        assert!(cfg.priority_overrides().is_empty());
        assert!(cfg.nonbinding_overrides().is_empty());
    }
}
