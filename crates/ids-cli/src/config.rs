//! Batch configuration file
//!
//! A YAML or JSON document with the audit options under `audit` plus the batch
//! settings. Command-line flags are applied on top of it.

use anyhow::Context;
use ids_audit::AuditOptions;
use serde::Deserialize;
use std::path::Path;

/// Extensions selected when neither the config nor the flags name any
pub const DEFAULT_EXTENSIONS: &[&str] = &["ids", "xml"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub audit: AuditOptions,
    /// File extensions picked up when walking directories
    pub extensions: Vec<String>,
    /// Files whose path matches this pattern skip the content audit
    pub omit_content: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            audit: AuditOptions::default(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            omit_content: None,
        }
    }
}

impl BatchConfig {
    /// Load from `path`, JSON when the extension says so and YAML otherwise
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let config = if is_json {
            serde_json::from_str(&text).with_context(|| format!("invalid JSON config {}", path.display()))?
        } else {
            serde_yaml::from_str(&text).with_context(|| format!("invalid YAML config {}", path.display()))?
        };
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Whether `path` carries one of the selected extensions
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.trim_start_matches('.').eq_ignore_ascii_case(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ids_audit::{IdsVersion, SchemaSelection, WarningBehavior};
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::default();
        assert!(config.accepts(Path::new("a/b.ids")));
        assert!(config.accepts(Path::new("a/b.XML")));
        assert!(!config.accepts(Path::new("a/b.ifc")));
        assert!(!config.accepts(Path::new("a/ids")));
    }

    #[test]
    fn test_load_yaml() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        writeln!(
            file,
            "audit:\n  schema: !fixed '0.9.7'\n  warning_behavior: info\nextensions: [ids]\nomit_content: '^legacy/'"
        )?;
        let config = BatchConfig::load(file.path())?;

        assert_eq!(config.audit.schema, SchemaSelection::Fixed(IdsVersion::V0_9_7));
        assert_eq!(config.audit.warning_behavior, WarningBehavior::Info);
        assert!(config.audit.content);
        assert_eq!(config.extensions, vec!["ids".to_string()]);
        assert_eq!(config.omit_content.as_deref(), Some("^legacy/"));
        Ok(())
    }

    #[test]
    fn test_load_json() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
        writeln!(
            file,
            r#"{{"audit": {{"structure": false, "schema_files": ["ids.xsd"], "schema_tables": ["tables"]}}}}"#
        )?;
        let config = BatchConfig::load(file.path())?;

        assert!(!config.audit.structure);
        assert_eq!(config.audit.schema_files.len(), 1);
        assert_eq!(config.audit.schema_tables, vec![std::path::PathBuf::from("tables")]);
        assert_eq!(config.extensions.len(), DEFAULT_EXTENSIONS.len());
        Ok(())
    }

    #[test]
    fn test_load_rejects_garbage() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
        writeln!(file, "not json")?;
        assert!(BatchConfig::load(file.path()).is_err());
        assert!(BatchConfig::load(Path::new("missing/config.yaml")).is_err());
        Ok(())
    }
}
