//! Batch audit of files and directories
//!
//! Every selected file is audited on the blocking pool with its own engine; the
//! schema registry is built once and shared. Reports come back in selection
//! order.

use crate::config::BatchConfig;
use ids_audit::{AuditEngine, AuditOptions, AuditStatus, CollectingSink, Diagnostic, Error};
use ids_schema::SchemaRegistry;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Outcome of one audited file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: AuditStatus,
    pub content_omitted: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of a whole batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// Paths given on the command line that do not exist
    pub missing: Vec<PathBuf>,
    /// Set when the batch could not start
    pub setup_error: Option<Error>,
}

impl BatchReport {
    /// OR of every file status plus the batch-level failures
    #[must_use]
    pub fn status(&self) -> AuditStatus {
        let mut status: AuditStatus = self.files.iter().map(|f| f.status).collect();
        if !self.missing.is_empty() {
            status |= AuditStatus::NOT_FOUND;
        }
        if let Some(error) = &self.setup_error {
            status |= error.status();
        }
        status
    }

    pub fn passed(&self) -> usize {
        self.files.iter().filter(|f| f.status.is_ok()).count()
    }

    /// One line per file, its diagnostics indented below it, then the summary
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(error) = &self.setup_error {
            out.push_str(&format!("[{}] {error}\n", error.code()));
        }
        for path in &self.missing {
            out.push_str(&format!("{}: not found\n", path.display()));
        }
        for file in &self.files {
            let omitted = if file.content_omitted { " (content audit omitted)" } else { "" };
            out.push_str(&format!("{}: {}{omitted}\n", file.path.display(), file.status));
            for diagnostic in &file.diagnostics {
                out.push_str(&format!("  {diagnostic}\n"));
            }
        }
        out.push_str(&format!(
            "audited {} file(s): {} passed, {} failed; status {}\n",
            self.files.len(),
            self.passed(),
            self.files.len() - self.passed(),
            self.status()
        ));
        out
    }
}

/// Expand `inputs` into the files to audit.
///
/// Files named directly are always taken; directories are walked and filtered by
/// extension. Returns the selected files and the inputs that do not exist.
pub fn select_files(inputs: &[PathBuf], config: &BatchConfig) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut files = Vec::new();
    let mut missing = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("skipping unreadable entry: {e}");
                        None
                    }
                })
                .filter(|e| e.file_type().is_file() && config.accepts(e.path()))
                .map(walkdir::DirEntry::into_path)
                .collect();
            found.sort();
            debug!(dir = %input.display(), files = found.len(), "walked directory");
            files.extend(found);
        } else {
            missing.push(input.clone());
        }
    }
    (files, missing)
}

/// Whether the content audit is skipped for `path`
fn omits_content(omit: Option<&Regex>, path: &Path) -> bool {
    omit.is_some_and(|re| re.is_match(&path.to_string_lossy().replace('\\', "/")))
}

fn audit_one(path: PathBuf, options: AuditOptions, omit: Option<&Regex>, registry: Arc<SchemaRegistry>) -> FileReport {
    let content_omitted = omits_content(omit, &path);
    let options = if content_omitted { options.with_content(false) } else { options };
    let engine = AuditEngine::with_registry(options, registry);
    let mut sink = CollectingSink::new();
    let status = engine.audit_file(&path, &mut sink);
    FileReport {
        path,
        status,
        content_omitted,
        diagnostics: sink.diagnostics,
    }
}

/// Audit every file selected by `inputs`
pub async fn run(inputs: &[PathBuf], config: &BatchConfig) -> BatchReport {
    let omit = match config.omit_content.as_deref().map(Regex::new).transpose() {
        Ok(omit) => omit.map(Arc::new),
        Err(e) => {
            error!("invalid content omission pattern: {e}");
            return BatchReport {
                setup_error: Some(Error::InvalidOptions(format!("content omission pattern: {e}"))),
                ..BatchReport::default()
            };
        }
    };
    if let Err(e) = config.audit.check() {
        error!("{e}");
        return BatchReport {
            setup_error: Some(e),
            ..BatchReport::default()
        };
    }

    let (files, missing) = select_files(inputs, config);
    info!(files = files.len(), missing = missing.len(), "starting batch");

    let registry = Arc::new(config.audit.schema_registry());
    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let options = config.audit.clone();
            let omit = omit.clone();
            let registry = Arc::clone(&registry);
            let fallback = path.clone();
            let handle =
                tokio::task::spawn_blocking(move || audit_one(path, options, omit.as_deref(), registry));
            (fallback, handle)
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let report = match handle.await {
            Ok(report) => report,
            Err(e) => {
                error!(path = %path.display(), "audit task failed: {e}");
                FileReport {
                    path,
                    status: AuditStatus::UNHANDLED_ERROR,
                    content_omitted: false,
                    diagnostics: Vec::new(),
                }
            }
        };
        reports.push(report);
    }

    let report = BatchReport {
        files: reports,
        missing,
        setup_error: None,
    };
    info!(files = report.files.len(), passed = report.passed(), status = %report.status(), "batch finished");
    report
}

/// Run the schema definition check on every configured XSD file
pub fn check_schemas(config: &BatchConfig) -> (AuditStatus, Vec<Diagnostic>) {
    let engine = AuditEngine::new(config.audit.clone());
    let mut sink = CollectingSink::new();
    let status = engine.check_schema_files(&mut sink);
    (status, sink.diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ids xmlns="http://standards.buildingsmart.org/IDS" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://standards.buildingsmart.org/IDS http://standards.buildingsmart.org/IDS/1.0/ids.xsd">
  <info><title>Walls</title></info>
  <specifications>
    <specification name="Walls" ifcVersion="IFC4">
      <applicability><entity><name><simpleValue>IFCWALL</simpleValue></name></entity></applicability>
    </specification>
  </specifications>
</ids>"#;

    const UNKNOWN_CLASS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ids xmlns="http://standards.buildingsmart.org/IDS" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://standards.buildingsmart.org/IDS http://standards.buildingsmart.org/IDS/1.0/ids.xsd">
  <info><title>Unknown</title></info>
  <specifications>
    <specification name="Unknown" ifcVersion="IFC4">
      <applicability><entity><name><simpleValue>IFCNOTACLASS</simpleValue></name></entity></applicability>
    </specification>
  </specifications>
</ids>"#;

    fn workspace() -> anyhow::Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("legacy"))?;
        fs::write(dir.path().join("valid.ids"), VALID)?;
        fs::write(dir.path().join("legacy/unknown.ids"), UNKNOWN_CLASS)?;
        fs::write(dir.path().join("notes.txt"), "not an ids file")?;
        Ok(dir)
    }

    #[test]
    fn test_select_files_by_extension() -> anyhow::Result<()> {
        let dir = workspace()?;
        let config = BatchConfig::default();
        let (files, missing) = select_files(&[dir.path().to_path_buf(), dir.path().join("nope")], &config);

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().is_some_and(|e| e == "ids")));
        assert_eq!(missing, vec![dir.path().join("nope")]);

        let (files, _) = select_files(&[dir.path().join("notes.txt")], &config);
        assert_eq!(files.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_status_is_or_of_files() -> anyhow::Result<()> {
        let dir = workspace()?;
        let report = run(&[dir.path().to_path_buf()], &BatchConfig::default()).await;

        assert_eq!(report.files.len(), 2);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.status(), AuditStatus::CONTENT_ERROR);
        assert!(report.render().contains("1 passed, 1 failed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_omission_pattern_skips_content() -> anyhow::Result<()> {
        let dir = workspace()?;
        let config = BatchConfig {
            omit_content: Some("legacy/".to_string()),
            ..BatchConfig::default()
        };
        let report = run(&[dir.path().to_path_buf()], &config).await;

        assert!(report.status().is_ok());
        assert_eq!(report.files.iter().filter(|f| f.content_omitted).count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_omission_pattern_is_an_option_error() {
        let config = BatchConfig {
            omit_content: Some("(".to_string()),
            ..BatchConfig::default()
        };
        let report = run(&[], &config).await;
        assert_eq!(report.status(), AuditStatus::INVALID_OPTIONS);
        assert!(report.files.is_empty());
    }

    #[tokio::test]
    async fn test_missing_schema_tables_stop_the_batch() -> anyhow::Result<()> {
        let dir = workspace()?;
        let mut config = BatchConfig::default();
        config.audit.schema_tables.push(dir.path().join("tables"));
        let report = run(&[dir.path().to_path_buf()], &config).await;

        assert_eq!(report.status(), AuditStatus::NOT_FOUND);
        assert!(report.files.is_empty());
        assert!(report.render().starts_with("[305]"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_input() {
        let report = run(&[PathBuf::from("does/not/exist.ids")], &BatchConfig::default()).await;
        assert_eq!(report.status(), AuditStatus::NOT_FOUND);
        assert!(report.render().contains("not found"));
    }
}
