//! Static checks for schema description files.
//!
//! Diagnostic codes:
//! - `E001` the file is not JSON
//! - `E002` the description has the wrong shape
//! - `E003` the description does not build (bad reference, rejected declaration)
//! - `W001` a definition is never referenced
//! - `W002` a schema declares no fields

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::LoadError;
use crate::loader::{description_issues, escape_pointer, load_json, schema_from_description};

/// Ordered so the worst diagnostic of a file decides its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub file: PathBuf,
    /// JSON Pointer into the description, e.g. `/fields/author/type`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}] {}: {}", label, self.code, self.path, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    fn new(file: PathBuf, diagnostics: Vec<Diagnostic>) -> Self {
        let status = match diagnostics.iter().map(|d| d.severity).max() {
            None => FileStatus::Ok,
            Some(Severity::Warning) => FileStatus::Warning,
            Some(Severity::Error) => FileStatus::Error,
        };
        Self {
            file,
            status,
            diagnostics,
        }
    }

    fn fails(&self, strict: bool) -> bool {
        match self.status {
            FileStatus::Ok => false,
            FileStatus::Warning => strict,
            FileStatus::Error => true,
        }
    }
}

/// Totals over every linted file.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// True when no file failed; under strict linting warnings fail a file.
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Lint one `.json` file, or every `.json` file below a directory.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let results: Vec<FileResult> = description_files(path)
        .iter()
        .map(|file| lint_file(file, path))
        .collect();

    let failed = results.iter().filter(|r| r.fails(strict)).count();
    let (errors, warnings) = results
        .iter()
        .flat_map(|r| &r.diagnostics)
        .fold((0, 0), |(errors, warnings), d| match d.severity {
            Severity::Error => (errors + 1, warnings),
            Severity::Warning => (errors, warnings + 1),
        });

    LintResult {
        path: path.to_path_buf(),
        files_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single description file; the reported name is relative to `base_path`.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let mut report = |severity, code, path: String, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            code,
            file: file.to_path_buf(),
            path,
            message,
        })
    };

    match load_json(file) {
        Err(e) => report(Severity::Error, "E001", "/".into(), format!("syntax error: {}", e)),
        Ok(description) => {
            let issues = description_issues(&description);
            for (path, message) in &issues {
                report(Severity::Error, "E002", path.clone(), message.clone());
            }
            if issues.is_empty() {
                if let Err(e) = schema_from_description(&description) {
                    report(Severity::Error, "E003", build_error_path(&e), e.to_string());
                }
                for name in unused_definitions(&description) {
                    report(
                        Severity::Warning,
                        "W001",
                        definition_pointer(name),
                        format!("definition \"{}\" is never referenced", name),
                    );
                }
                if description["fields"].as_object().is_some_and(|f| f.is_empty()) {
                    report(
                        Severity::Warning,
                        "W002",
                        "/fields".into(),
                        "schema declares no fields".into(),
                    );
                }
            }
        }
    }

    let shown = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();
    FileResult::new(shown, diagnostics)
}

fn definition_pointer(name: &str) -> String {
    format!("/definitions/{}", escape_pointer(name))
}

fn build_error_path(error: &LoadError) -> String {
    match error {
        LoadError::UnknownDefinition { path, .. } | LoadError::Configuration { path, .. } => {
            path.clone()
        }
        LoadError::CyclicDefinition { name, .. } => definition_pointer(name),
        _ => "/".to_string(),
    }
}

/// Definitions no `{"ref": name}` node points at.
fn unused_definitions(description: &Value) -> Vec<&str> {
    let Some(definitions) = description.get("definitions").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut referenced = BTreeSet::new();
    collect_refs(description, &mut referenced);
    definitions
        .keys()
        .map(String::as_str)
        .filter(|name| !referenced.contains(name))
        .collect()
}

fn collect_refs<'a>(value: &'a Value, refs: &mut BTreeSet<&'a str>) {
    match value {
        Value::Object(map) => match map.get("ref") {
            Some(Value::String(name)) if map.len() == 1 => {
                refs.insert(name);
            }
            _ => map.values().for_each(|child| collect_refs(child, refs)),
        },
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

/// `.json` files at or below `path`, sorted.
fn description_files(path: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(next) = pending.pop() {
        if next.is_dir() {
            if let Ok(entries) = std::fs::read_dir(&next) {
                pending.extend(entries.flatten().map(|entry| entry.path()));
            }
        } else if next.extension().is_some_and(|ext| ext == "json") {
            files.push(next);
        }
    }
    files.sort();
    files
}
