//! Rule loading from a directory, one rule per file
//! the whole set is rejected on the first bad file.

use logalert_core::{Rule, parse_duration};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// file extensions recognised as rule files
pub const RULE_EXTENSIONS: &[&str] = &["yaml", "yml", "toml", "json"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read rules dir {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read rule {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse rule {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid rule {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("duplicate rule name {name:?} in {path}")]
    Duplicate { path: PathBuf, name: String },
}

impl LoadError {
    /// The rule file (or directory) the error is about.
    pub fn path(&self) -> &Path {
        match self {
            LoadError::ReadDir { path, .. }
            | LoadError::ReadFile { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::Invalid { path, .. }
            | LoadError::Duplicate { path, .. } => path,
        }
    }
}

/// Load and validate every rule file directly inside `dir`.
pub fn load_rules<P: AsRef<Path>>(dir: P) -> Result<Vec<Rule>, LoadError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut rules = Vec::new();
    let mut names = HashSet::new();

    for entry in entries {
        let entry = entry.map_err(|source| LoadError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || !is_rule_file(&path) {
            continue;
        }

        let rule = load_rule_file(&path)?;
        if !names.insert(rule.name.clone()) {
            return Err(LoadError::Duplicate {
                path,
                name: rule.name,
            });
        }
        tracing::debug!(rule = %rule.name, path = %path.display(), "rule loaded");
        rules.push(rule);
    }

    Ok(rules)
}

/// Parse and validate a single rule file.
pub fn load_rule_file(path: &Path) -> Result<Rule, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let rule = parse_rule(path, &content)?;
    validate_rule(&rule).map_err(|reason| LoadError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(rule)
}

fn parse_rule(path: &Path, content: &str) -> Result<Rule, LoadError> {
    let parsed = match extension(path).as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str::<Rule>(content).map_err(|e| e.to_string()),
        Some("json") => serde_json::from_str::<Rule>(content).map_err(|e| e.to_string()),
        _ => toml::from_str::<Rule>(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn validate_rule(rule: &Rule) -> Result<(), String> {
    let missing = rule.missing_fields();
    if !missing.is_empty() {
        return Err(format!("missing required field(s): {}", missing.join(", ")));
    }
    parse_duration(&rule.time_window).map_err(|e| format!("timeWindow: {e}"))?;
    Ok(())
}

fn is_rule_file(path: &Path) -> bool {
    extension(path).is_some_and(|ext| RULE_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
