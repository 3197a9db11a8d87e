//! `covtree.json` project configuration.
//!
//! Every key is optional:
//!
//! ```json
//! {
//!   "projectPath": ".",
//!   "coverageFolderPath": "./coverage/",
//!   "env": { "APP_ENV": "test" },
//!   "ignore": ["internal/mocks", "generated.go"],
//!   "test": { "command": "go test -v ./...", "output": "testname" },
//!   "scripts": { "lint": "golangci-lint run" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{CovtreeError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "covtree.json";

/// How `covtree test` lists results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// One line per package.
    #[default]
    Package,
    /// Packages plus every test inside them.
    Testname,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub command: String,
    pub output: OutputStyle,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: "go test -v ./...".to_string(),
            output: OutputStyle::Package,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub project_path: String,
    pub coverage_folder_path: PathBuf,
    pub env: BTreeMap<String, String>,
    pub ignore: Vec<String>,
    pub test: TestConfig,
    pub scripts: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: ".".to_string(),
            coverage_folder_path: PathBuf::from("./coverage/"),
            env: BTreeMap::new(),
            ignore: Vec::new(),
            test: TestConfig::default(),
            scripts: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load the config at `path`. A missing file gives the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CovtreeError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&content)
            .map_err(|e| CovtreeError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content)?;
        if config.project_path.is_empty() {
            config.project_path = ".".to_string();
        }
        if config.coverage_folder_path.as_os_str().is_empty() {
            config.coverage_folder_path = Config::default().coverage_folder_path;
        }
        if config.test.command.trim().is_empty() {
            config.test.command = TestConfig::default().command;
        }
        Ok(config)
    }

    /// Package pattern handed to `go test`.
    pub fn package_pattern(&self) -> &str {
        if self.project_path == "." {
            "./..."
        } else {
            &self.project_path
        }
    }

    /// Look up a named script.
    pub fn script(&self, name: &str) -> Result<&str> {
        self.scripts.get(name).map(String::as_str).ok_or_else(|| {
            let known: Vec<&str> = self.scripts.keys().map(String::as_str).collect();
            CovtreeError::Config(format!(
                "no script named '{name}' (known: {})",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }

    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules::new(&self.ignore)
    }
}

/// Files and folders excluded from the report. Entries naming a `.go` file
/// are file rules, everything else is a folder rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    files: Vec<String>,
    folders: Vec<String>,
}

impl IgnoreRules {
    pub fn new(entries: &[String]) -> Self {
        let mut rules = Self::default();
        for entry in entries {
            let entry = entry.trim().trim_start_matches("./").trim_end_matches('/');
            if entry.is_empty() {
                continue;
            }
            if entry.contains(".go") {
                rules.files.push(entry.to_string());
            } else {
                rules.folders.push(entry.to_string());
            }
        }
        rules
    }

    /// Whether a file should be left out. `file` is the profile identifier,
    /// `folder` its report-relative folder.
    pub fn excludes(&self, file: &str, folder: &str) -> bool {
        let file_hit = self
            .files
            .iter()
            .any(|rule| file == rule || file.ends_with(&format!("/{rule}")));
        let folder_hit = self.folders.iter().any(|rule| {
            folder == rule
                || folder
                    .strip_prefix(rule.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        file_hit || folder_hit
    }
}
