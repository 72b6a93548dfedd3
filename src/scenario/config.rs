//! Scenario configuration types
//!
//! Defines the data structures for deserializing YAML scenarios.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::http::{FilePayload, Method};
use crate::ledger::SessionState;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario covers
    pub description: Option<String>,
    /// The ordered steps to execute
    pub steps: Vec<Step>,
}

/// A single step in the execution flow
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Issue one check
    Check(CheckStep),
    /// Try each attempt in order until one yields a session.
    /// If none does, the run stops here.
    Authenticate { attempts: Vec<CheckStep> },
}

/// Dependency of a step on the session
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Requires {
    #[default]
    None,
    /// Only issued while a token is held
    Session,
}

/// A check as written in a scenario
#[derive(Deserialize, Debug, Clone)]
pub struct CheckStep {
    pub name: String,
    #[serde(default)]
    pub method: Method,
    /// Path under the API namespace, or under the root with the root sentinel
    pub path: String,
    /// Expected status code
    #[serde(default = "default_expect")]
    pub expect: u16,
    /// JSON body, or the form fields when `form` is set or a file is attached
    pub body: Option<Value>,
    /// Send the body url-encoded
    #[serde(default)]
    pub form: bool,
    /// File to upload as multipart
    pub file: Option<FileSpec>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub requires: Requires,
    /// Only issued when the identity matches
    pub when: Option<IdentityPredicate>,
    /// Variables that must be bound before the step is issued
    #[serde(default)]
    pub needs: Vec<String>,
    /// Notice printed when `needs` are not met
    pub on_missing: Option<String>,
    /// Variables to bind from a successful response: name -> JSON pointer
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
}

fn default_expect() -> u16 {
    200
}

/// A file attached to a check
#[derive(Deserialize, Debug, Clone)]
pub struct FileSpec {
    /// Multipart field name
    pub field: String,
    /// Path to the file, relative to the scenario file
    pub path: PathBuf,
    pub content_type: Option<String>,
    /// Contents, filled in when the scenario is loaded
    #[serde(skip)]
    pub contents: Vec<u8>,
}

impl FileSpec {
    pub fn to_payload(&self) -> FilePayload {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        FilePayload {
            field: self.field.clone(),
            file_name,
            content_type: self.content_type.clone(),
            bytes: self.contents.clone(),
        }
    }
}

/// Identity condition for a step, e.g. `role` in `[guest, student]`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityPredicate {
    pub field: String,
    pub one_of: Vec<String>,
}

impl IdentityPredicate {
    pub fn matches(&self, session: &SessionState) -> bool {
        match session.identity_str(&self.field) {
            Some(value) => self.one_of.iter().any(|v| v == value),
            None => false,
        }
    }
}

impl Scenario {
    /// Load a scenario from a YAML file, reading any attached files
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read scenario '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut scenario = Self::parse(&content)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        scenario.read_files(base_dir)?;
        Ok(scenario)
    }

    /// Parse and validate a scenario from YAML text. Attached files are not read.
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// All check steps in order, including authentication attempts
    pub fn checks(&self) -> impl Iterator<Item = &CheckStep> {
        self.steps.iter().flat_map(|step| match step {
            Step::Check(check) => std::slice::from_ref(check).iter(),
            Step::Authenticate { attempts } => attempts.iter(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_scenario("", "scenario name is empty"));
        }
        if self.steps.is_empty() {
            return Err(Error::invalid_scenario(&self.name, "scenario has no steps"));
        }

        for (i, step) in self.steps.iter().enumerate() {
            if let Step::Authenticate { attempts } = step {
                if attempts.is_empty() {
                    return Err(Error::invalid_scenario(
                        &self.name,
                        format!("step {} authenticates with no attempts", i + 1),
                    ));
                }
            }
        }

        for check in self.checks() {
            check
                .validate()
                .map_err(|reason| Error::invalid_scenario(&self.name, reason))?;
        }
        Ok(())
    }

    fn read_files(&mut self, base_dir: &Path) -> Result<()> {
        for step in &mut self.steps {
            let checks: Vec<&mut CheckStep> = match step {
                Step::Check(check) => vec![check],
                Step::Authenticate { attempts } => attempts.iter_mut().collect(),
            };
            for check in checks {
                if let Some(file) = &mut check.file {
                    let path = if file.path.is_relative() {
                        base_dir.join(&file.path)
                    } else {
                        file.path.clone()
                    };
                    file.contents =
                        std::fs::read(&path).map_err(|e| Error::file_read(&path, &e))?;
                }
            }
        }
        Ok(())
    }
}

impl CheckStep {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("check with path '{}' has no name", self.path));
        }
        if self.path.trim().is_empty() {
            return Err(format!("check '{}' has an empty path", self.name));
        }
        if !(100..=599).contains(&self.expect) {
            return Err(format!(
                "check '{}' expects invalid status {}",
                self.name, self.expect
            ));
        }
        if !self.method.carries_body()
            && (self.body.is_some() || self.form || self.file.is_some())
        {
            return Err(format!(
                "check '{}' uses {} which carries no body",
                self.name, self.method
            ));
        }
        for (var, pointer) in &self.capture {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(format!(
                    "check '{}' captures '{}' with invalid JSON pointer '{}'",
                    self.name, var, pointer
                ));
            }
        }
        Ok(())
    }
}
