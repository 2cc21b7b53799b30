//! Checker contract and the typed reports the governance layer consumes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// The four independent report producers, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Drift,
    Test,
    Documentation,
    Bridge,
}

impl CheckKind {
    /// Fixed execution order: drift, test, documentation, bridge.
    pub const ORDER: [CheckKind; 4] = [
        CheckKind::Drift,
        CheckKind::Test,
        CheckKind::Documentation,
        CheckKind::Bridge,
    ];

    /// Key used in the timing record.
    pub fn step_name(&self) -> &'static str {
        match self {
            CheckKind::Drift => "drift_detection",
            CheckKind::Test => "test_coverage",
            CheckKind::Documentation => "documentation",
            CheckKind::Bridge => "bridge_validation",
        }
    }

    /// Wording used in the aggregate message.
    pub fn issue_label(&self) -> &'static str {
        match self {
            CheckKind::Drift => "drift",
            CheckKind::Test => "test coverage",
            CheckKind::Documentation => "documentation",
            CheckKind::Bridge => "contract drift",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Drift => write!(f, "drift"),
            CheckKind::Test => write!(f, "test"),
            CheckKind::Documentation => write!(f, "doc"),
            CheckKind::Bridge => write!(f, "bridge"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

/// Extra payload carried by bridge-contract issues.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BridgeDetails {
    #[serde(default)]
    pub dependency: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub location: String,
}

/// A single finding reported by a checker.
///
/// `file` and `description` are optional on the wire: checkers are external
/// and may send incomplete data, which the suggestion engine handles explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    #[serde(rename = "type", default)]
    pub issue_type: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BridgeDetails>,
}

impl Issue {
    pub fn new(issue_type: &str, file: &str, description: &str) -> Self {
        Self {
            issue_type: issue_type.to_string(),
            file: Some(file.to_string()),
            description: Some(description.to_string()),
            ..Self::default()
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    pub fn with_details(mut self, details: BridgeDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// The shape every checker report shares.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckReport {
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub total_issues: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Only populated by bridge checkers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies_checked: Vec<String>,
}

impl CheckReport {
    /// A report with no findings.
    pub fn clean() -> Self {
        Self::default()
    }

    /// A report whose flag and count are derived from `issues`.
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        Self {
            has_issues: !issues.is_empty(),
            total_issues: issues.len(),
            issues,
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Number of issues, falling back to the list length when the
    /// checker did not fill in `total_issues`.
    pub fn issue_count(&self) -> usize {
        if self.total_issues == 0 {
            self.issues.len()
        } else {
            self.total_issues
        }
    }
}

/// The per-category reports of one run. `None` means the category was
/// disabled, declined to run, or did not finish.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reports {
    pub drift_report: Option<CheckReport>,
    pub test_report: Option<CheckReport>,
    pub doc_report: Option<CheckReport>,
    pub bridge_report: Option<CheckReport>,
}

impl Reports {
    pub fn get(&self, kind: CheckKind) -> Option<&CheckReport> {
        match kind {
            CheckKind::Drift => self.drift_report.as_ref(),
            CheckKind::Test => self.test_report.as_ref(),
            CheckKind::Documentation => self.doc_report.as_ref(),
            CheckKind::Bridge => self.bridge_report.as_ref(),
        }
    }

    pub fn set(&mut self, kind: CheckKind, report: Option<CheckReport>) {
        match kind {
            CheckKind::Drift => self.drift_report = report,
            CheckKind::Test => self.test_report = report,
            CheckKind::Documentation => self.doc_report = report,
            CheckKind::Bridge => self.bridge_report = report,
        }
    }

    /// Every issue across all present reports, in category order.
    pub fn all_issues(&self) -> Vec<&Issue> {
        CheckKind::ORDER
            .iter()
            .filter_map(|kind| self.get(*kind))
            .flat_map(|report| report.issues.iter())
            .collect()
    }
}

/// An independent report producer.
///
/// Returning `Ok(None)` means the checker declined to run, typically because
/// an artifact it needs is absent; that is "nothing validated", not a failure.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn run(&self, files: &[String]) -> Result<Option<CheckReport>>;
}

/// The registered checkers, at most one per category.
#[derive(Default)]
pub struct CheckerSet {
    drift: Option<Box<dyn Checker>>,
    test: Option<Box<dyn Checker>>,
    documentation: Option<Box<dyn Checker>>,
    bridge: Option<Box<dyn Checker>>,
}

impl CheckerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: CheckKind, checker: Box<dyn Checker>) {
        let slot = match kind {
            CheckKind::Drift => &mut self.drift,
            CheckKind::Test => &mut self.test,
            CheckKind::Documentation => &mut self.documentation,
            CheckKind::Bridge => &mut self.bridge,
        };
        *slot = Some(checker);
    }

    pub fn get(&self, kind: CheckKind) -> Option<&dyn Checker> {
        match kind {
            CheckKind::Drift => self.drift.as_deref(),
            CheckKind::Test => self.test.as_deref(),
            CheckKind::Documentation => self.documentation.as_deref(),
            CheckKind::Bridge => self.bridge.as_deref(),
        }
    }
}

/// A checker backed by an external command that prints a JSON `CheckReport`.
///
/// The staged files are appended to the command line. The child process is
/// killed if the run deadline drops the future.
pub struct CommandChecker {
    name: String,
    command: Vec<String>,
    requires: Option<PathBuf>,
    working_dir: PathBuf,
}

impl CommandChecker {
    pub fn new(name: &str, command: Vec<String>, working_dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            command,
            requires: None,
            working_dir,
        }
    }

    /// Declines to run when `artifact` does not exist.
    pub fn requiring(mut self, artifact: PathBuf) -> Self {
        self.requires = Some(artifact);
        self
    }
}

#[async_trait]
impl Checker for CommandChecker {
    async fn run(&self, files: &[String]) -> Result<Option<CheckReport>> {
        if let Some(artifact) = &self.requires
            && !artifact.exists()
        {
            debug!(checker = %self.name, artifact = %artifact.display(), "Required artifact absent, declining");
            return Ok(None);
        }

        let Some((exe, args)) = self.command.split_first() else {
            anyhow::bail!("Checker {} has empty command", self.name);
        };

        let output = Command::new(exe)
            .args(args)
            .args(files)
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to spawn checker {}", self.name))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            if output.status.success() {
                return Ok(Some(CheckReport::clean()));
            }
            anyhow::bail!(
                "Checker {} exited with {} and no report: {}",
                self.name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let report: CheckReport = serde_json::from_str(&stdout)
            .with_context(|| format!("Checker {} produced an invalid report", self.name))?;
        Ok(Some(report))
    }
}
