use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::builders::rules::{DEFAULT_RULES_DOCUMENT, SteeringRuleSource};
use crate::builders::validator::{RuleValidator, StandardRuleValidator};
use crate::core::checks::CheckKind;
use crate::core::error::GovernanceError;

pub const CONFIG_RELATIVE_PATH: &str = ".kiro/settings/specsync.toml";

/// The four checker toggles. Every check is enabled unless switched off.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationToggles {
    pub check_spec_alignment: bool,
    pub check_test_coverage: bool,
    pub check_documentation: bool,
    pub check_bridge_contracts: bool,
}

impl Default for ValidationToggles {
    fn default() -> Self {
        Self {
            check_spec_alignment: true,
            check_test_coverage: true,
            check_documentation: true,
            check_bridge_contracts: true,
        }
    }
}

impl ValidationToggles {
    pub fn enabled(&self, kind: CheckKind) -> bool {
        match kind {
            CheckKind::Drift => self.check_spec_alignment,
            CheckKind::Test => self.check_test_coverage,
            CheckKind::Documentation => self.check_documentation,
            CheckKind::Bridge => self.check_bridge_contracts,
        }
    }
}

/// An external command producing one category's report.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CheckerCommand {
    pub command: Vec<String>,
    /// Artifact the checker needs; when absent the checker declines to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GovernanceConfig {
    pub version: String,
    pub timeout_secs: u64,
    pub rules_path: String,
    pub spec_path: String,
    pub validation: ValidationToggles,
    /// Keyed by category: `drift`, `test`, `doc`, `bridge`.
    pub checkers: BTreeMap<String, CheckerCommand>,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            timeout_secs: 30,
            rules_path: ".kiro/steering/rules.md".to_string(),
            spec_path: ".kiro/specs/app.yaml".to_string(),
            validation: ValidationToggles::default(),
            checkers: BTreeMap::new(),
        }
    }
}

impl GovernanceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn checker_for(&self, kind: CheckKind) -> Option<&CheckerCommand> {
        self.checkers.get(&kind.to_string())
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    repo_root: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let repo_root = find_git_root()?;
        Ok(Self::new_at(repo_root))
    }

    /// A manager rooted at an explicit repository directory.
    pub fn new_at<P: AsRef<Path>>(repo_root: P) -> Self {
        let repo_root = repo_root.as_ref().to_path_buf();
        Self {
            config_path: repo_root.join(CONFIG_RELATIVE_PATH),
            repo_root,
        }
    }

    /// Writes the default configuration and a starter steering document,
    /// leaving existing files alone.
    pub fn initialize(&self) -> Result<()> {
        if !self.config_path.exists() {
            self.save_config(&GovernanceConfig::default())?;
            info!(path = %self.config_path.display(), "Wrote default configuration");
        }

        let config = self.load_config()?;
        let rules_path = self.repo_root.join(&config.rules_path);
        if !rules_path.exists() {
            if let Some(parent) = rules_path.parent() {
                fs::create_dir_all(parent).context("Failed to create steering directory")?;
            }
            fs::write(&rules_path, DEFAULT_RULES_DOCUMENT)
                .context("Failed to write steering rules")?;
            info!(path = %rules_path.display(), "Wrote starter steering rules");
        }
        Ok(())
    }

    /// Lints the configuration and the steering document it points at.
    pub fn collect_issues(&self) -> Result<Vec<String>> {
        let config = self.load_config()?;
        let mut issues = Vec::new();

        if config.version != "1.0" {
            issues.push(format!("Unsupported config version: {}", config.version));
        }
        if config.timeout_secs == 0 {
            issues.push("timeout_secs must be greater than zero".to_string());
        }

        let known: Vec<String> = CheckKind::ORDER.iter().map(|k| k.to_string()).collect();
        for (name, checker) in &config.checkers {
            if !known.contains(name) {
                issues.push(format!(
                    "Unknown checker category '{name}' (expected one of: {})",
                    known.join(", ")
                ));
            }
            if checker.command.is_empty() {
                issues.push(format!("Checker '{name}' has an empty command"));
            }
        }

        let source = SteeringRuleSource::new(self.repo_root.join(&config.rules_path));
        if source.path().exists() {
            let raw = source.load_raw()?;
            issues.extend(StandardRuleValidator::new().validate_rules(&raw));
        } else {
            issues.push(format!("Steering rules not found: {}", config.rules_path));
        }

        debug!(issues = issues.len(), "Configuration linted");
        Ok(issues)
    }

    pub fn validate_config(&self) -> Result<()> {
        let issues = self.collect_issues()?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    pub fn rules_source(&self) -> Result<SteeringRuleSource> {
        let config = self.load_config()?;
        Ok(SteeringRuleSource::new(self.repo_root.join(config.rules_path)))
    }

    pub fn get_repo_root(&self) -> &Path {
        &self.repo_root
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<GovernanceConfig>;
    fn save_config(&self, config: &GovernanceConfig) -> Result<()>;
    fn get_config_path(&self) -> Result<PathBuf>;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<GovernanceConfig> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "No configuration file, using defaults");
            return Ok(GovernanceConfig::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    fn save_config(&self, config: &GovernanceConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }
        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        Ok(self.config_path.clone())
    }
}

/// Serializes any record as `json`, `yaml` or `toml`.
pub fn serialize_as<T: Serialize>(value: &T, format: &str) -> Result<String> {
    match format {
        "json" => serde_json::to_string_pretty(value).context("Failed to serialize to JSON"),
        "yaml" => serde_yaml::to_string(value).context("Failed to serialize to YAML"),
        "toml" => toml::to_string_pretty(value).context("Failed to serialize to TOML"),
        other => Err(GovernanceError::Config(format!("Unsupported export format: {other}")).into()),
    }
}

fn find_git_root() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    let mut dir = current_dir.as_path();

    loop {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => anyhow::bail!("Not in a Git repository"),
        }
    }
}
