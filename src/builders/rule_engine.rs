use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::builders::patterns::expand;
use crate::builders::rules::RuleSet;
use crate::builders::suggestions::SuggestionReport;
use crate::core::checks::Issue;
use crate::core::engine::ValidationResult;

/// Priority returned for categories the steering document does not rank.
pub const UNRANKED_PRIORITY: u32 = 999;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    IgnoredFileWithDrift,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPriority {
    High,
    Low,
}

/// A contradiction between an ignore rule and an actual drift signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub file: String,
    pub source_issue: Issue,
    pub message: String,
    pub priority: ConflictPriority,
}

impl Conflict {
    pub fn ignored_file_with_drift(file: &str, issue: &Issue) -> Self {
        Self {
            conflict_type: ConflictType::IgnoredFileWithDrift,
            file: file.to_string(),
            source_issue: issue.clone(),
            message: format!(
                "Drift detected in '{file}'. Note: This file matches an ignore pattern in steering rules. \
                 If this is intentional, update the spec and steering rules."
            ),
            priority: ConflictPriority::High,
        }
    }

    /// Key the orchestrator deduplicates conflicts by before reporting them.
    pub fn dedup_key(&self) -> (ConflictType, &str, &str) {
        (
            self.conflict_type,
            self.file.as_str(),
            self.source_issue.description.as_deref().unwrap_or(""),
        )
    }
}

/// Applies one `RuleSet` snapshot to a set of staged paths.
pub struct RuleEngine {
    rules: Arc<RuleSet>,
}

impl RuleEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Maps every file to the targets of the correlation rules it matches.
    ///
    /// Rules are tried in declaration order; targets are deduplicated keeping
    /// first-insertion order. Every input file gets an entry, possibly empty.
    pub fn apply_correlation_patterns(&self, files: &[String]) -> BTreeMap<String, Vec<String>> {
        let mut mappings = BTreeMap::new();

        for file in files {
            let mut related: Vec<String> = Vec::new();
            for rule in &self.rules.correlation_rules {
                let Some(captures) = rule.source_pattern.captures(file) else {
                    continue;
                };
                let target = expand(&captures, &rule.target_template);
                if target.contains('{') && target != rule.target_template {
                    debug!(file = %file, target = %target, "Correlation target partially expanded");
                }
                if !related.contains(&target) {
                    related.push(target);
                }
            }
            mappings.insert(file.clone(), related);
        }

        mappings
    }

    /// Drops every file matching any ignore pattern, preserving input order.
    pub fn filter_ignored(&self, files: &[String]) -> Vec<String> {
        files
            .iter()
            .filter(|file| !self.is_ignored(file))
            .cloned()
            .collect()
    }

    pub fn is_ignored(&self, file: &str) -> bool {
        self.rules
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(file))
    }

    /// Correlated targets that are themselves ignored.
    ///
    /// Drift reported against such a target is masked by the ignore rule just
    /// like drift on an ignored staged file, so the orchestrator folds these
    /// into the conflict check.
    pub fn ignored_targets(&self, mappings: &BTreeMap<String, Vec<String>>) -> Vec<String> {
        let mut seen = BTreeSet::new();
        mappings
            .values()
            .flatten()
            .filter(|target| self.is_ignored(target))
            .filter(|target| seen.insert(target.as_str()))
            .cloned()
            .collect()
    }

    /// Emits one high-priority conflict per issue naming an ignored file.
    ///
    /// Ignored files are `all_files - filtered_files`. Duplicates are kept;
    /// callers deduplicate by `Conflict::dedup_key`.
    pub fn detect_conflicts(
        &self,
        issues: &[&Issue],
        filtered_files: &[String],
        all_files: &[String],
    ) -> Vec<Conflict> {
        let filtered: BTreeSet<&str> = filtered_files.iter().map(String::as_str).collect();
        let ignored: BTreeSet<&str> = all_files
            .iter()
            .map(String::as_str)
            .filter(|file| !filtered.contains(file))
            .collect();

        let conflicts: Vec<Conflict> = issues
            .iter()
            .filter_map(|issue| {
                let file = issue.file.as_deref()?;
                ignored
                    .contains(file)
                    .then(|| Conflict::ignored_file_with_drift(file, issue))
            })
            .collect();

        for conflict in &conflicts {
            warn!(file = %conflict.file, "Drift reported on a file matched by an ignore rule");
        }
        conflicts
    }

    /// Folds conflicts into a result. Alignment wins over ignore rules: any
    /// high-priority conflict blocks the commit whatever the checkers said.
    pub fn prioritize_alignment_over_rules(
        conflicts: &[Conflict],
        mut result: ValidationResult,
    ) -> ValidationResult {
        if conflicts.is_empty() {
            return result;
        }

        let summary = conflicts
            .iter()
            .map(|conflict| format!("  - {}", conflict.message))
            .collect::<Vec<_>>()
            .join("\n");
        result
            .message
            .push_str(&format!("\n\n⚠️ STEERING RULE CONFLICTS:\n{summary}"));
        result.conflicts.extend(conflicts.iter().cloned());

        if conflicts
            .iter()
            .any(|conflict| conflict.priority == ConflictPriority::High)
        {
            result.success = false;
            result.allow_commit = false;
        }
        result
    }

    /// Steering rank for an issue category; lower is more important.
    pub fn priority_for(&self, category: &str) -> u32 {
        let name = match category {
            "spec" | "drift" => "Spec Alignment",
            "test" => "Test Coverage",
            "doc" => "Documentation",
            "bridge" => "Bridge Contracts",
            other => other,
        };
        self.rules
            .priorities
            .get(name)
            .copied()
            .unwrap_or(UNRANKED_PRIORITY)
    }

    /// Stable sort by the steering rank of each issue's type.
    pub fn sort_issues_by_priority(&self, mut issues: Vec<Issue>) -> Vec<Issue> {
        issues.sort_by_key(|issue| self.priority_for(&issue.issue_type));
        issues
    }

    /// Attaches the steering policy notes to a suggestion report.
    pub fn apply_minimal_change_policy(&self, mut report: SuggestionReport) -> SuggestionReport {
        report.minimal_change_policy = self.rules.minimal_change_policy.clone();
        report
    }
}
