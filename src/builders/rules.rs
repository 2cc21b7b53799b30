use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::builders::patterns::PathPattern;
use crate::core::error::{GovernanceError, Result};

/// Starter steering document written by `specsync init`.
pub const DEFAULT_RULES_DOCUMENT: &str = r#"# Steering Rules

## File Correlation Patterns

- `backend/handlers/{module}.py` → `.kiro/specs/app.yaml`
- `backend/handlers/{module}.py` → `tests/unit/test_{module}.py`
- `backend/handlers/{module}.py` → `docs/api/{module}.md`
- `backend/models.py` → `tests/unit/test_models.py`

## Ignore Patterns

### Generated Files
- `**/__pycache__/**`
- `**/*.pyc`
- `**/node_modules/**`

### Configuration Files
- `.kiro/settings/**`

## Validation Priorities

1. **Spec Alignment** (Critical)
2. **Test Coverage** (High)
3. **Documentation** (Medium)
4. **Bridge Contracts** (Low)

## Minimal Change Policy

1. Only necessary - Suggest only the modifications required to restore alignment
2. Preserve structure - Keep existing file layout and naming
3. Incremental fixes - Prefer several small edits over one rewrite
"#;

const IGNORE_SUBSECTIONS: &[&str] = &[
    "Generated Files",
    "Vendor Code",
    "Configuration Files",
    "Non-Functional Changes",
    "Test Fixtures and Utilities",
];

/// A correlation mapping from a source path shape to a related artifact.
#[derive(Debug, Clone)]
pub struct CorrelationRule {
    pub source_pattern: PathPattern,
    pub target_template: String,
}

/// Rules as written in the steering document, before pattern compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRules {
    pub correlations: Vec<(String, String)>,
    pub ignore_patterns: Vec<String>,
    pub priorities: BTreeMap<String, u32>,
    pub minimal_change_policy: BTreeMap<String, String>,
}

impl RawRules {
    pub fn is_empty(&self) -> bool {
        self.correlations.is_empty()
            && self.ignore_patterns.is_empty()
            && self.priorities.is_empty()
            && self.minimal_change_policy.is_empty()
    }
}

/// Immutable snapshot of the parsed governance rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub correlation_rules: Vec<CorrelationRule>,
    pub ignore_patterns: Vec<PathPattern>,
    pub priorities: BTreeMap<String, u32>,
    pub minimal_change_policy: BTreeMap<String, String>,
    pub source_modified_at: Option<DateTime<Utc>>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles raw rules, skipping every pattern that fails to compile.
    ///
    /// Skipped patterns are logged; `RuleValidator` reports them in detail.
    pub fn compile(raw: &RawRules) -> Self {
        let mut correlation_rules = Vec::with_capacity(raw.correlations.len());
        for (source, target) in &raw.correlations {
            match PathPattern::compile(source) {
                Ok(source_pattern) => correlation_rules.push(CorrelationRule {
                    source_pattern,
                    target_template: target.clone(),
                }),
                Err(e) => warn!(pattern = %source, error = %e, "Skipping correlation rule"),
            }
        }

        let mut ignore_patterns: Vec<PathPattern> = Vec::with_capacity(raw.ignore_patterns.len());
        for pattern in &raw.ignore_patterns {
            if ignore_patterns.iter().any(|p| p.as_str() == pattern) {
                continue;
            }
            match PathPattern::compile(pattern) {
                Ok(compiled) => ignore_patterns.push(compiled),
                Err(e) => warn!(pattern = %pattern, error = %e, "Skipping ignore pattern"),
            }
        }

        Self {
            correlation_rules,
            ignore_patterns,
            priorities: raw.priorities.clone(),
            minimal_change_policy: raw.minimal_change_policy.clone(),
            source_modified_at: None,
        }
    }

    /// Parses a steering document and compiles it.
    pub fn from_markdown(content: &str) -> Self {
        Self::compile(&parse_steering_document(content))
    }

    pub fn is_empty(&self) -> bool {
        self.correlation_rules.is_empty()
            && self.ignore_patterns.is_empty()
            && self.priorities.is_empty()
            && self.minimal_change_policy.is_empty()
    }
}

/// Where a `RuleSet` comes from.
pub trait RuleSource: Send + Sync {
    /// Loads a fresh snapshot of the rules.
    fn load(&self) -> Result<RuleSet>;

    /// Modification time of the backing document, `None` if it has none.
    fn modified_at(&self) -> Option<SystemTime>;
}

/// Reads rules from a Markdown steering document on disk.
pub struct SteeringRuleSource {
    path: PathBuf,
}

impl SteeringRuleSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the raw, uncompiled rules. A missing document yields empty rules.
    pub fn load_raw(&self) -> Result<RawRules> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "Steering rules not found, continuing without rules");
            return Ok(RawRules::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| {
            GovernanceError::RuleDocument {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(parse_steering_document(&content))
    }
}

impl RuleSource for SteeringRuleSource {
    fn load(&self) -> Result<RuleSet> {
        let raw = self.load_raw()?;
        let mut rule_set = RuleSet::compile(&raw);
        rule_set.source_modified_at = self.modified_at().map(DateTime::<Utc>::from);
        debug!(
            path = %self.path.display(),
            correlations = rule_set.correlation_rules.len(),
            ignores = rule_set.ignore_patterns.len(),
            "Loaded steering rules"
        );
        Ok(rule_set)
    }

    fn modified_at(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

/// A prebuilt rule set with no backing document.
pub struct StaticRuleSource {
    rule_set: RuleSet,
}

impl StaticRuleSource {
    pub fn new(rule_set: RuleSet) -> Self {
        Self { rule_set }
    }
}

impl RuleSource for StaticRuleSource {
    fn load(&self) -> Result<RuleSet> {
        Ok(self.rule_set.clone())
    }

    fn modified_at(&self) -> Option<SystemTime> {
        None
    }
}

/// The orchestrator's cached rule snapshot.
#[derive(Default)]
pub struct RuleCache {
    rule_set: Option<Arc<RuleSet>>,
    loaded_at: Option<SystemTime>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reloads the rules when nothing is cached yet or the source's
    /// modification time differs from the one seen at the last load.
    ///
    /// Returns `true` when a reload happened. A failed load keeps the previous
    /// snapshot (or an empty one) so that a broken document never aborts a run.
    pub fn reload_if_stale(&mut self, source: &dyn RuleSource) -> bool {
        let current = source.modified_at();
        if self.rule_set.is_some() && current == self.loaded_at {
            return false;
        }

        match source.load() {
            Ok(rule_set) => {
                info!(hot_reload = self.rule_set.is_some(), "Steering rules loaded");
                self.rule_set = Some(Arc::new(rule_set));
            }
            Err(e) => {
                warn!(error = %e, "Failed to load steering rules, keeping previous snapshot");
                if self.rule_set.is_none() {
                    self.rule_set = Some(Arc::new(RuleSet::empty()));
                }
            }
        }
        self.loaded_at = current;
        true
    }

    pub fn rule_set(&self) -> Arc<RuleSet> {
        self.rule_set.clone().unwrap_or_default()
    }

    pub fn invalidate(&mut self) {
        self.rule_set = None;
        self.loaded_at = None;
    }
}

/// Extracts the four rule sections from a steering document.
pub fn parse_steering_document(content: &str) -> RawRules {
    // Static expressions; a failure here would be a programming error caught by tests.
    let correlation = Regex::new(r"^\s*-\s+`([^`]+)`\s*(?:→|->)\s*`([^`]+)`").ok();
    let list_item = Regex::new(r"^\s*-\s+`([^`]+)`").ok();
    let priority = Regex::new(r"(\d+)\.\s+\*\*([^*]+)\*\*\s+\(([^)]+)\)").ok();
    let numbered = Regex::new(r"^\s*\d+\.\s*(.+)$").ok();

    let mut raw = RawRules::default();
    let mut in_ignore_h2 = false;
    let mut in_ignore_h3 = false;
    let mut in_policy = false;

    for line in content.lines() {
        let trimmed = line.trim_start();

        if let Some(title) = trimmed.strip_prefix("### ") {
            in_ignore_h3 = IGNORE_SUBSECTIONS.iter().any(|s| title.contains(s));
            continue;
        }
        if let Some(title) = trimmed.strip_prefix("## ") {
            in_ignore_h2 = title.to_lowercase().contains("ignore");
            in_ignore_h3 = false;
            in_policy = title.contains("Minimal Change Policy");
            continue;
        }
        if trimmed.starts_with("# ") {
            in_ignore_h2 = false;
            in_ignore_h3 = false;
            in_policy = false;
            continue;
        }

        if let Some(caps) = correlation.as_ref().and_then(|re| re.captures(line)) {
            raw.correlations
                .push((caps[1].trim().to_string(), caps[2].trim().to_string()));
            continue;
        }

        if (in_ignore_h2 || in_ignore_h3)
            && let Some(caps) = list_item.as_ref().and_then(|re| re.captures(line))
        {
            raw.ignore_patterns.push(caps[1].trim().to_string());
            continue;
        }

        if let Some(caps) = priority.as_ref().and_then(|re| re.captures(line))
            && let Ok(rank) = caps[1].parse::<u32>()
        {
            raw.priorities.insert(caps[2].trim().to_string(), rank);
            continue;
        }

        if in_policy
            && let Some(caps) = numbered.as_ref().and_then(|re| re.captures(line))
            && let Some((key, value)) = caps[1].split_once(" - ")
        {
            let key = key.trim().trim_matches('*').trim();
            if !key.is_empty() {
                raw.minimal_change_policy
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    #[test]
    fn test_parse_default_document() {
        let raw = parse_steering_document(DEFAULT_RULES_DOCUMENT);

        assert_eq!(raw.correlations.len(), 4);
        assert_eq!(
            raw.correlations[1],
            (
                "backend/handlers/{module}.py".to_string(),
                "tests/unit/test_{module}.py".to_string()
            )
        );
        assert!(raw.ignore_patterns.contains(&"**/__pycache__/**".to_string()));
        assert!(raw.ignore_patterns.contains(&".kiro/settings/**".to_string()));
        assert_eq!(raw.priorities.get("Spec Alignment"), Some(&1));
        assert_eq!(raw.priorities.get("Documentation"), Some(&3));
        assert_eq!(
            raw.minimal_change_policy.get("Only necessary").map(String::as_str),
            Some("Suggest only the modifications required to restore alignment")
        );
    }

    #[test]
    fn test_list_items_outside_ignore_sections_are_not_ignores() {
        let doc = "## Notes\n- `src/**`\n\n### Vendor Code\n- `vendor/**`\n";
        let raw = parse_steering_document(doc);
        assert_eq!(raw.ignore_patterns, vec!["vendor/**".to_string()]);
    }

    #[test]
    fn test_ascii_arrow_correlation() {
        let raw = parse_steering_document("- `src/{m}.rs` -> `tests/{m}.rs`\n");
        assert_eq!(raw.correlations.len(), 1);
    }

    #[test]
    fn test_compile_skips_invalid_patterns() {
        let raw = RawRules {
            correlations: vec![
                ("{a}/{a}.py".to_string(), "x".to_string()),
                ("src/{m}.rs".to_string(), "tests/{m}.rs".to_string()),
            ],
            ignore_patterns: vec!["**/*.pyc".to_string(), "**/*.pyc".to_string()],
            ..RawRules::default()
        };
        let rule_set = RuleSet::compile(&raw);
        assert_eq!(rule_set.correlation_rules.len(), 1);
        assert_eq!(rule_set.ignore_patterns.len(), 1);
    }

    #[test]
    fn test_missing_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = SteeringRuleSource::new(dir.path().join("rules.md"));
        let rule_set = source.load().unwrap();
        assert!(rule_set.is_empty());
        assert!(source.modified_at().is_none());
    }

    #[test]
    fn test_cache_reloads_only_when_mtime_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.md");
        fs::write(&path, "## Ignore\n- `a/**`\n").unwrap();
        let source = SteeringRuleSource::new(&path);
        let mut cache = RuleCache::new();

        assert!(cache.reload_if_stale(&source));
        assert!(!cache.reload_if_stale(&source));
        assert_eq!(cache.rule_set().ignore_patterns.len(), 1);

        fs::write(&path, "## Ignore\n- `a/**`\n- `b/**`\n").unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        assert!(cache.reload_if_stale(&source));
        assert_eq!(cache.rule_set().ignore_patterns.len(), 2);
    }

    #[test]
    fn test_static_source_loads_once() {
        let source = StaticRuleSource::new(RuleSet::from_markdown(DEFAULT_RULES_DOCUMENT));
        let mut cache = RuleCache::new();
        assert!(cache.reload_if_stale(&source));
        assert!(!cache.reload_if_stale(&source));
        cache.invalidate();
        assert!(cache.reload_if_stale(&source));
    }
}
