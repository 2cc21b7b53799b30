use std::collections::{BTreeMap, HashSet};

use crate::builders::patterns::{PathPattern, template_placeholders};
use crate::builders::rules::RawRules;

/// The `RuleValidator` trait defines the public interface for linting a
/// steering document before its rules are used.
///
/// Compilation is lenient (bad patterns are skipped at load time), so this is
/// where problems with the document are surfaced to the user.
pub trait RuleValidator {
    /// Performs a full lint of the raw rules and returns a list of issues.
    ///
    /// # Arguments
    /// * `rules`: The uncompiled rules as read from the steering document.
    ///
    /// # Returns
    /// A `Vec<String>` where each string describes one problem.
    fn validate_rules(&self, rules: &RawRules) -> Vec<String>;

    /// Validates a single correlation rule.
    fn validate_correlation(&self, source: &str, target: &str) -> Vec<String>;
}

/// The `StandardRuleValidator` is the default implementation of `RuleValidator`.
pub struct StandardRuleValidator;

impl StandardRuleValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks for ignore patterns listed more than once, and for correlation
    /// sources that are ignored verbatim (their drift could never be checked).
    fn check_pattern_conflicts(&self, rules: &RawRules) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for pattern in &rules.ignore_patterns {
            if !seen.insert(pattern.as_str()) {
                warnings.push(format!("Duplicate ignore pattern: {pattern}"));
            }
        }

        let mut reported = HashSet::new();
        for (source, _) in &rules.correlations {
            if seen.contains(source.as_str()) && reported.insert(source.as_str()) {
                warnings.push(format!(
                    "Correlation source '{source}' is also an ignore pattern"
                ));
            }
        }
        warnings
    }

    /// Two categories sharing a rank make the ordering ambiguous.
    fn check_priority_ranks(&self, priorities: &BTreeMap<String, u32>) -> Vec<String> {
        let mut by_rank: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for (category, rank) in priorities {
            by_rank.entry(*rank).or_default().push(category);
        }
        by_rank
            .into_iter()
            .filter(|(_, categories)| categories.len() > 1)
            .map(|(rank, categories)| {
                format!("Priority {rank} is shared by: {}", categories.join(", "))
            })
            .collect()
    }
}

impl Default for StandardRuleValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleValidator for StandardRuleValidator {
    fn validate_rules(&self, rules: &RawRules) -> Vec<String> {
        if rules.is_empty() {
            return vec!["Steering document defines no rules".to_string()];
        }

        let mut issues = Vec::new();
        for (source, target) in &rules.correlations {
            issues.extend(self.validate_correlation(source, target));
        }

        for pattern in &rules.ignore_patterns {
            if let Err(e) = PathPattern::compile(pattern) {
                issues.push(e.to_string());
            }
        }

        issues.extend(self.check_pattern_conflicts(rules));
        issues.extend(self.check_priority_ranks(&rules.priorities));
        issues
    }

    fn validate_correlation(&self, source: &str, target: &str) -> Vec<String> {
        let pattern = match PathPattern::compile(source) {
            Ok(pattern) => pattern,
            Err(e) => return vec![e.to_string()],
        };

        // Unknown placeholders are left unexpanded at run time.
        template_placeholders(target)
            .into_iter()
            .filter(|name| !pattern.capture_names().contains(name))
            .map(|name| {
                format!("Target '{target}' uses {{{name}}} which '{source}' does not capture")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::rules::{DEFAULT_RULES_DOCUMENT, parse_steering_document};

    #[test]
    fn test_default_document_is_clean() {
        let raw = parse_steering_document(DEFAULT_RULES_DOCUMENT);
        assert!(StandardRuleValidator::new().validate_rules(&raw).is_empty());
    }

    #[test]
    fn test_empty_document() {
        let issues = StandardRuleValidator::new().validate_rules(&RawRules::default());
        assert_eq!(issues, vec!["Steering document defines no rules".to_string()]);
    }

    #[test]
    fn test_reports_each_problem() {
        let mut raw = RawRules {
            correlations: vec![
                ("backend/{module}.py".to_string(), "docs/{section}/{module}.md".to_string()),
                ("{a}/{a}.py".to_string(), "x".to_string()),
                ("vendor/**".to_string(), "docs/vendor.md".to_string()),
            ],
            ignore_patterns: vec!["vendor/**".to_string(), "vendor/**".to_string()],
            ..RawRules::default()
        };
        raw.priorities.insert("Spec Alignment".to_string(), 1);
        raw.priorities.insert("Test Coverage".to_string(), 1);

        let issues = StandardRuleValidator::new().validate_rules(&raw);
        assert!(issues.iter().any(|i| i.contains("{section}")));
        assert!(issues.iter().any(|i| i.contains("Invalid path pattern '{a}/{a}.py'")));
        assert!(issues.iter().any(|i| i == "Duplicate ignore pattern: vendor/**"));
        assert!(issues.iter().any(|i| i.contains("'vendor/**' is also an ignore pattern")));
        assert!(issues.iter().any(|i| i.starts_with("Priority 1 is shared by")));
    }
}
