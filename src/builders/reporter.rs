use std::fmt::Write as _;
use std::time::Duration;

use crate::builders::rule_engine::RuleEngine;
use crate::builders::suggestions::{HIGH_PRIORITY, MEDIUM_PRIORITY, SuggestionReport};
use crate::core::checks::CheckKind;
use crate::core::engine::{TimingRecord, ValidationResult};

/// Share of the timeout above which the timing summary warns.
const TIMEOUT_WARNING_RATIO: f64 = 0.8;

pub trait StatusReporter {
    /// Renders a validation result for a terminal.
    fn render(&self, result: &ValidationResult) -> String;
}

/// A concrete implementation of `StatusReporter` producing plain text.
///
/// This is the reporter used by the `validate` command and the pre-commit hook.
pub struct ConsoleReporter<'a> {
    /// Orders each category's issues by steering priority when present.
    rule_engine: Option<&'a RuleEngine>,
}

impl<'a> ConsoleReporter<'a> {
    pub fn new() -> Self {
        Self { rule_engine: None }
    }

    pub fn with_rule_engine(rule_engine: &'a RuleEngine) -> Self {
        Self {
            rule_engine: Some(rule_engine),
        }
    }

    fn header(&self, result: &ValidationResult, out: &mut String) {
        if result.success {
            out.push_str("✓ VALIDATION PASSED\n");
        } else {
            out.push_str("✗ VALIDATION FAILED\n");
        }
        if result.timed_out {
            out.push_str("⚠ TIMEOUT - Partial results returned\n");
        }
        if !result.staging_area_preserved {
            out.push_str("⚠ CRITICAL: Staging area was modified during validation\n");
            if let Some(error) = &result.staging_area_error {
                let _ = writeln!(out, "   {error}");
            }
        }
        let _ = writeln!(out, "\n{}\n", result.message);
    }

    fn performance(&self, timing: &TimingRecord, out: &mut String) {
        out.push_str("--- Performance ---\n");
        let _ = writeln!(out, "Total validation time: {:.3}s", timing.total);
        for kind in CheckKind::ORDER {
            if let Some(duration) = timing.get(kind.step_name()) {
                let _ = writeln!(out, "  {}: {duration:.3}s", title_case(kind.step_name()));
            }
        }
        out.push('\n');
    }

    fn issues(&self, result: &ValidationResult, out: &mut String) {
        let mut kinds = CheckKind::ORDER.to_vec();
        if let Some(engine) = self.rule_engine {
            kinds.sort_by_key(|kind| engine.priority_for(&kind.to_string()));
        }

        for kind in kinds {
            let Some(report) = result.reports.get(kind) else {
                continue;
            };
            if !report.has_issues {
                if kind == CheckKind::Bridge && !report.dependencies_checked.is_empty() {
                    let _ = writeln!(
                        out,
                        "--- Bridge Contract Status ---\n✓ All API calls align with contracts ({} dependencies)\n",
                        report.dependencies_checked.len()
                    );
                }
                continue;
            }

            let _ = writeln!(out, "--- {} Issues ---", title_case(kind.issue_label()));
            let _ = writeln!(out, "Total {} issues: {}", kind.issue_label(), report.issue_count());
            let issues = match self.rule_engine {
                Some(engine) => engine.sort_issues_by_priority(report.issues.clone()),
                None => report.issues.clone(),
            };
            for issue in &issues {
                let _ = writeln!(
                    out,
                    "  [{}] {}: {}",
                    issue.issue_type,
                    issue.file.as_deref().unwrap_or("-"),
                    issue.description.as_deref().unwrap_or("")
                );
            }
            if kind == CheckKind::Bridge && !report.dependencies_checked.is_empty() {
                let _ = writeln!(out, "Dependencies checked: {}", report.dependencies_checked.join(", "));
            }
            out.push('\n');
        }

        if !result.checker_errors.is_empty() {
            out.push_str("--- Checker Errors ---\n");
            for (category, error) in &result.checker_errors {
                let _ = writeln!(out, "  {category}: {error}");
            }
            out.push('\n');
        }
    }

    fn suggestions(&self, report: &SuggestionReport, out: &mut String) {
        let summary = &report.summary;
        out.push_str("--- Suggestions ---\n");
        let _ = writeln!(out, "Total suggestions: {}", summary.total);
        let _ = writeln!(out, "  - Spec updates: {}", summary.by_type.spec);
        let _ = writeln!(out, "  - Test additions: {}", summary.by_type.test);
        let _ = writeln!(out, "  - Documentation updates: {}", summary.by_type.doc);
        if summary.by_type.bridge > 0 {
            let _ = writeln!(out, "  - Contract fixes: {}", summary.by_type.bridge);
        }
        let _ = writeln!(
            out,
            "Priority breakdown: {} high ({HIGH_PRIORITY}+), {} medium ({MEDIUM_PRIORITY}-{}), {} low",
            summary.high,
            summary.medium,
            HIGH_PRIORITY - 1,
            summary.low
        );
        out.push('\n');

        for (i, suggestion) in report.ordered.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{}] Priority {}",
                i + 1,
                suggestion.suggestion_type.to_string().to_uppercase(),
                suggestion.priority
            );
            let _ = writeln!(out, "   File: {}", suggestion.file);
            let _ = writeln!(out, "   Description: {}", suggestion.description);
            if !suggestion.action.is_empty() {
                let _ = writeln!(out, "   Action: {}", suggestion.action);
            }
            let _ = writeln!(out, "   Rationale: {}", suggestion.rationale);
            out.push('\n');
        }

        if !report.minimal_change_policy.is_empty() {
            out.push_str("Minimal change policy:\n");
            for (key, value) in &report.minimal_change_policy {
                let _ = writeln!(out, "  - {key}: {value}");
            }
        }
    }
}

impl Default for ConsoleReporter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for ConsoleReporter<'_> {
    fn render(&self, result: &ValidationResult) -> String {
        let mut out = String::new();
        self.header(result, &mut out);
        self.performance(&result.timing, &mut out);
        self.issues(result, &mut out);

        if !result.conflicts.is_empty() {
            let _ = writeln!(out, "--- Steering Rule Conflicts ({}) ---", result.conflicts.len());
            for conflict in &result.conflicts {
                let _ = writeln!(out, "  - {}", conflict.file);
            }
            out.push('\n');
        }

        // A timed-out run carries no suggestions; partial reports may mislead.
        if !result.timed_out
            && let Some(report) = &result.suggestions
            && !report.is_empty()
        {
            self.suggestions(report, &mut out);
        }
        out.trim_end().to_string()
    }
}

/// Steps longest-first, with a warning once the total exceeds 80% of the timeout.
pub fn timing_summary(timing: Option<&TimingRecord>, timeout: Duration) -> String {
    let Some(timing) = timing.filter(|t| !t.steps.is_empty()) else {
        return "No timing data available".to_string();
    };

    let mut steps: Vec<(&String, &f64)> = timing.steps.iter().collect();
    steps.sort_by(|a, b| b.1.total_cmp(a.1));

    let rule = "-".repeat(40);
    let mut out = format!("Validation Performance Summary:\n{rule}\n");
    for (step, duration) in steps {
        let _ = writeln!(out, "  {}: {duration:.3}s", title_case(step));
    }
    let _ = write!(out, "{rule}\n  Total: {:.3}s", timing.total);

    let limit = timeout.as_secs_f64();
    if timing.total > limit * TIMEOUT_WARNING_RATIO {
        let _ = write!(out, "\n  ⚠ Warning: Approaching timeout limit ({limit}s)");
    }
    out
}

fn title_case(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
