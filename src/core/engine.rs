use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::builders::rule_engine::{Conflict, RuleEngine};
use crate::builders::rules::{RuleCache, RuleSource};
use crate::builders::suggestions::{SuggestionEngine, SuggestionReport};
use crate::core::checks::{CheckKind, CheckReport, CheckerSet, Reports};
use crate::core::config::{GovernanceConfig, ValidationToggles};
use crate::core::git::StagingAreaProbe;
use crate::core::integrity::{capture_state, verify_unchanged};

pub const NOTHING_TO_VALIDATE: &str = "No files to validate (all files ignored by steering rules)";
pub const ALL_PASSED: &str = "All validations passed - commit can proceed";

const STEP_CONTEXT: &str = "context_initialization";
const STEP_RULES: &str = "steering_rules";
const STEP_FILTERING: &str = "rule_filtering";
const STEP_AGGREGATION: &str = "aggregation";
const STEP_SUGGESTIONS: &str = "suggestion_generation";

/// Where an orchestration run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    RulesLoaded,
    ContextBuilt,
    Filtering,
    Checking,
    Aggregating,
    SuggestionGeneration,
    StagingVerification,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone)]
pub struct ValidationSettings {
    pub timeout: Duration,
    pub toggles: ValidationToggles,
    pub spec_path: String,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self::from_config(&GovernanceConfig::default())
    }
}

impl ValidationSettings {
    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self {
            timeout: config.timeout(),
            toggles: config.validation,
            spec_path: config.spec_path.clone(),
        }
    }
}

/// Input of one run.
#[derive(Debug, Clone, Default)]
pub struct ValidationRequest {
    pub branch: String,
    pub staged_files: Vec<String>,
}

impl ValidationRequest {
    pub fn new(branch: &str, staged_files: Vec<String>) -> Self {
        Self {
            branch: branch.to_string(),
            staged_files,
        }
    }
}

/// Per-run state, owned by exactly one run and discarded at its end.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub branch: String,
    pub staged_files: Vec<String>,
    pub filtered_files: Vec<String>,
    pub file_mappings: BTreeMap<String, Vec<String>>,
    pub priorities: BTreeMap<String, u32>,
    pub minimal_change_policy: BTreeMap<String, String>,
}

impl ValidationContext {
    /// Staged paths are deduplicated keeping their first position.
    pub fn new(branch: &str, staged_files: &[String]) -> Self {
        let mut seen = BTreeSet::new();
        let staged_files = staged_files
            .iter()
            .filter(|file| seen.insert(file.as_str()))
            .cloned()
            .collect();
        Self {
            branch: branch.to_string(),
            staged_files,
            ..Self::default()
        }
    }

    /// Applies the rule engine: ignore filtering, correlations, rule metadata.
    pub fn apply_rules(&mut self, engine: &RuleEngine) {
        self.filtered_files = engine.filter_ignored(&self.staged_files);
        self.file_mappings = engine.apply_correlation_patterns(&self.staged_files);
        self.priorities = engine.rules().priorities.clone();
        self.minimal_change_policy = engine.rules().minimal_change_policy.clone();
    }
}

/// Step durations in seconds. Replaced wholesale on every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimingRecord {
    pub steps: BTreeMap<String, f64>,
    pub total: f64,
}

impl TimingRecord {
    pub fn record(&mut self, step: &str, elapsed: Duration) {
        self.steps.insert(step.to_string(), elapsed.as_secs_f64());
    }

    pub fn get(&self, step: &str) -> Option<f64> {
        self.steps.get(step).copied()
    }
}

/// The terminal artifact of a run; the only thing callers see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub branch: String,
    pub success: bool,
    pub message: String,
    pub allow_commit: bool,
    pub total_issues: usize,
    #[serde(flatten)]
    pub reports: Reports,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<SuggestionReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<Conflict>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checker_errors: BTreeMap<String, String>,
    pub timing: TimingRecord,
    pub timed_out: bool,
    pub partial_results: bool,
    pub staging_area_preserved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_area_error: Option<String>,
}

impl ValidationResult {
    /// An undecided result: commit-blocking until a verdict is set.
    pub fn new(branch: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            branch: branch.to_string(),
            success: false,
            message: String::new(),
            allow_commit: false,
            total_issues: 0,
            reports: Reports::default(),
            suggestions: None,
            conflicts: Vec::new(),
            checker_errors: BTreeMap::new(),
            timing: TimingRecord::default(),
            timed_out: false,
            partial_results: false,
            staging_area_preserved: true,
            staging_area_error: None,
        }
    }

    fn passed(branch: &str, message: &str) -> Self {
        let mut result = Self::new(branch);
        result.success = true;
        result.allow_commit = true;
        result.message = message.to_string();
        result
    }

    /// A staging mismatch overrides every other verdict.
    pub fn mark_staging_modified(&mut self, error: &str) {
        self.staging_area_preserved = false;
        self.staging_area_error = Some(error.to_string());
        self.success = false;
        self.allow_commit = false;
        self.message = format!("CRITICAL ERROR: {error}");
    }
}

/// What a run has produced so far. Survives the pipeline being cancelled.
#[derive(Default)]
struct PartialRun {
    reports: Reports,
    checker_errors: BTreeMap<String, String>,
    timing: TimingRecord,
    in_flight: Option<(&'static str, Instant)>,
}

impl PartialRun {
    fn begin(&mut self, step: &'static str) -> Instant {
        let started = Instant::now();
        self.in_flight = Some((step, started));
        started
    }

    fn finish(&mut self, step: &'static str, started: Instant) {
        self.timing.record(step, started.elapsed());
        self.in_flight = None;
    }

    /// Records how long the interrupted step had been running.
    fn close_in_flight(&mut self) {
        if let Some((step, started)) = self.in_flight.take() {
            self.timing.record(step, started.elapsed());
        }
    }
}

/// Coordinates rule application, checkers, aggregation and suggestions under
/// one deadline, and guarantees the staging area is left untouched.
///
/// `validate` takes `&mut self`: one run at a time per orchestrator. Share it
/// across tasks behind a `tokio::sync::Mutex`.
pub struct ValidationOrchestrator {
    rule_source: Box<dyn RuleSource>,
    rule_cache: RuleCache,
    checkers: CheckerSet,
    probe: Box<dyn StagingAreaProbe>,
    settings: ValidationSettings,
    suggestion_engine: SuggestionEngine,
    state: RunState,
    last_timing: Option<TimingRecord>,
}

impl ValidationOrchestrator {
    pub fn new(
        rule_source: Box<dyn RuleSource>,
        checkers: CheckerSet,
        probe: Box<dyn StagingAreaProbe>,
        settings: ValidationSettings,
    ) -> Self {
        let suggestion_engine = SuggestionEngine::new(&settings.spec_path);
        Self {
            rule_source,
            rule_cache: RuleCache::new(),
            checkers,
            probe,
            settings,
            suggestion_engine,
            state: RunState::Idle,
            last_timing: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Timing of the most recent run.
    pub fn last_timing(&self) -> Option<&TimingRecord> {
        self.last_timing.as_ref()
    }

    /// Validates whatever is currently staged.
    pub async fn validate_staged(&mut self, branch: &str) -> ValidationResult {
        let staged_files = self.probe.staged_files().unwrap_or_else(|e| {
            warn!(error = %e, "Could not list staged files, validating nothing");
            Vec::new()
        });
        self.validate(ValidationRequest::new(branch, staged_files))
            .await
    }

    pub async fn validate(&mut self, request: ValidationRequest) -> ValidationResult {
        let started = Instant::now();
        self.state = RunState::Idle;
        info!(branch = %request.branch, files = request.staged_files.len(), "Validation started");

        let before = capture_state(self.probe.as_ref());
        let timeout = self.settings.timeout;
        let mut partial = PartialRun::default();

        let outcome = tokio::time::timeout(timeout, self.run_pipeline(&request, &mut partial)).await;
        let mut result = match outcome {
            Ok(result) => result,
            Err(_) => {
                partial.close_in_flight();
                warn!(state = %self.state, timeout_secs = timeout.as_secs_f64(), "Validation timed out");
                timed_out_result(&request.branch, timeout, partial)
            }
        };

        self.transition(RunState::StagingVerification);
        let after = capture_state(self.probe.as_ref());
        match verify_unchanged(&before, &after) {
            Ok(()) => result.staging_area_preserved = true,
            Err(e) => result.mark_staging_modified(&e.to_string()),
        }

        result.timing.total = started.elapsed().as_secs_f64();
        self.last_timing = Some(result.timing.clone());
        self.transition(RunState::Done);
        info!(
            success = result.success,
            allow_commit = result.allow_commit,
            total_issues = result.total_issues,
            timed_out = result.timed_out,
            "Validation finished"
        );
        result
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
    }

    /// Everything under the deadline: rules, context, checkers, aggregation
    /// and suggestions. Progress is mirrored into `partial` as it happens.
    async fn run_pipeline(
        &mut self,
        request: &ValidationRequest,
        partial: &mut PartialRun,
    ) -> ValidationResult {
        let step = partial.begin(STEP_RULES);
        if self.rule_cache.reload_if_stale(self.rule_source.as_ref()) {
            debug!("Rule cache refreshed");
        }
        let engine = RuleEngine::new(self.rule_cache.rule_set());
        partial.finish(STEP_RULES, step);
        self.transition(RunState::RulesLoaded);

        let step = partial.begin(STEP_CONTEXT);
        let mut context = ValidationContext::new(&request.branch, &request.staged_files);
        partial.finish(STEP_CONTEXT, step);
        self.transition(RunState::ContextBuilt);

        let step = partial.begin(STEP_FILTERING);
        self.transition(RunState::Filtering);
        context.apply_rules(&engine);
        partial.finish(STEP_FILTERING, step);
        debug!(
            staged = context.staged_files.len(),
            filtered = context.filtered_files.len(),
            "Steering rules applied"
        );

        if context.filtered_files.is_empty() {
            info!("No files left to validate");
            let mut result = ValidationResult::passed(&context.branch, NOTHING_TO_VALIDATE);
            result.timing = partial.timing.clone();
            return result;
        }

        self.transition(RunState::Checking);
        for kind in CheckKind::ORDER {
            self.run_check(kind, &context.filtered_files, partial).await;
        }

        self.transition(RunState::Aggregating);
        let step = partial.begin(STEP_AGGREGATION);
        let mut result = aggregate(&context.branch, &partial.reports);
        result.checker_errors = partial.checker_errors.clone();

        let mut all_files = context.staged_files.clone();
        all_files.extend(engine.ignored_targets(&context.file_mappings));
        let issues = partial.reports.all_issues();
        let conflicts = dedup_conflicts(engine.detect_conflicts(
            &issues,
            &context.filtered_files,
            &all_files,
        ));
        let mut result = RuleEngine::prioritize_alignment_over_rules(&conflicts, result);
        partial.finish(STEP_AGGREGATION, step);

        if !result.success {
            self.transition(RunState::SuggestionGeneration);
            let step = partial.begin(STEP_SUGGESTIONS);
            let report = self
                .suggestion_engine
                .generate(&partial.reports, &context.file_mappings);
            result.suggestions = Some(engine.apply_minimal_change_policy(report));
            partial.finish(STEP_SUGGESTIONS, step);
        }

        result.timing = partial.timing.clone();
        result
    }

    async fn run_check(&self, kind: CheckKind, files: &[String], partial: &mut PartialRun) {
        let step_name = kind.step_name();
        if !self.settings.toggles.enabled(kind) {
            debug!(check = %kind, "Check disabled");
            partial.timing.record(step_name, Duration::ZERO);
            return;
        }
        let Some(checker) = self.checkers.get(kind) else {
            debug!(check = %kind, "No checker registered");
            partial.timing.record(step_name, Duration::ZERO);
            return;
        };

        let step = partial.begin(step_name);
        debug!(check = %kind, files = files.len(), "Checker started");
        match checker.run(files).await {
            Ok(Some(report)) => {
                debug!(check = %kind, issues = report.issue_count(), "Checker finished");
                partial.reports.set(kind, Some(report));
            }
            Ok(None) => debug!(check = %kind, "Checker declined to run"),
            Err(e) => {
                warn!(check = %kind, error = %e, "Checker failed, its report is omitted");
                partial.checker_errors.insert(kind.to_string(), format!("{e:#}"));
            }
        }
        partial.finish(step_name, step);
    }
}

/// Pass/fail over the present reports. A report counts as failing only
/// when it flags `has_issues`.
fn aggregate(branch: &str, reports: &Reports) -> ValidationResult {
    let present: Vec<(CheckKind, &CheckReport)> = CheckKind::ORDER
        .iter()
        .filter_map(|kind| reports.get(*kind).map(|report| (*kind, report)))
        .collect();

    let failing: Vec<String> = present
        .iter()
        .filter(|(_, report)| report.has_issues)
        .map(|(kind, report)| format!("{} {} issue(s)", report.issue_count(), kind.issue_label()))
        .collect();

    let mut result = if failing.is_empty() {
        ValidationResult::passed(branch, ALL_PASSED)
    } else {
        let mut result = ValidationResult::new(branch);
        result.message = format!("Validation failed: {} detected", failing.join(", "));
        result
    };
    result.total_issues = present.iter().map(|(_, report)| report.issue_count()).sum();
    result.reports = reports.clone();
    result
}

fn dedup_conflicts(conflicts: Vec<Conflict>) -> Vec<Conflict> {
    let mut unique: Vec<Conflict> = Vec::with_capacity(conflicts.len());
    for conflict in conflicts {
        if !unique.iter().any(|seen| seen.dedup_key() == conflict.dedup_key()) {
            unique.push(conflict);
        }
    }
    unique
}

fn timed_out_result(branch: &str, timeout: Duration, partial: PartialRun) -> ValidationResult {
    let mut result = ValidationResult::new(branch);
    result.message = format!(
        "Validation timed out after {} seconds. Partial results returned.",
        timeout.as_secs_f64()
    );
    result.total_issues = CheckKind::ORDER
        .iter()
        .filter_map(|kind| partial.reports.get(*kind))
        .map(CheckReport::issue_count)
        .sum();
    result.reports = partial.reports;
    result.checker_errors = partial.checker_errors;
    result.timing = partial.timing;
    result.timed_out = true;
    result.partial_results = true;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::rules::{RawRules, RuleSet, StaticRuleSource, SteeringRuleSource};
    use crate::builders::suggestions::SuggestionType;
    use crate::core::checks::{Checker, Issue, Severity};
    use crate::core::git::MemoryProbe;
    use async_trait::async_trait;
    use std::fs;

    struct ScriptedChecker(Option<CheckReport>);

    #[async_trait]
    impl Checker for ScriptedChecker {
        async fn run(&self, _files: &[String]) -> anyhow::Result<Option<CheckReport>> {
            Ok(self.0.clone())
        }
    }

    struct FailingChecker;

    #[async_trait]
    impl Checker for FailingChecker {
        async fn run(&self, _files: &[String]) -> anyhow::Result<Option<CheckReport>> {
            anyhow::bail!("analyzer crashed")
        }
    }

    struct SlowChecker(Duration);

    #[async_trait]
    impl Checker for SlowChecker {
        async fn run(&self, _files: &[String]) -> anyhow::Result<Option<CheckReport>> {
            tokio::time::sleep(self.0).await;
            Ok(Some(CheckReport::clean()))
        }
    }

    struct StagingChecker(MemoryProbe);

    #[async_trait]
    impl Checker for StagingChecker {
        async fn run(&self, _files: &[String]) -> anyhow::Result<Option<CheckReport>> {
            self.0.stage(vec!["sneaky.py".to_string()], "+oops\n");
            Ok(Some(CheckReport::clean()))
        }
    }

    fn rules(correlations: &[(&str, &str)], ignores: &[&str]) -> Box<dyn RuleSource> {
        let raw = RawRules {
            correlations: correlations
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
            ignore_patterns: ignores.iter().map(|p| p.to_string()).collect(),
            ..RawRules::default()
        };
        Box::new(StaticRuleSource::new(RuleSet::compile(&raw)))
    }

    fn orchestrator(
        rule_source: Box<dyn RuleSource>,
        checkers: CheckerSet,
        probe: MemoryProbe,
        settings: ValidationSettings,
    ) -> ValidationOrchestrator {
        ValidationOrchestrator::new(rule_source, checkers, Box::new(probe), settings)
    }

    fn with_drift(report: CheckReport) -> CheckerSet {
        let mut checkers = CheckerSet::new();
        checkers.register(CheckKind::Drift, Box::new(ScriptedChecker(Some(report))));
        checkers
    }

    fn request(files: &[&str]) -> ValidationRequest {
        ValidationRequest::new("main", files.iter().map(|f| f.to_string()).collect())
    }

    #[tokio::test]
    async fn test_empty_staging_area_passes() {
        let mut orchestrator = orchestrator(
            rules(&[], &[]),
            with_drift(CheckReport::from_issues(vec![Issue::new("spec", "a.py", "x")])),
            MemoryProbe::default(),
            ValidationSettings::default(),
        );
        let result = orchestrator.validate(request(&[])).await;

        assert!(result.success);
        assert!(result.allow_commit);
        assert!(result.message.contains("No files to validate"));
        assert!(result.reports.drift_report.is_none());
        assert!(result.staging_area_preserved);
        assert_eq!(orchestrator.state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_spec_issue_blocks_commit_with_suggestion() {
        let report = CheckReport::from_issues(vec![Issue::new(
            "spec",
            "backend/handlers/user.py",
            "`GET /users/{id}/posts` not in spec",
        )]);
        let mut orchestrator = orchestrator(
            rules(&[], &[]),
            with_drift(report),
            MemoryProbe::default(),
            ValidationSettings::default(),
        );
        let result = orchestrator.validate(request(&["backend/handlers/user.py"])).await;

        assert!(!result.success);
        assert!(!result.allow_commit);
        assert_eq!(result.message, "Validation failed: 1 drift issue(s) detected");
        let suggestions = result.suggestions.unwrap();
        let spec = suggestions
            .ordered
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::Spec)
            .unwrap();
        assert!(spec.action.contains("GET"));
        assert!(spec.action.contains("/users/{id}/posts"));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_idempotent() {
        let report = CheckReport::from_issues(vec![Issue::new("spec", "a.py", "GET /a not in spec")]);
        let probe = MemoryProbe::new(vec!["a.py".to_string()], "+x\n");
        let mut orchestrator = orchestrator(
            rules(&[], &[]),
            with_drift(report),
            probe,
            ValidationSettings::default(),
        );

        let first = orchestrator.validate_staged("main").await;
        let second = orchestrator.validate_staged("main").await;
        assert_eq!(first.success, second.success);
        assert_eq!(first.allow_commit, second.allow_commit);
        assert_eq!(first.total_issues, second.total_issues);
        assert_eq!(first.message, second.message);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_timeout_returns_partial_results() {
        let mut checkers = with_drift(CheckReport::from_issues(vec![Issue::new("spec", "a.py", "GET /a not in spec")]));
        checkers.register(CheckKind::Test, Box::new(SlowChecker(Duration::from_secs(5))));
        let settings = ValidationSettings {
            timeout: Duration::from_millis(100),
            ..ValidationSettings::default()
        };
        let mut orchestrator = orchestrator(rules(&[], &[]), checkers, MemoryProbe::default(), settings);

        let result = orchestrator.validate(request(&["a.py"])).await;
        assert!(result.timed_out);
        assert!(result.partial_results);
        assert!(!result.success);
        assert!(!result.allow_commit);
        assert!(result.suggestions.is_none());
        assert!(result.reports.drift_report.is_some());
        assert!(result.reports.test_report.is_none());
        assert!(result.timing.get("test_coverage").is_some());
        assert!(result.message.starts_with("Validation timed out after 0.1 seconds"));
        assert!(result.staging_area_preserved);
    }

    #[tokio::test]
    async fn test_staging_mutation_dominates() {
        let probe = MemoryProbe::new(vec!["a.py".to_string()], "+x\n");
        let mut checkers = CheckerSet::new();
        checkers.register(CheckKind::Drift, Box::new(StagingChecker(probe.clone())));
        let mut orchestrator = orchestrator(rules(&[], &[]), checkers, probe, ValidationSettings::default());

        let result = orchestrator.validate(request(&["a.py"])).await;
        assert!(!result.success);
        assert!(!result.allow_commit);
        assert!(!result.staging_area_preserved);
        assert!(result.message.contains("CRITICAL"));
        assert!(result.staging_area_error.is_some());
    }

    #[test]
    fn test_mark_staging_modified_overrides_success() {
        let mut result = ValidationResult::passed("main", ALL_PASSED);
        result.mark_staging_modified("hash mismatch");
        assert!(!result.success);
        assert!(!result.allow_commit);
        assert_eq!(result.message, "CRITICAL ERROR: hash mismatch");
    }

    #[tokio::test]
    async fn test_disabled_check_is_skipped() {
        let settings = ValidationSettings {
            toggles: ValidationToggles {
                check_spec_alignment: false,
                ..ValidationToggles::default()
            },
            ..ValidationSettings::default()
        };
        let mut orchestrator = orchestrator(
            rules(&[], &[]),
            with_drift(CheckReport::from_issues(vec![Issue::new("spec", "a.py", "x")])),
            MemoryProbe::default(),
            settings,
        );
        let result = orchestrator.validate(request(&["a.py"])).await;

        assert!(result.success);
        assert_eq!(result.message, ALL_PASSED);
        assert!(result.reports.drift_report.is_none());
        assert_eq!(result.timing.get("drift_detection"), Some(0.0));
    }

    #[tokio::test]
    async fn test_checker_error_is_recorded_not_fatal() {
        let mut checkers = CheckerSet::new();
        checkers.register(CheckKind::Documentation, Box::new(FailingChecker));
        let mut orchestrator = orchestrator(rules(&[], &[]), checkers, MemoryProbe::default(), ValidationSettings::default());

        let result = orchestrator.validate(request(&["a.py"])).await;
        assert!(result.success);
        assert!(result.checker_errors["doc"].contains("analyzer crashed"));
        assert!(result.reports.doc_report.is_none());
    }

    #[tokio::test]
    async fn test_conflict_on_ignored_file_blocks_commit() {
        // The checker only warns, but the warning names an ignored file.
        let mut report = CheckReport::from_issues(vec![
            Issue::new("spec", "generated/api.py", "GET /a not in spec"),
            Issue::new("spec", "generated/api.py", "GET /a not in spec"),
        ]);
        report.has_issues = false;
        let mut orchestrator = orchestrator(
            rules(&[], &["generated/**"]),
            with_drift(report),
            MemoryProbe::default(),
            ValidationSettings::default(),
        );

        let result = orchestrator.validate(request(&["generated/api.py", "src/app.py"])).await;
        assert!(!result.success);
        assert!(!result.allow_commit);
        assert_eq!(result.conflicts.len(), 1);
        assert!(result.message.contains("STEERING RULE CONFLICTS"));
        assert!(result.suggestions.is_some());
    }

    #[tokio::test]
    async fn test_conflict_on_ignored_correlation_target() {
        let mut report = CheckReport::from_issues(vec![Issue::new(
            "spec",
            "generated/user_pb2.py",
            "model 'User' not in spec",
        )]);
        report.has_issues = false;
        let mut orchestrator = orchestrator(
            rules(&[("src/{m}.py", "generated/{m}_pb2.py")], &["generated/**"]),
            with_drift(report),
            MemoryProbe::default(),
            ValidationSettings::default(),
        );

        let result = orchestrator.validate(request(&["src/user.py"])).await;
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].file, "generated/user_pb2.py");
        assert!(!result.allow_commit);
    }

    #[tokio::test]
    async fn test_rules_hot_reload_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.md");
        fs::write(&path, "## Ignore Patterns\n- `docs/**`\n").unwrap();
        let mut orchestrator = orchestrator(
            Box::new(SteeringRuleSource::new(&path)),
            CheckerSet::new(),
            MemoryProbe::default(),
            ValidationSettings::default(),
        );

        let first = orchestrator.validate(request(&["src/app.py"])).await;
        assert_eq!(first.message, ALL_PASSED);

        fs::write(&path, "## Ignore Patterns\n- `docs/**`\n- `src/**`\n").unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(std::time::SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        let second = orchestrator.validate(request(&["src/app.py"])).await;
        assert_eq!(second.message, NOTHING_TO_VALIDATE);
    }

    #[tokio::test]
    async fn test_warning_issue_still_blocks_commit() {
        let report = CheckReport::from_issues(vec![
            Issue::new("spec", "a.py", "`GET /a` not in spec").with_severity(Severity::Warning),
        ])
        .with_message("1 endpoint drifted");
        let mut orchestrator = orchestrator(
            rules(&[], &[]),
            with_drift(report),
            MemoryProbe::default(),
            ValidationSettings::default(),
        );
        let result = orchestrator.validate(request(&["a.py"])).await;

        assert!(!result.success);
        assert!(!result.allow_commit);
        let drift = result.reports.drift_report.as_ref().unwrap();
        assert_eq!(drift.message.as_deref(), Some("1 endpoint drifted"));
        assert_eq!(drift.issues[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_timing_covers_every_step() {
        let mut orchestrator = orchestrator(
            rules(&[], &[]),
            with_drift(CheckReport::from_issues(vec![Issue::new("spec", "a.py", "GET /a not in spec")])),
            MemoryProbe::default(),
            ValidationSettings::default(),
        );
        let result = orchestrator.validate(request(&["a.py"])).await;
        for step in [
            "context_initialization",
            "steering_rules",
            "rule_filtering",
            "drift_detection",
            "test_coverage",
            "documentation",
            "bridge_validation",
            "aggregation",
            "suggestion_generation",
        ] {
            assert!(result.timing.get(step).is_some(), "missing {step}");
        }
        assert_eq!(orchestrator.last_timing(), Some(&result.timing));
    }

    #[test]
    fn test_context_dedups_staged_files() {
        let context = ValidationContext::new(
            "main",
            &["b.py".to_string(), "a.py".to_string(), "b.py".to_string()],
        );
        assert_eq!(context.staged_files, vec!["b.py".to_string(), "a.py".to_string()]);
    }

    #[test]
    fn test_result_serializes_flat() {
        let result = ValidationResult::passed("main", ALL_PASSED);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["allow_commit"], serde_json::Value::Bool(true));
        assert!(json["drift_report"].is_null());
        assert!(json.get("suggestions").is_none());
    }
}
