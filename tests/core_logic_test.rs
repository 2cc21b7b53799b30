use async_trait::async_trait;
use specsync::builders::rules::{DEFAULT_RULES_DOCUMENT, RuleSet, StaticRuleSource};
use specsync::builders::suggestions::SuggestionType;
use specsync::core::checks::{CheckKind, CheckReport, Checker, CheckerSet, CommandChecker, Issue};
use specsync::core::engine::{
    NOTHING_TO_VALIDATE, ValidationOrchestrator, ValidationRequest, ValidationSettings,
};
use specsync::core::git::MemoryProbe;
use std::path::PathBuf;

struct DriftChecker;

#[async_trait]
impl Checker for DriftChecker {
    async fn run(&self, files: &[String]) -> anyhow::Result<Option<CheckReport>> {
        let issues = files
            .iter()
            .filter(|file| file.starts_with("backend/handlers/"))
            .map(|file| Issue::new("spec", file, "`GET /users/{id}/posts` not in spec"))
            .collect();
        Ok(Some(CheckReport::from_issues(issues)))
    }
}

fn orchestrator(checkers: CheckerSet, probe: MemoryProbe) -> ValidationOrchestrator {
    ValidationOrchestrator::new(
        Box::new(StaticRuleSource::new(RuleSet::from_markdown(DEFAULT_RULES_DOCUMENT))),
        checkers,
        Box::new(probe),
        ValidationSettings::default(),
    )
}

fn drift_checkers() -> CheckerSet {
    let mut checkers = CheckerSet::new();
    checkers.register(CheckKind::Drift, Box::new(DriftChecker));
    checkers
}

#[tokio::test]
async fn test_empty_commit_passes() {
    let mut orchestrator = orchestrator(drift_checkers(), MemoryProbe::default());

    let result = orchestrator.validate(ValidationRequest::new("main", Vec::new())).await;
    assert!(result.success);
    assert!(result.allow_commit);
    assert_eq!(result.message, NOTHING_TO_VALIDATE);
    assert!(result.suggestions.is_none());
}

#[tokio::test]
async fn test_core_workflow() {
    let staged = vec!["backend/handlers/user.py".to_string()];
    let probe = MemoryProbe::new(staged.clone(), "+def get_posts(): pass\n");
    let mut orchestrator = orchestrator(drift_checkers(), probe);

    // 1. A handler drifts from the spec: the commit is blocked.
    let result = orchestrator.validate(ValidationRequest::new("main", staged)).await;
    assert!(!result.success);
    assert!(!result.allow_commit);
    assert!(result.staging_area_preserved);
    assert_eq!(result.total_issues, 1);
    assert!(result.message.contains("1 drift issue(s)"));

    // 2. The fix is a spec update naming the endpoint.
    let suggestions = result.suggestions.expect("failed runs carry suggestions");
    let first = &suggestions.ordered[0];
    assert_eq!(first.suggestion_type, SuggestionType::Spec);
    assert_eq!(first.file, ".kiro/specs/app.yaml");
    assert!(first.action.contains("GET"));
    assert!(first.action.contains("/users/{id}/posts"));
    assert_eq!(suggestions.summary.by_type.spec, 1);
}

#[tokio::test]
async fn test_validation_is_repeatable() {
    let staged = vec![
        "backend/handlers/user.py".to_string(),
        "backend/__pycache__/user.cpython-311.pyc".to_string(),
    ];
    let probe = MemoryProbe::new(staged.clone(), "+x\n");
    let mut orchestrator = orchestrator(drift_checkers(), probe);

    let first = orchestrator
        .validate(ValidationRequest::new("main", staged.clone()))
        .await;
    let second = orchestrator.validate(ValidationRequest::new("main", staged)).await;

    assert_eq!(first.success, second.success);
    assert_eq!(first.message, second.message);
    assert_eq!(first.total_issues, second.total_issues);
    assert_eq!(first.suggestions, second.suggestions);
    assert_ne!(first.run_id, second.run_id);
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_checker_report() {
    let script = r#"echo '{"has_issues": true, "issues": [{"type": "missing_tests", "file": "backend/models.py", "description": "No test file"}]}'"#;
    let checker = CommandChecker::new(
        "test",
        vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        PathBuf::from("."),
    );
    let mut checkers = CheckerSet::new();
    checkers.register(CheckKind::Test, Box::new(checker));

    let staged = vec!["backend/models.py".to_string()];
    let mut orchestrator = orchestrator(checkers, MemoryProbe::new(staged.clone(), ""));
    let result = orchestrator.validate(ValidationRequest::new("main", staged)).await;

    assert!(!result.success);
    let report = result.reports.get(CheckKind::Test).unwrap();
    assert_eq!(report.issue_count(), 1);

    let suggestions = result.suggestions.unwrap();
    assert_eq!(suggestions.ordered[0].suggestion_type, SuggestionType::Test);
    assert_eq!(suggestions.ordered[0].file, "tests/unit/test_models.py");
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_checker_failure_does_not_block() {
    let checker = CommandChecker::new(
        "doc",
        vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
        PathBuf::from("."),
    );
    let mut checkers = CheckerSet::new();
    checkers.register(CheckKind::Documentation, Box::new(checker));

    let staged = vec!["backend/models.py".to_string()];
    let mut orchestrator = orchestrator(checkers, MemoryProbe::new(staged.clone(), ""));
    let result = orchestrator.validate(ValidationRequest::new("main", staged)).await;

    assert!(result.success);
    assert!(result.checker_errors.contains_key("doc"));
    assert!(result.reports.get(CheckKind::Documentation).is_none());
}
