use crate::builders::rules::{DEFAULT_RULES_DOCUMENT, SteeringRuleSource};
use crate::core::checks::{CheckKind, CheckReport, Checker, CheckerSet, Issue};
use crate::core::config::{CONFIG_RELATIVE_PATH, ConfigManager};
use crate::core::engine::{ValidationOrchestrator, ValidationSettings};
use crate::core::git::{Git2Probe, StagingAreaProbe};
use crate::utils::build_orchestrator;
use async_trait::async_trait;
use git2::Repository;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn setup_test_repo() -> (tempfile::TempDir, Repository, PathBuf) {
    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let repo_path = dir.path().to_path_buf();
    (dir, repo, repo_path)
}

fn stage(repo: &Repository, root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
}

/// Stages an extra file in the real index while it "checks".
struct IndexWritingChecker {
    repo_path: PathBuf,
}

#[async_trait]
impl Checker for IndexWritingChecker {
    async fn run(&self, _files: &[String]) -> anyhow::Result<Option<CheckReport>> {
        let repo = Repository::open(&self.repo_path)?;
        stage(&repo, &self.repo_path, "injected.py", "print('injected')\n");
        Ok(Some(CheckReport::clean()))
    }
}

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

fn orchestrator(repo_path: &Path, checkers: CheckerSet) -> ValidationOrchestrator {
    let rules_path = repo_path.join(".kiro/steering/rules.md");
    fs::create_dir_all(rules_path.parent().unwrap()).unwrap();
    fs::write(&rules_path, DEFAULT_RULES_DOCUMENT).unwrap();
    ValidationOrchestrator::new(
        Box::new(SteeringRuleSource::new(rules_path)),
        checkers,
        Box::new(Git2Probe::new(repo_path).unwrap()),
        ValidationSettings::default(),
    )
}

#[test]
fn test_initialization() {
    let (_dir, _repo, repo_path) = setup_test_repo();

    let config_manager = ConfigManager::new_at(&repo_path);
    config_manager.initialize().unwrap();

    assert!(repo_path.join(CONFIG_RELATIVE_PATH).exists());
    assert!(repo_path.join(".kiro/steering/rules.md").exists());
    assert!(config_manager.collect_issues().unwrap().is_empty());
}

#[tokio::test]
async fn test_staged_handler_with_drift_is_blocked() {
    let (_dir, repo, repo_path) = setup_test_repo();
    stage(&repo, &repo_path, "backend/handlers/user.py", "def get_posts():\n    pass\n");
    stage(&repo, &repo_path, "backend/__pycache__/user.cpython-311.pyc", "bytecode");

    let mut checkers = CheckerSet::new();
    checkers.register(CheckKind::Drift, Box::new(DriftChecker));
    let mut orchestrator = orchestrator(&repo_path, checkers);

    let result = orchestrator.validate_staged("main").await;
    assert!(!result.success);
    assert!(!result.allow_commit);
    assert!(result.staging_area_preserved);
    let suggestions = result.suggestions.unwrap();
    assert!(suggestions.ordered[0].action.contains("/users/{id}/posts"));
    assert!(!suggestions.minimal_change_policy.is_empty());
}

#[tokio::test]
async fn test_only_ignored_files_staged() {
    let (_dir, repo, repo_path) = setup_test_repo();
    stage(&repo, &repo_path, "backend/__pycache__/models.cpython-311.pyc", "bytecode");

    let mut checkers = CheckerSet::new();
    checkers.register(CheckKind::Drift, Box::new(DriftChecker));
    let mut orchestrator = orchestrator(&repo_path, checkers);

    let result = orchestrator.validate_staged("main").await;
    assert!(result.success);
    assert!(result.message.contains("No files to validate"));
}

#[tokio::test]
async fn test_index_write_during_validation_is_critical() {
    let (_dir, repo, repo_path) = setup_test_repo();
    stage(&repo, &repo_path, "backend/models.py", "class User: pass\n");

    let mut checkers = CheckerSet::new();
    checkers.register(
        CheckKind::Test,
        Box::new(IndexWritingChecker {
            repo_path: repo_path.clone(),
        }),
    );
    let mut orchestrator = orchestrator(&repo_path, checkers);

    let result = orchestrator.validate_staged("main").await;
    assert!(!result.staging_area_preserved);
    assert!(!result.allow_commit);
    assert!(result.message.starts_with("CRITICAL ERROR:"));

    let probe = Git2Probe::new(&repo_path).unwrap();
    assert!(probe.staged_files().unwrap().contains(&"injected.py".to_string()));
}

#[tokio::test]
async fn test_orchestrator_from_config() {
    let (_dir, repo, repo_path) = setup_test_repo();
    let config_manager = ConfigManager::new_at(&repo_path);
    config_manager.initialize().unwrap();
    stage(&repo, &repo_path, "README.md", "# demo\n");

    let mut orchestrator = build_orchestrator(&config_manager).unwrap();
    let result = orchestrator.validate_staged("main").await;

    // No checkers configured: nothing can fail.
    assert!(result.success);
    assert!(result.allow_commit);
    assert_eq!(result.total_issues, 0);
}
