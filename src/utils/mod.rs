use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::builders::hooks::{self, HookInstall, HookRemoval};
use crate::builders::reporter::{ConsoleReporter, StatusReporter, timing_summary};
use crate::builders::rule_engine::RuleEngine;
use crate::builders::rules::{RuleSet, RuleSource};
use crate::core::checks::{CheckKind, CheckerSet, CommandChecker};
use crate::core::config::{ConfigManager, ConfigProvider, GovernanceConfig, serialize_as};
use crate::core::engine::{ValidationOrchestrator, ValidationSettings};
use crate::core::git::Git2Probe;

/// Initialise the global tracing subscriber. Logs go to stderr so that
/// stdout stays clean for reports.
///
/// `RUST_LOG` takes precedence over `level`. Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

pub fn initialize_repository() -> Result<()> {
    let config_manager = ConfigManager::new()?;
    config_manager.initialize()?;
    println!("✓ Initialized SpecSync for this repository");
    println!("Run 'specsync install-hooks' to validate every commit");
    Ok(())
}

pub fn install_hooks() -> Result<()> {
    let config_manager = get_config_manager()?;
    match hooks::install_git_hooks(config_manager.get_repo_root())? {
        HookInstall::AlreadyInstalled => println!("ℹ️  pre-commit hook already installed"),
        HookInstall::ReplacedExisting(backup) => {
            println!("ℹ️  Backed up existing pre-commit hook to {}", backup.display());
            println!("✓ Installed SpecSync pre-commit hook");
        }
        HookInstall::Installed => println!("✓ Installed SpecSync pre-commit hook"),
    }
    Ok(())
}

pub fn uninstall_hooks() -> Result<()> {
    let config_manager = get_config_manager()?;
    match hooks::uninstall_git_hooks(config_manager.get_repo_root())? {
        HookRemoval::Removed => println!("✓ Removed SpecSync pre-commit hook"),
        HookRemoval::RestoredBackup => {
            println!("✓ Removed SpecSync pre-commit hook and restored the previous one")
        }
        HookRemoval::NotInstalled => println!("ℹ️  No pre-commit hook installed"),
        HookRemoval::ForeignHook => {
            println!("⚠️  The pre-commit hook was not installed by SpecSync, leaving it in place")
        }
    }
    Ok(())
}

/// Registers one `CommandChecker` per configured category.
pub fn build_checkers(config: &GovernanceConfig, config_manager: &ConfigManager) -> CheckerSet {
    let repo_root = config_manager.get_repo_root();
    let mut checkers = CheckerSet::new();
    for kind in CheckKind::ORDER {
        let Some(spec) = config.checker_for(kind) else {
            continue;
        };
        let mut checker =
            CommandChecker::new(&kind.to_string(), spec.command.clone(), repo_root.to_path_buf());
        if let Some(artifact) = &spec.requires {
            checker = checker.requiring(repo_root.join(artifact));
        }
        checkers.register(kind, Box::new(checker));
    }
    checkers
}

/// Assembles an orchestrator from the repository's configuration.
pub fn build_orchestrator(config_manager: &ConfigManager) -> Result<ValidationOrchestrator> {
    let config = config_manager.load_config()?;
    let probe = Git2Probe::new(config_manager.get_repo_root())?;
    let rule_source = config_manager.rules_source()?;

    Ok(ValidationOrchestrator::new(
        Box::new(rule_source),
        build_checkers(&config, config_manager),
        Box::new(probe),
        ValidationSettings::from_config(&config),
    ))
}

/// Runs a validation of the staged changes and prints it.
///
/// Returns whether the commit may proceed.
pub async fn run_validation(format: &str, branch: Option<String>) -> Result<bool> {
    let config_manager = get_config_manager()?;
    let branch = match branch {
        Some(branch) => branch,
        None => Git2Probe::new(config_manager.get_repo_root())?.current_branch(),
    };

    let mut orchestrator = build_orchestrator(&config_manager)?;
    let result = orchestrator.validate_staged(&branch).await;

    if format == "text" {
        let rule_engine = RuleEngine::new(Arc::new(load_rules(&config_manager)));
        println!("{}", ConsoleReporter::with_rule_engine(&rule_engine).render(&result));
        println!();
        println!(
            "{}",
            timing_summary(orchestrator.last_timing(), orchestrator.settings().timeout)
        );
    } else {
        println!("{}", serialize_as(&result, format)?);
    }
    Ok(result.allow_commit)
}

pub fn validate_config() -> Result<()> {
    get_config_manager()?.validate_config()
}

/// Prints the rules the next validation would use.
pub fn show_rules() -> Result<()> {
    let config_manager = get_config_manager()?;
    let rules = load_rules(&config_manager);

    if rules.is_empty() {
        println!("No steering rules configured.");
        return Ok(());
    }

    println!("🔗 Correlation patterns:");
    for rule in &rules.correlation_rules {
        println!("  {} → {}", rule.source_pattern, rule.target_template);
    }
    println!("\n🙈 Ignore patterns:");
    for pattern in &rules.ignore_patterns {
        println!("  {pattern}");
    }
    println!("\n📊 Validation priorities:");
    let mut priorities: Vec<_> = rules.priorities.iter().collect();
    priorities.sort_by_key(|(_, rank)| **rank);
    for (category, rank) in priorities {
        println!("  {rank}. {category}");
    }
    if !rules.minimal_change_policy.is_empty() {
        println!("\n✂️  Minimal change policy:");
        for (key, value) in &rules.minimal_change_policy {
            println!("  {key}: {value}");
        }
    }
    Ok(())
}

fn load_rules(config_manager: &ConfigManager) -> RuleSet {
    config_manager
        .rules_source()
        .and_then(|source| source.load().context("Failed to load steering rules"))
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to empty steering rules");
            RuleSet::empty()
        })
}

// Helper function to create ConfigManager instance
fn get_config_manager() -> Result<ConfigManager> {
    ConfigManager::new()
}
