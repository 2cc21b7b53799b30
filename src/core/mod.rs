// This file is the module declaration file for the `core` module.
// It holds the run-time machinery of a validation: configuration, errors,
// the staging-area probe, checkers and the orchestrator itself.

// `checks` module:
// The checker contract (`Checker`), the typed reports and issues checkers
// produce, and `CommandChecker`, which runs an external analyzer and parses
// its JSON report.
pub mod checks;

// `config` module:
// Loads `.kiro/settings/specsync.toml` (`GovernanceConfig`) through the
// `ConfigProvider` trait, writes defaults on `init`, and lints the setup.
pub mod config;

// `engine` module:
// The `ValidationOrchestrator`: rule reload, filtering, checkers,
// aggregation and suggestions under one deadline, followed by the
// staging-area integrity check.
pub mod engine;

pub mod error;

// `git` module:
// The read-only `StagingAreaProbe` and its libgit2 implementation.
pub mod git;

// `integrity` module:
// Staging-area digests taken before and after every run.
pub mod integrity;
