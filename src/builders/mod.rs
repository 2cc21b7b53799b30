// This file is the module declaration file for the `builders` module.
// It declares and makes public the pure building blocks the orchestrator
// is assembled from, plus the display and hook helpers.

// `hooks` module:
// Installs and removes the `pre-commit` hook that runs `specsync validate`,
// backing up and restoring any hook that was there before.
pub mod hooks;

// `patterns` module:
// `PathPattern`, the glob-like matcher (`*`, `**`, `{name}`) used by every
// rule, and template expansion of captured names.
pub mod patterns;

// `reporter` module:
// Renders a `ValidationResult` for the terminal through the `StatusReporter`
// trait and summarises step timings.
pub mod reporter;

// `rule_engine` module:
// Applies a `RuleSet` to staged paths: correlations, ignore filtering and
// ignore/drift conflict detection.
pub mod rule_engine;

// `rules` module:
// The immutable `RuleSet`, the `RuleSource` trait, the Markdown steering
// document loader and the mtime-based `RuleCache`.
pub mod rules;

// `suggestions` module:
// Maps checker issues to prioritised, grouped `Suggestion`s.
pub mod suggestions;

// `validator` module:
// Lints a steering document (`RuleValidator`) for patterns that do not
// compile, unknown placeholders, duplicates and ambiguous priorities.
pub mod validator;
