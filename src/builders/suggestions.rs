use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::checks::{BridgeDetails, CheckKind, Issue, Reports};

/// Upper bound of an adjusted priority: spec base 10 + severity 3 (+ file 1, capped).
pub const MAX_PRIORITY: u32 = 13;

/// Threshold of the "high" bucket in the summary.
pub const HIGH_PRIORITY: u32 = 8;

/// Threshold of the "medium" bucket in the summary.
pub const MEDIUM_PRIORITY: u32 = 5;

const BRIDGE_PRIORITY: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    Spec,
    Test,
    Doc,
    Bridge,
}

impl SuggestionType {
    /// Category weight; dominates the adjusted priority when ordering.
    pub fn weight(&self) -> u32 {
        match self {
            SuggestionType::Spec => 10,
            SuggestionType::Test => 7,
            SuggestionType::Doc => 5,
            SuggestionType::Bridge => BRIDGE_PRIORITY,
        }
    }

    fn for_check(kind: CheckKind) -> Self {
        match kind {
            CheckKind::Drift => SuggestionType::Spec,
            CheckKind::Test => SuggestionType::Test,
            CheckKind::Documentation => SuggestionType::Doc,
            CheckKind::Bridge => SuggestionType::Bridge,
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuggestionType::Spec => "spec",
            SuggestionType::Test => "test",
            SuggestionType::Doc => "doc",
            SuggestionType::Bridge => "bridge",
        };
        write!(f, "{name}")
    }
}

/// One actionable remediation step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub priority: u32,
    pub file: String,
    pub description: String,
    pub action: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BridgeDetails>,
}

impl Suggestion {
    pub fn new(
        suggestion_type: SuggestionType,
        priority: u32,
        file: &str,
        description: &str,
        action: String,
        rationale: String,
    ) -> Self {
        Self {
            suggestion_type,
            priority,
            file: file.to_string(),
            description: description.to_string(),
            action,
            rationale,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypeCounts {
    pub spec: usize,
    pub test: usize,
    pub doc: usize,
    pub bridge: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SuggestionSummary {
    pub total: usize,
    pub by_type: TypeCounts,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Suggestions sharing one target file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionGroup {
    pub file: String,
    #[serde(rename = "type")]
    pub group_type: SuggestionType,
    pub count: usize,
    pub max_priority: u32,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SuggestionReport {
    pub summary: SuggestionSummary,
    pub ordered: Vec<Suggestion>,
    pub groups: Vec<SuggestionGroup>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub minimal_change_policy: BTreeMap<String, String>,
}

impl SuggestionReport {
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// An issue with its optional fields resolved, as seen by the rule table.
struct IssueView<'a> {
    issue_type: &'a str,
    file: &'a str,
    description: &'a str,
    lower: String,
    hint: &'a str,
}

impl<'a> IssueView<'a> {
    /// Returns `None` for an issue carrying neither a file nor a description.
    fn resolve(issue: &'a Issue) -> Option<Self> {
        let file = issue.file.as_deref().map(str::trim).unwrap_or("");
        let description = issue.description.as_deref().map(str::trim).unwrap_or("");
        if file.is_empty() && description.is_empty() {
            return None;
        }
        Some(Self {
            issue_type: issue.issue_type.as_str(),
            file,
            description,
            lower: description.to_lowercase(),
            hint: issue.suggestion.as_deref().unwrap_or(""),
        })
    }

    fn mentions(&self, needle: &str) -> bool {
        self.lower.contains(needle)
    }
}

/// Free-text extractors shared by the rule generators.
struct Extractors {
    endpoint: Option<Regex>,
    model: Option<Regex>,
    test_file: Option<Regex>,
    doc_file: Option<Regex>,
    uncovered: Option<Regex>,
}

impl Extractors {
    fn new() -> Self {
        Self {
            endpoint: Regex::new(r#"\b(GET|POST|PUT|DELETE|PATCH)\s+(/[^\s`'",]+)"#).ok(),
            model: Regex::new(r"(?i)model '([^']+)'").ok(),
            test_file: Regex::new(r"tests/\S+\.\w+").ok(),
            doc_file: Regex::new(r"docs/\S+\.md").ok(),
            uncovered: Regex::new(r"lack test coverage: (.+)$").ok(),
        }
    }

    fn endpoint<'t>(&self, text: &'t str) -> Option<(&'t str, &'t str)> {
        let caps = self.endpoint.as_ref()?.captures(text)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    fn model<'t>(&self, text: &'t str) -> Option<&'t str> {
        let caps = self.model.as_ref()?.captures(text)?;
        Some(caps.get(1)?.as_str())
    }

    fn test_file<'t>(&self, text: &'t str) -> Option<&'t str> {
        Some(self.test_file.as_ref()?.find(text)?.as_str())
    }

    fn doc_file<'t>(&self, text: &'t str) -> Option<&'t str> {
        Some(self.doc_file.as_ref()?.find(text)?.as_str())
    }

    fn uncovered<'t>(&self, text: &'t str) -> Option<&'t str> {
        let caps = self.uncovered.as_ref()?.captures(text)?;
        Some(caps.get(1)?.as_str())
    }
}

/// Everything a generator may consult besides the issue itself.
struct GenerationContext<'a> {
    spec_path: &'a str,
    file_mappings: &'a BTreeMap<String, Vec<String>>,
    extract: &'a Extractors,
}

impl GenerationContext<'_> {
    fn mentions_endpoint(&self, issue: &IssueView) -> bool {
        issue.mentions("endpoint") || self.extract.endpoint(issue.description).is_some()
    }

    /// Prefers a correlated target that looks like a test, then the
    /// conventional `tests/unit/test_<stem>.<ext>` location.
    fn test_target_for(&self, file: &str) -> String {
        if let Some(target) = self
            .file_mappings
            .get(file)
            .and_then(|targets| targets.iter().find(|t| t.contains("test")))
        {
            return target.clone();
        }
        let path = Path::new(file);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "py".to_string());
        format!("tests/unit/test_{stem}.{ext}")
    }
}

type Predicate = fn(&IssueView, &GenerationContext) -> bool;
type Generator = fn(&IssueView, &GenerationContext) -> Suggestion;

/// One row of a category's rule table. The first matching row wins.
struct SuggestionRule {
    name: &'static str,
    applies: Predicate,
    build: Generator,
}

fn not_in_spec(issue: &IssueView) -> bool {
    issue.description.contains("not defined in spec") || issue.description.contains("not in spec")
}

fn not_in_code(issue: &IssueView) -> bool {
    issue.description.contains("not found in code") || issue.description.contains("missing from code")
}

const SPEC_RULES: &[SuggestionRule] = &[
    SuggestionRule {
        name: "endpoint_not_in_spec",
        applies: |issue, ctx| not_in_spec(issue) && ctx.mentions_endpoint(issue),
        build: |issue, ctx| {
            let action = match ctx.extract.endpoint(issue.description) {
                Some((method, path)) => format!(
                    "Add endpoint definition to spec:\n  - path: \"{path}\"\n    method: \"{method}\"\n    \
                     description: \"[Add description]\"\n    response:\n      type: \"[Add type]\""
                ),
                None => "Add the endpoint definition to the spec file with path, method, description, and response schema"
                    .to_string(),
            };
            Suggestion::new(
                SuggestionType::Spec,
                10,
                ctx.spec_path,
                "Add endpoint definition to spec",
                action,
                format!("Code implements endpoint not defined in spec: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "model_not_in_spec",
        applies: |issue, _| not_in_spec(issue) && issue.mentions("model"),
        build: |issue, ctx| {
            let action = match ctx.extract.model(issue.description) {
                Some(model) => format!(
                    "Add model definition to spec:\n  {model}:\n    fields:\n      - name: \"[field_name]\"\n        \
                     type: \"[field_type]\""
                ),
                None => "Add the model definition to the spec file with all fields and their types".to_string(),
            };
            Suggestion::new(
                SuggestionType::Spec,
                10,
                ctx.spec_path,
                "Add model definition to spec",
                action,
                format!("Code implements model not defined in spec: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "endpoint_not_in_code",
        applies: |issue, ctx| not_in_code(issue) && ctx.mentions_endpoint(issue),
        build: |issue, ctx| {
            let action = match ctx.extract.endpoint(issue.description) {
                Some((method, path)) => format!(
                    "Either:\n  1. Implement the {method} {path} endpoint in code, OR\n  \
                     2. Remove the endpoint definition from the spec if it's no longer needed"
                ),
                None => "Either implement the endpoint in code or remove it from the spec".to_string(),
            };
            Suggestion::new(
                SuggestionType::Spec,
                9,
                issue.file,
                "Implement missing endpoint or remove from spec",
                action,
                format!("Spec defines endpoint not implemented in code: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "model_not_in_code",
        applies: |issue, _| not_in_code(issue) && issue.mentions("model"),
        build: |issue, ctx| {
            let action = match ctx.extract.model(issue.description) {
                Some(model) => format!(
                    "Either:\n  1. Implement the {model} model in code, OR\n  \
                     2. Remove the model definition from the spec if it's no longer needed"
                ),
                None => "Either implement the model in code or remove it from the spec".to_string(),
            };
            Suggestion::new(
                SuggestionType::Spec,
                9,
                issue.file,
                "Implement missing model or remove from spec",
                action,
                format!("Spec defines model not implemented in code: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "field_mismatch",
        applies: |issue, _| issue.mentions("missing fields") || issue.mentions("extra fields"),
        build: |issue, ctx| {
            let action = if issue.mentions("missing fields") {
                "Add the missing fields to the model implementation in code, or remove them from the spec if they're not needed"
            } else {
                "Either add the extra fields to the spec, or remove them from the code implementation"
            };
            Suggestion::new(
                SuggestionType::Spec,
                8,
                ctx.spec_path,
                "Align model fields between spec and code",
                action.to_string(),
                format!("Model fields don't match between spec and code: {}", issue.description),
            )
        },
    },
];

const TEST_RULES: &[SuggestionRule] = &[
    SuggestionRule {
        name: "missing_tests",
        applies: |issue, _| issue.issue_type == "missing_tests",
        build: |issue, ctx| {
            let test_file = ctx.test_target_for(issue.file);
            Suggestion::new(
                SuggestionType::Test,
                7,
                &test_file,
                &format!("Create test file for {}", issue.file),
                format!("Create {test_file} with tests for all public functions in {}", issue.file),
                format!("Code file has no corresponding test file: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "empty_test_file",
        applies: |issue, _| issue.issue_type == "insufficient_coverage" && issue.mentions("no test functions"),
        build: |issue, ctx| {
            let test_file = ctx
                .extract
                .test_file(issue.hint)
                .map(str::to_string)
                .unwrap_or_else(|| ctx.test_target_for(issue.file));
            Suggestion::new(
                SuggestionType::Test,
                8,
                &test_file,
                "Add test functions to empty test file",
                format!("Add test functions to {test_file} to cover functionality in {}", issue.file),
                format!("Test file exists but contains no tests: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "untested_functions",
        applies: |issue, _| issue.issue_type == "insufficient_coverage",
        build: |issue, ctx| {
            let test_file = ctx.extract.test_file(issue.hint);
            let action = match (ctx.extract.uncovered(issue.description), test_file) {
                (Some(functions), Some(test_file)) => {
                    format!("Add test functions to {test_file} to cover: {functions}")
                }
                (Some(functions), None) => format!("Add test functions to cover: {functions}"),
                (None, _) if !issue.hint.is_empty() => issue.hint.to_string(),
                (None, _) => "Add tests for untested functions".to_string(),
            };
            let target = test_file
                .map(str::to_string)
                .unwrap_or_else(|| ctx.test_target_for(issue.file));
            Suggestion::new(
                SuggestionType::Test,
                6,
                &target,
                "Add tests for untested functions",
                action,
                format!("Some functions lack test coverage: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "orphan_test_file",
        applies: |issue, _| {
            issue.issue_type == "misalignment" && issue.description.contains("no corresponding code file")
        },
        build: |issue, _| {
            Suggestion::new(
                SuggestionType::Test,
                5,
                issue.file,
                "Fix test file naming or create corresponding code",
                "Rename test file to match code file naming conventions or create the missing code file".to_string(),
                format!("Test file has no corresponding code file: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "stale_test_reference",
        applies: |issue, _| {
            issue.issue_type == "misalignment"
                && (issue.description.contains("don't exist") || issue.description.contains("non-existent"))
        },
        build: |issue, _| {
            Suggestion::new(
                SuggestionType::Test,
                7,
                issue.file,
                "Update tests to match current code",
                "Remove or update tests that reference non-existent functions".to_string(),
                format!("Tests reference functions that don't exist: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "spec_required_tests",
        applies: |issue, _| issue.issue_type == "misalignment" && issue.description.contains("spec requires tests"),
        build: |issue, ctx| {
            let action = match ctx.extract.endpoint(issue.description) {
                Some((method, path)) => format!("Add test for {method} {path} endpoint as required by spec"),
                None => "Add tests as required by spec".to_string(),
            };
            Suggestion::new(
                SuggestionType::Test,
                8,
                issue.file,
                "Add tests required by spec",
                action,
                format!("Spec requires tests that are missing: {}", issue.description),
            )
        },
    },
];

const DOC_RULES: &[SuggestionRule] = &[
    SuggestionRule {
        name: "undocumented_endpoint",
        applies: |issue, ctx| issue.issue_type == "missing_docs" && ctx.mentions_endpoint(issue),
        build: |issue, ctx| {
            let doc_file = ctx.extract.doc_file(issue.hint);
            let action = match (ctx.extract.endpoint(issue.description), doc_file) {
                (Some((method, path)), Some(doc_file)) => format!(
                    "Add documentation for {method} {path} to {doc_file} including:\n  - Description\n  \
                     - Request format\n  - Response format\n  - Example"
                ),
                _ if !issue.hint.is_empty() => issue.hint.to_string(),
                _ => "Add endpoint documentation".to_string(),
            };
            Suggestion::new(
                SuggestionType::Doc,
                5,
                doc_file.unwrap_or("docs/api/"),
                "Document API endpoint",
                action,
                format!("API endpoint lacks documentation: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "undocumented_handler",
        applies: |issue, _| issue.issue_type == "missing_docs" && issue.mentions("handler file"),
        build: |issue, _| {
            Suggestion::new(
                SuggestionType::Doc,
                6,
                issue.file,
                "Create API documentation for handler",
                format!("Create documentation file for endpoints in {}", issue.file),
                format!("Handler file has no documentation: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "doc_code_mismatch",
        applies: |issue, _| issue.issue_type == "doc_code_mismatch" && issue.description.contains("not found in"),
        build: |issue, ctx| {
            let action = match ctx.extract.endpoint(issue.description) {
                Some((method, path)) => {
                    format!("Remove documentation for {method} {path} or implement the endpoint if it should exist")
                }
                None if !issue.hint.is_empty() => issue.hint.to_string(),
                None => "Remove or update outdated documentation".to_string(),
            };
            Suggestion::new(
                SuggestionType::Doc,
                6,
                issue.file,
                "Remove or update outdated documentation",
                action,
                format!("Documentation describes non-existent functionality: {}", issue.description),
            )
        },
    },
    SuggestionRule {
        name: "outdated_docs",
        applies: |issue, _| issue.issue_type == "outdated_docs",
        build: |issue, _| {
            let action = if issue.hint.is_empty() {
                "Remove documentation for removed functionality".to_string()
            } else {
                issue.hint.to_string()
            };
            Suggestion::new(
                SuggestionType::Doc,
                5,
                issue.file,
                "Remove documentation for removed features",
                action,
                format!("Documentation describes removed functionality: {}", issue.description),
            )
        },
    },
];

/// Turns checker reports into an ordered, grouped remediation plan.
pub struct SuggestionEngine {
    spec_path: String,
    extract: Extractors,
}

impl SuggestionEngine {
    pub fn new(spec_path: &str) -> Self {
        Self {
            spec_path: spec_path.to_string(),
            extract: Extractors::new(),
        }
    }

    /// Maps every issue of every present report to a suggestion, then
    /// scores, orders and groups them.
    pub fn generate(
        &self,
        reports: &Reports,
        file_mappings: &BTreeMap<String, Vec<String>>,
    ) -> SuggestionReport {
        let ctx = GenerationContext {
            spec_path: &self.spec_path,
            file_mappings,
            extract: &self.extract,
        };

        let mut suggestions = Vec::new();
        for kind in CheckKind::ORDER {
            let Some(report) = reports.get(kind) else {
                continue;
            };
            for issue in &report.issues {
                if let Some(suggestion) = self.suggest(kind, issue, &ctx) {
                    suggestions.push(suggestion);
                }
            }
        }

        debug!(count = suggestions.len(), "Generated suggestions");
        prioritize(suggestions)
    }

    fn suggest(&self, kind: CheckKind, issue: &Issue, ctx: &GenerationContext) -> Option<Suggestion> {
        let Some(view) = IssueView::resolve(issue) else {
            warn!(category = %kind, issue_type = %issue.issue_type, "Skipping issue with neither file nor description");
            return None;
        };
        if issue.file.as_deref().is_none_or(|f| f.trim().is_empty())
            || issue.description.as_deref().is_none_or(|d| d.trim().is_empty())
        {
            warn!(category = %kind, issue_type = %issue.issue_type, "Issue is missing a field, using an empty value");
        }

        let table = match kind {
            CheckKind::Drift => SPEC_RULES,
            CheckKind::Test => TEST_RULES,
            CheckKind::Documentation => DOC_RULES,
            CheckKind::Bridge => return Some(bridge_suggestion(issue, &view)),
        };

        let suggestion = match table.iter().find(|rule| (rule.applies)(&view, ctx)) {
            Some(rule) => {
                debug!(rule = rule.name, file = %view.file, "Suggestion rule matched");
                (rule.build)(&view, ctx)
            }
            None => fallback_suggestion(SuggestionType::for_check(kind), &view),
        };
        Some(suggestion)
    }
}

/// Unrecognised issues are echoed verbatim rather than dropped.
fn fallback_suggestion(suggestion_type: SuggestionType, issue: &IssueView) -> Suggestion {
    let action = if issue.hint.is_empty() {
        issue.description.to_string()
    } else {
        issue.hint.to_string()
    };
    Suggestion::new(
        suggestion_type,
        suggestion_type.weight(),
        issue.file,
        issue.description,
        action,
        format!("Reported by the {suggestion_type} checker ({})", issue.issue_type),
    )
}

fn bridge_suggestion(issue: &Issue, view: &IssueView) -> Suggestion {
    let details = issue.details.clone().unwrap_or_default();
    let file = details
        .location
        .split_once(':')
        .map(|(file, _)| file.to_string())
        .unwrap_or_default();
    let description = if details.dependency.is_empty() {
        view.description.to_string()
    } else {
        format!("[{}] {}", details.dependency, view.description)
    };

    let mut suggestion = Suggestion::new(
        SuggestionType::Bridge,
        BRIDGE_PRIORITY,
        &file,
        &description,
        view.hint.to_string(),
        "API usage does not match the provider's contract".to_string(),
    );
    suggestion.details = Some(details);
    suggestion
}

/// Severity boost from the description; tiers are exclusive, first wins.
pub fn severity_boost(description: &str) -> u32 {
    let lower = description.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|word| lower.contains(word));
    if any(&["critical", "breaking", "error"]) {
        3
    } else if any(&["missing", "required", "must"]) {
        2
    } else if any(&["should", "recommended"]) {
        1
    } else {
        0
    }
}

/// `+1` for central files whose name contains `main` or `models`.
pub fn file_boost(file: &str) -> u32 {
    let name = file.rsplit('/').next().unwrap_or(file);
    u32::from(name.contains("main") || name.contains("models"))
}

/// Applies boosts, orders, groups and summarises a batch of suggestions.
pub fn prioritize(mut suggestions: Vec<Suggestion>) -> SuggestionReport {
    for suggestion in &mut suggestions {
        if suggestion.suggestion_type == SuggestionType::Bridge {
            continue;
        }
        let adjusted =
            suggestion.priority + severity_boost(&suggestion.description) + file_boost(&suggestion.file);
        suggestion.priority = adjusted.min(MAX_PRIORITY);
    }

    order(&mut suggestions);
    let groups = group_by_file(&suggestions);
    let summary = summarize(&suggestions);

    SuggestionReport {
        summary,
        ordered: suggestions,
        groups,
        minimal_change_policy: BTreeMap::new(),
    }
}

/// Category weight first, then adjusted priority, then file path.
pub fn order(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        b.suggestion_type
            .weight()
            .cmp(&a.suggestion_type.weight())
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.file.cmp(&b.file))
    });
}

fn group_by_file(ordered: &[Suggestion]) -> Vec<SuggestionGroup> {
    let mut groups: Vec<SuggestionGroup> = Vec::new();
    for suggestion in ordered {
        match groups.iter_mut().find(|group| group.file == suggestion.file) {
            Some(group) => group.suggestions.push(suggestion.clone()),
            None => groups.push(SuggestionGroup {
                file: suggestion.file.clone(),
                group_type: suggestion.suggestion_type,
                count: 0,
                max_priority: 0,
                suggestions: vec![suggestion.clone()],
            }),
        }
    }

    for group in &mut groups {
        group.suggestions.sort_by(|a, b| b.priority.cmp(&a.priority));
        group.count = group.suggestions.len();
        group.max_priority = group.suggestions.iter().map(|s| s.priority).max().unwrap_or(0);
        if let Some(first) = group.suggestions.first() {
            group.group_type = first.suggestion_type;
        }
    }
    groups.sort_by(|a, b| b.max_priority.cmp(&a.max_priority));
    groups
}

fn summarize(suggestions: &[Suggestion]) -> SuggestionSummary {
    let mut summary = SuggestionSummary {
        total: suggestions.len(),
        ..SuggestionSummary::default()
    };
    for suggestion in suggestions {
        match suggestion.suggestion_type {
            SuggestionType::Spec => summary.by_type.spec += 1,
            SuggestionType::Test => summary.by_type.test += 1,
            SuggestionType::Doc => summary.by_type.doc += 1,
            SuggestionType::Bridge => summary.by_type.bridge += 1,
        }
        match suggestion.priority {
            p if p >= HIGH_PRIORITY => summary.high += 1,
            p if p >= MEDIUM_PRIORITY => summary.medium += 1,
            _ => summary.low += 1,
        }
    }
    summary
}
