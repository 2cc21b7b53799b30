use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::error::{GovernanceError, Result};

/// Named values captured from a path by a `{name}` segment.
pub type Captures = BTreeMap<String, String>;

/// A compiled matcher over `/`-delimited path strings.
///
/// Supported syntax:
/// * `**/` - zero or more leading directories
/// * `**` - any characters, `/` included
/// * `*` - any characters within one segment
/// * `{name}` - a named capture of one or more non-`/` characters
///
/// Everything else is matched literally. The pattern is anchored to the whole
/// path. A compiled pattern is immutable and can be tested against any number
/// of paths.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    capture_names: Vec<String>,
}

impl PathPattern {
    /// Compiles a glob-like pattern.
    ///
    /// Tokens are consumed longest-first (`**/`, then `**`, then `*`) so the
    /// double-star token is never split into two single stars.
    ///
    /// # Errors
    /// Returns `GovernanceError::InvalidPattern` when the translated expression
    /// does not compile, for example when the same `{name}` appears twice.
    pub fn compile(pattern: &str) -> Result<Self> {
        let (expression, capture_names) = translate(pattern);
        let regex = Regex::new(&expression).map_err(|source| GovernanceError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            capture_names,
        })
    }

    /// Returns `true` when the whole path matches. Never fails.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extracts the named captures for a matching path.
    ///
    /// Returns `None` when the path does not match and an empty map when the
    /// pattern has no `{name}` segments.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let values = self
            .capture_names
            .iter()
            .filter_map(|name| {
                caps.name(name)
                    .map(|value| (name.clone(), value.as_str().to_string()))
            })
            .collect();
        Some(values)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Substitutes every `{name}` in `template` with its captured value.
///
/// Placeholders with no captured value are left untouched, so the produced
/// mapping degrades instead of the file being dropped.
pub fn expand(captures: &Captures, template: &str) -> String {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        expanded.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match capture_token(candidate) {
            Some((name, tail)) => {
                match captures.get(name) {
                    Some(value) => expanded.push_str(value),
                    None => expanded.push_str(&candidate[..candidate.len() - tail.len()]),
                }
                rest = tail;
            }
            None => {
                expanded.push('{');
                rest = &candidate[1..];
            }
        }
    }

    expanded.push_str(rest);
    expanded
}

/// Lists the `{name}` placeholders referenced by a template, in order.
pub fn template_placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let candidate = &rest[start..];
        match capture_token(candidate) {
            Some((name, tail)) => {
                names.push(name.to_string());
                rest = tail;
            }
            None => rest = &candidate[1..],
        }
    }

    names
}

fn translate(pattern: &str) -> (String, Vec<String>) {
    let mut expression = String::from("^");
    let mut names = Vec::new();
    let mut rest = pattern;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**/") {
            expression.push_str("(?:.*/)?");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("**") {
            expression.push_str(".*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            expression.push_str("[^/]*");
            rest = tail;
        } else if let Some((name, tail)) = capture_token(rest) {
            expression.push_str(&format!("(?P<{name}>[^/]+)"));
            names.push(name.to_string());
            rest = tail;
        } else {
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                expression.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
            }
            rest = chars.as_str();
        }
    }

    expression.push('$');
    (expression, names)
}

/// Splits a leading `{name}` token off `input`, if there is one.
fn capture_token(input: &str) -> Option<(&str, &str)> {
    let body = input.strip_prefix('{')?;
    let end = body.find('}')?;
    let name = &body[..end];
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, &body[end + 1..]))
}
