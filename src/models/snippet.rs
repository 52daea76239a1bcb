use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Pattern used when a placeholder does not declare its own.
pub const DEFAULT_PLACEHOLDER_PATTERN: &str = "^[a-zA-Z0-9]+$";

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9_-]+$").expect("static regex"));
static SUFFIXED_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9_-]+(\(\d+\))?$").expect("static regex"));
static PLACEHOLDER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+$").expect("static regex"));
static SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)\((\d+)\)$").expect("static regex"));

/// Stable arena key of a snippet. Names can be rewritten on insertion, ids never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnippetId(Uuid);

impl SnippetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SnippetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Collision policy applied when a snippet is inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideMode {
    Overwrite,
    #[default]
    Duplicate,
}

/// Kind of relation between two snippets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    None,
    /// The source needs the target earlier in the order.
    DependsOn,
    /// The source is needed by the target.
    IsDependent,
    /// Both snippets are locked into their relative order.
    Both,
}

impl LinkType {
    /// Whether this link keeps its endpoints from crossing each other.
    pub fn constrains_order(self) -> bool {
        !matches!(self, LinkType::None)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkType::None => "none",
            LinkType::DependsOn => "dependson",
            LinkType::IsDependent => "isdependent",
            LinkType::Both => "both",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetImport {
    pub link: String,
    #[serde(default)]
    pub link_type: LinkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_mode: Option<OverrideMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Requirement {
    /// The declared pattern, or the default one when absent or empty.
    pub fn pattern(&self) -> &str {
        match self.pattern_string.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_PLACEHOLDER_PATTERN,
        }
    }

    pub fn default_value(&self) -> &str {
        self.default.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub id: String,
    pub needle: String,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub required: Requirement,
}

impl Placeholder {
    pub fn new(id: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            needle: needle.into(),
            multiline: false,
            required: Requirement::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.required.pattern_string = Some(pattern.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.required.default = Some(default.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_mode: Option<OverrideMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<SnippetImport>>,
}

impl Snippet {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            error_code: None,
            placeholders: Vec::new(),
            readonly: false,
            override_mode: None,
            imports: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholders.push(placeholder);
        self
    }

    pub fn with_error_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    pub fn placeholder(&self, id: &str) -> Option<&Placeholder> {
        self.placeholders.iter().find(|ph| ph.id == id)
    }

    pub fn placeholder_mut(&mut self, id: &str) -> Option<&mut Placeholder> {
        self.placeholders.iter_mut().find(|ph| ph.id == id)
    }

    /// Schema problems with this record. `allow_suffix` accepts the `(N)` name
    /// suffix the collection produces, which persisted snapshots carry.
    pub fn schema_issues(&self, allow_suffix: bool) -> Vec<String> {
        let mut issues = Vec::new();
        let name_ok = if allow_suffix {
            is_valid_persisted_name(&self.name)
        } else {
            is_valid_name(&self.name)
        };
        if !name_ok {
            issues.push(format!("invalid snippet name `{}`", self.name));
        }

        let mut seen = HashSet::new();
        for ph in &self.placeholders {
            if let Err(issue) = check_placeholder_id(&ph.id) {
                issues.push(format!("{}: {}", self.name, issue));
            }
            if !seen.insert(ph.id.as_str()) {
                issues.push(format!("{}: duplicate placeholder id `{}`", self.name, ph.id));
            }
        }
        issues
    }
}

pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

pub fn is_valid_persisted_name(name: &str) -> bool {
    SUFFIXED_NAME_RE.is_match(name)
}

pub fn check_placeholder_id(id: &str) -> Result<(), String> {
    if PLACEHOLDER_ID_RE.is_match(id) {
        Ok(())
    } else {
        Err(format!("invalid placeholder id `{}`", id))
    }
}

/// Splits `foo(3)` into `("foo", Some(3))`. Names without a suffix return `None`.
pub fn split_suffix(name: &str) -> (&str, Option<u64>) {
    match SUFFIX_RE.captures(name) {
        Some(caps) => {
            let base = caps.get(1).map_or(name, |m| m.as_str());
            let n = caps.get(2).and_then(|m| m.as_str().parse().ok());
            match n {
                Some(n) => (base, Some(n)),
                None => (name, None),
            }
        }
        None => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert!(is_valid_name("my-snippet_2"));
        assert!(!is_valid_name("my snippet"));
        assert!(!is_valid_name("foo(1)"));
        assert!(is_valid_persisted_name("foo(1)"));
        assert!(!is_valid_persisted_name("foo(x)"));
    }

    #[test]
    fn suffix_split() {
        assert_eq!(split_suffix("foo(12)"), ("foo", Some(12)));
        assert_eq!(split_suffix("foo"), ("foo", None));
        assert_eq!(split_suffix("a(b)"), ("a(b)", None));
    }

    #[test]
    fn requirement_falls_back_to_default_pattern() {
        let mut req = Requirement::default();
        assert_eq!(req.pattern(), DEFAULT_PLACEHOLDER_PATTERN);
        req.pattern_string = Some(String::new());
        assert_eq!(req.pattern(), DEFAULT_PLACEHOLDER_PATTERN);
        req.pattern_string = Some("[0-9]+".into());
        assert_eq!(req.pattern(), "[0-9]+");
    }

    #[test]
    fn decodes_camel_case_definition() {
        let json = r#"{
            "name": "counter",
            "code": "let X = 1;",
            "errorCode": "// broken",
            "placeholders": [
                {"id": "n", "needle": "X", "required": {"patternString": "[a-z]+", "default": "count"}}
            ],
            "overrideMode": "overwrite",
            "imports": [{"link": "https://example.com/a.json", "linkType": "dependson"}]
        }"#;
        let snippet: Snippet = serde_json::from_str(json).unwrap();
        assert_eq!(snippet.error_code.as_deref(), Some("// broken"));
        assert_eq!(snippet.override_mode, Some(OverrideMode::Overwrite));
        assert_eq!(snippet.placeholders[0].required.default_value(), "count");
        let imports = snippet.imports.unwrap();
        assert_eq!(imports[0].link_type, LinkType::DependsOn);
        assert!(!snippet.readonly);
    }

    #[test]
    fn schema_issues_report_bad_ids() {
        let snippet = Snippet::new("ok", "")
            .with_placeholder(Placeholder::new("Bad", "x"))
            .with_placeholder(Placeholder::new("a", "y"))
            .with_placeholder(Placeholder::new("a", "z"));
        let issues = snippet.schema_issues(false);
        assert_eq!(issues.len(), 2);
    }
}
