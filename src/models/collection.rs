use crate::error::{EngineError, Result, SchemaError};
use crate::models::links::{Link, LinkGraph};
use crate::models::snippet::{
    LinkType, OverrideMode, Placeholder, Snippet, SnippetId, check_placeholder_id,
    is_valid_persisted_name, split_suffix,
};
use crate::models::values::PlaceholderValues;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

/// Ordered, uniquely named set of snippets together with their links and
/// placeholder values.
#[derive(Debug, Clone, Default)]
pub struct SnippetCollection {
    snippets: HashMap<SnippetId, Snippet>,
    order: Vec<SnippetId>,
    links: LinkGraph,
    values: PlaceholderValues,
}

impl SnippetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Snippets in collection order.
    pub fn iter(&self) -> impl Iterator<Item = (SnippetId, &Snippet)> {
        self.order
            .iter()
            .filter_map(|id| self.snippets.get(id).map(|s| (*id, s)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(_, s)| s.name.as_str()).collect()
    }

    pub fn id_of(&self, name: &str) -> Option<SnippetId> {
        self.iter().find(|(_, s)| s.name == name).map(|(id, _)| id)
    }

    pub fn get(&self, name: &str) -> Option<&Snippet> {
        self.id_of(name).and_then(|id| self.snippets.get(&id))
    }

    pub fn by_id(&self, id: SnippetId) -> Option<&Snippet> {
        self.snippets.get(&id)
    }

    pub fn position(&self, id: SnippetId) -> Option<usize> {
        self.order.iter().position(|x| *x == id)
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn values(&self) -> &PlaceholderValues {
        &self.values
    }

    pub fn clear(&mut self) {
        self.snippets.clear();
        self.order.clear();
        self.links.clear();
        self.values.clear();
    }

    /// Inserts a snippet with no outgoing links. See [`Self::add_with_links`].
    pub fn add(&mut self, snippet: Snippet, mode: OverrideMode) -> Result<SnippetId> {
        self.add_with_links(snippet, mode, Vec::new())
    }

    /// Inserts a snippet and records `links` as its outgoing edges.
    ///
    /// With [`OverrideMode::Overwrite`] an existing snippet of the same name is
    /// replaced in place. Otherwise the snippet is appended, renamed to
    /// `base(N)` when its base name is already taken.
    pub fn add_with_links(
        &mut self,
        mut snippet: Snippet,
        mode: OverrideMode,
        links: Vec<Link>,
    ) -> Result<SnippetId> {
        if !is_valid_persisted_name(&snippet.name) {
            return Err(EngineError::InvalidName(snippet.name));
        }
        let issues = snippet.schema_issues(true);
        if !issues.is_empty() {
            return Err(SchemaError::Invalid(issues).into());
        }
        // insertion-time directives are not part of the stored record
        snippet.override_mode = None;
        snippet.imports = None;

        if mode == OverrideMode::Overwrite {
            if let Some(id) = self.id_of(&snippet.name) {
                debug!(name = %snippet.name, "overwriting snippet in place");
                self.values.prune(id, &snippet);
                self.values.backfill(id, &snippet);
                self.snippets.insert(id, snippet);
                self.links.set_links(id, links);
                return Ok(id);
            }
        } else {
            snippet.name = self.free_name(&snippet.name)?;
        }

        let id = SnippetId::new();
        debug!(name = %snippet.name, %id, "adding snippet");
        self.values.backfill(id, &snippet);
        self.snippets.insert(id, snippet);
        self.order.push(id);
        self.links.set_links(id, links);
        Ok(id)
    }

    /// The name a duplicate-mode insertion of `name` ends up with.
    pub fn free_name(&self, name: &str) -> Result<String> {
        let (base, _) = split_suffix(name);
        let pattern = format!(r"^{}(\((\d+)\))?$", regex::escape(base));
        let re = Regex::new(&pattern)
            .map_err(|e| EngineError::InvalidName(format!("{}: {}", name, e)))?;

        let highest = self
            .iter()
            .filter_map(|(_, s)| re.captures(&s.name))
            .map(|caps| {
                caps.get(2)
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .unwrap_or(0)
            })
            .max();

        Ok(match highest {
            Some(n) => format!("{}({})", base, n + 1),
            None => name.to_string(),
        })
    }

    /// Removes `name` and everything that cascades from it. Returns the names removed.
    pub fn remove(&mut self, name: &str) -> Result<Vec<String>> {
        let root = self.require(name)?;
        let doomed = self.links.cascade(root);
        let mut removed = Vec::with_capacity(doomed.len());

        for id in doomed {
            if let Some(snippet) = self.snippets.remove(&id) {
                removed.push(snippet.name);
            }
            self.order.retain(|x| *x != id);
            self.values.remove_snippet(id);
            self.links.remove_node(id);
        }

        if removed.len() > 1 {
            info!(root = name, removed = ?removed, "cascading removal");
        }
        Ok(removed)
    }

    /// Shifts `name` by `delta` positions. Moves that leave the collection or
    /// cross a linked neighbour are ignored and return `false`.
    pub fn move_by(&mut self, name: &str, delta: isize) -> Result<bool> {
        self.shift(name, |current| current.checked_add_signed(delta))
    }

    pub fn move_up(&mut self, name: &str, count: usize) -> Result<bool> {
        self.shift(name, |current| current.checked_sub(count))
    }

    pub fn move_down(&mut self, name: &str, count: usize) -> Result<bool> {
        self.shift(name, |current| current.checked_add(count))
    }

    fn shift(&mut self, name: &str, target: impl FnOnce(usize) -> Option<usize>) -> Result<bool> {
        let id = self.require(name)?;
        let Some(current) = self.position(id) else {
            return Ok(false);
        };
        let len = self.order.len();
        let Some(target) = target(current).filter(|t| *t != current && *t < len) else {
            debug!(name, current, "move out of range");
            return Ok(false);
        };

        let bounds = self
            .links
            .move_bounds(id, current, |other| self.position(other));
        if !bounds.allows(target) {
            debug!(name, target, ?bounds, "move blocked by linked snippet");
            return Ok(false);
        }

        self.order.remove(current);
        self.order.insert(target, id);
        Ok(true)
    }

    /// Records an edge from `source` to `target`.
    pub fn link(&mut self, source: &str, target: &str, link_type: LinkType) -> Result<()> {
        let source = self.require(source)?;
        let target = self.require(target)?;
        self.links.add_link(source, target, link_type);
        Ok(())
    }

    pub fn edit_code(&mut self, name: &str, code: impl Into<String>) -> Result<()> {
        self.snippet_mut(name)?.code = code.into();
        Ok(())
    }

    pub fn edit_error_code(&mut self, name: &str, error_code: Option<String>) -> Result<()> {
        self.snippet_mut(name)?.error_code = error_code;
        Ok(())
    }

    pub fn set_readonly(&mut self, name: &str, readonly: bool) -> Result<()> {
        self.snippet_mut(name)?.readonly = readonly;
        Ok(())
    }

    pub fn add_placeholder(&mut self, name: &str, placeholder: Placeholder) -> Result<()> {
        check_placeholder_id(&placeholder.id).map_err(EngineError::InvalidPlaceholder)?;
        if placeholder.needle.is_empty() {
            return Err(EngineError::InvalidPlaceholder(format!(
                "placeholder `{}` has an empty needle",
                placeholder.id
            )));
        }

        let id = self.require(name)?;
        let snippet = self.snippet_mut(name)?;
        if snippet.placeholder(&placeholder.id).is_some() {
            return Err(EngineError::InvalidPlaceholder(format!(
                "`{}` already has a placeholder `{}`",
                name, placeholder.id
            )));
        }
        if snippet
            .placeholders
            .iter()
            .any(|ph| ph.needle == placeholder.needle)
        {
            return Err(EngineError::InvalidPlaceholder(format!(
                "`{}` already has a placeholder for needle `{}`",
                name, placeholder.needle
            )));
        }
        snippet.placeholders.push(placeholder);
        let snippet = snippet.clone();
        self.values.backfill(id, &snippet);
        Ok(())
    }

    pub fn remove_placeholder(&mut self, name: &str, placeholder: &str) -> Result<()> {
        let id = self.require(name)?;
        let snippet = self.snippet_mut(name)?;
        let before = snippet.placeholders.len();
        snippet.placeholders.retain(|ph| ph.id != placeholder);
        if snippet.placeholders.len() == before {
            return Err(placeholder_not_found(name, placeholder));
        }
        self.values.remove_placeholder(id, placeholder);
        Ok(())
    }

    /// Replaces a placeholder's pattern. `None` or an empty string restores the default pattern.
    pub fn edit_placeholder_pattern(
        &mut self,
        name: &str,
        placeholder: &str,
        pattern: Option<String>,
    ) -> Result<()> {
        self.placeholder_mut(name, placeholder)?.required.pattern_string = pattern;
        Ok(())
    }

    pub fn edit_placeholder_default(
        &mut self,
        name: &str,
        placeholder: &str,
        default: Option<String>,
    ) -> Result<()> {
        self.placeholder_mut(name, placeholder)?.required.default = default;
        Ok(())
    }

    pub fn set_value(
        &mut self,
        name: &str,
        placeholder: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        let id = self.require(name)?;
        if self.snippets.get(&id).and_then(|s| s.placeholder(placeholder)).is_none() {
            return Err(placeholder_not_found(name, placeholder));
        }
        self.values.set(id, placeholder, value);
        Ok(())
    }

    /// Gives every placeholder without a value its default. Returns whether anything changed.
    pub fn backfill_values(&mut self) -> bool {
        let mut changed = false;
        for id in &self.order {
            if let Some(snippet) = self.snippets.get(id) {
                changed |= self.values.backfill(*id, snippet);
            }
        }
        changed
    }

    /// Appends a snippet exactly as given, skipping validation and renaming.
    pub(crate) fn push_restored(&mut self, snippet: Snippet) -> SnippetId {
        let id = SnippetId::new();
        self.snippets.insert(id, snippet);
        self.order.push(id);
        id
    }

    pub(crate) fn links_mut(&mut self) -> &mut LinkGraph {
        &mut self.links
    }

    pub(crate) fn values_mut(&mut self) -> &mut PlaceholderValues {
        &mut self.values
    }

    fn require(&self, name: &str) -> Result<SnippetId> {
        self.id_of(name)
            .ok_or_else(|| EngineError::SnippetNotFound(name.to_string()))
    }

    fn snippet_mut(&mut self, name: &str) -> Result<&mut Snippet> {
        let id = self.require(name)?;
        self.snippets
            .get_mut(&id)
            .ok_or_else(|| EngineError::SnippetNotFound(name.to_string()))
    }

    fn placeholder_mut(&mut self, name: &str, placeholder: &str) -> Result<&mut Placeholder> {
        self.snippet_mut(name)?
            .placeholder_mut(placeholder)
            .ok_or_else(|| placeholder_not_found(name, placeholder))
    }
}

fn placeholder_not_found(snippet: &str, placeholder: &str) -> EngineError {
    EngineError::PlaceholderNotFound {
        snippet: snippet.to_string(),
        placeholder: placeholder.to_string(),
    }
}
