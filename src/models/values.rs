use crate::models::snippet::{Placeholder, Snippet, SnippetId};
use std::collections::{BTreeMap, HashMap};

/// Current placeholder values, per snippet and placeholder id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderValues {
    values: HashMap<SnippetId, BTreeMap<String, String>>,
}

impl PlaceholderValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, snippet: SnippetId, placeholder: &str) -> Option<&str> {
        self.values
            .get(&snippet)
            .and_then(|m| m.get(placeholder))
            .map(String::as_str)
    }

    pub fn set(&mut self, snippet: SnippetId, placeholder: &str, value: impl Into<String>) {
        self.values
            .entry(snippet)
            .or_default()
            .insert(placeholder.to_string(), value.into());
    }

    pub fn entry(&self, snippet: SnippetId) -> Option<&BTreeMap<String, String>> {
        self.values.get(&snippet)
    }

    pub fn insert_entry(&mut self, snippet: SnippetId, entry: BTreeMap<String, String>) {
        self.values.insert(snippet, entry);
    }

    pub fn remove_snippet(&mut self, snippet: SnippetId) {
        self.values.remove(&snippet);
    }

    pub fn remove_placeholder(&mut self, snippet: SnippetId, placeholder: &str) {
        if let Some(entry) = self.values.get_mut(&snippet) {
            entry.remove(placeholder);
        }
    }

    /// Drops stored values for placeholder ids the snippet no longer declares.
    pub fn prune(&mut self, snippet: SnippetId, record: &Snippet) {
        if let Some(entry) = self.values.get_mut(&snippet) {
            entry.retain(|id, _| record.placeholder(id).is_some());
        }
    }

    /// Fills in a value for every placeholder that has none yet, using its
    /// default or the empty string. Returns whether anything was added.
    pub fn backfill(&mut self, snippet: SnippetId, record: &Snippet) -> bool {
        let entry = self.values.entry(snippet).or_default();
        let mut changed = false;
        for ph in &record.placeholders {
            if !entry.contains_key(&ph.id) {
                entry.insert(ph.id.clone(), ph.required.default_value().to_string());
                changed = true;
            }
        }
        changed
    }

    /// The value substituted for `placeholder`: the stored value when it is
    /// non-empty, else the placeholder default, else `""`.
    pub fn effective<'a>(&'a self, snippet: SnippetId, placeholder: &'a Placeholder) -> &'a str {
        match self.get(snippet, &placeholder.id) {
            Some(v) if !v.is_empty() => v,
            _ => placeholder.required.default_value(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfill_uses_defaults_once() {
        let id = SnippetId::new();
        let snippet = Snippet::new("s", "A B")
            .with_placeholder(Placeholder::new("a", "A").with_default("one"))
            .with_placeholder(Placeholder::new("b", "B"));
        let mut values = PlaceholderValues::new();
        assert!(values.backfill(id, &snippet));
        assert_eq!(values.get(id, "a"), Some("one"));
        assert_eq!(values.get(id, "b"), Some(""));

        values.set(id, "a", "two");
        assert!(!values.backfill(id, &snippet));
        assert_eq!(values.get(id, "a"), Some("two"));
    }

    #[test]
    fn empty_value_falls_back_to_default() {
        let id = SnippetId::new();
        let ph = Placeholder::new("n", "X").with_default("count");
        let mut values = PlaceholderValues::new();
        assert_eq!(values.effective(id, &ph), "count");
        values.set(id, "n", "");
        assert_eq!(values.effective(id, &ph), "count");
        values.set(id, "n", "total");
        assert_eq!(values.effective(id, &ph), "total");
    }

    #[test]
    fn prune_drops_vanished_placeholders() {
        let id = SnippetId::new();
        let mut values = PlaceholderValues::new();
        values.set(id, "a", "1");
        values.set(id, "gone", "2");
        let snippet = Snippet::new("s", "").with_placeholder(Placeholder::new("a", "A"));
        values.prune(id, &snippet);
        assert_eq!(values.get(id, "a"), Some("1"));
        assert_eq!(values.get(id, "gone"), None);
    }
}
