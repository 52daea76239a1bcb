use crate::error::{EngineError, IntegrityError, SchemaError};
use crate::models::SnippetCollection;
use crate::models::links::Link;
use crate::models::snippet::{LinkType, Snippet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// String key-value storage holding the persisted snapshot and the quarantined payload.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Storage backed by one file per key in a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Opens the store in the platform data directory.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .context("Failed to get data directory")?
            .join("snix-compose");
        Self::with_dir(data_dir)
    }

    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
        Ok(())
    }
}

/// In-process storage, used by tests and embedders that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLink {
    pub name: String,
    pub link_type: LinkType,
}

pub type PersistedValues = BTreeMap<String, BTreeMap<String, String>>;
pub type PersistedLinks = BTreeMap<String, Vec<PersistedLink>>;

/// Name-keyed form of the engine state, stored as `[snippets, values, links]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot(
    pub Vec<Snippet>,
    pub PersistedValues,
    #[serde(default)] pub Option<PersistedLinks>,
);

impl Snapshot {
    pub fn snippets(&self) -> &[Snippet] {
        &self.0
    }

    pub fn values(&self) -> &PersistedValues {
        &self.1
    }

    pub fn links(&self) -> Option<&PersistedLinks> {
        self.2.as_ref()
    }

    pub fn from_collection(collection: &SnippetCollection) -> Self {
        let mut snippets = Vec::with_capacity(collection.len());
        let mut values = PersistedValues::new();
        let mut links = PersistedLinks::new();

        for (id, snippet) in collection.iter() {
            snippets.push(snippet.clone());
            if let Some(entry) = collection.values().entry(id) {
                values.insert(snippet.name.clone(), entry.clone());
            }
            if collection.links().contains(id) {
                let outgoing = collection
                    .links()
                    .outgoing(id)
                    .iter()
                    .filter_map(|l| {
                        collection.by_id(l.target).map(|t| PersistedLink {
                            name: t.name.clone(),
                            link_type: l.link_type,
                        })
                    })
                    .collect();
                links.insert(snippet.name.clone(), outgoing);
            }
        }
        Self(snippets, values, Some(links))
    }

    pub fn encode(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and schema-checks a persisted payload.
    pub fn decode(raw: &str) -> Result<Self, SchemaError> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;

        let mut issues = Vec::new();
        let mut names = HashSet::new();
        for snippet in snapshot.snippets() {
            issues.extend(snippet.schema_issues(true));
            if !names.insert(snippet.name.as_str()) {
                issues.push(format!("duplicate snippet name `{}`", snippet.name));
            }
        }
        if issues.is_empty() {
            Ok(snapshot)
        } else {
            Err(SchemaError::Invalid(issues))
        }
    }

    /// Snippet count against link table keys.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let link_keys = self.links().map_or(0, BTreeMap::len);
        let keys_match = self
            .links()
            .map(|l| self.snippets().iter().all(|s| l.contains_key(&s.name)))
            .unwrap_or(self.snippets().is_empty());
        if self.snippets().len() != link_keys || !keys_match {
            return Err(IntegrityError {
                snippets: self.snippets().len(),
                link_keys,
            });
        }
        Ok(())
    }

    /// Rebuilds the in-memory collection. Links to unknown snippets are dropped.
    pub fn into_collection(self) -> Result<SnippetCollection, EngineError> {
        self.check_integrity()?;
        let Snapshot(snippets, mut values, links) = self;
        let links = links.unwrap_or_default();

        let mut collection = SnippetCollection::new();
        let mut ids = HashMap::new();
        for snippet in snippets {
            let name = snippet.name.clone();
            let id = collection.push_restored(snippet);
            collection.links_mut().insert_node(id);
            if let Some(entry) = values.remove(&name) {
                collection.values_mut().insert_entry(id, entry);
            }
            ids.insert(name, id);
        }

        for (name, outgoing) in links {
            let Some(source) = ids.get(&name).copied() else {
                continue;
            };
            let resolved = outgoing
                .into_iter()
                .filter_map(|l| match ids.get(&l.name) {
                    Some(target) => Some(Link::new(*target, l.link_type)),
                    None => {
                        warn!(source = %name, target = %l.name, "dropping link to unknown snippet");
                        None
                    }
                })
                .collect();
            collection.links_mut().set_links(source, resolved);
        }
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snippet::{OverrideMode, Placeholder};
    use pretty_assertions::assert_eq;

    fn sample() -> SnippetCollection {
        let mut c = SnippetCollection::new();
        c.add(
            Snippet::new("lib", "fn X() {}")
                .with_placeholder(Placeholder::new("f", "X").with_default("helper")),
            OverrideMode::Duplicate,
        )
        .unwrap();
        c.add(Snippet::new("app", "X();"), OverrideMode::Duplicate).unwrap();
        c.add(Snippet::new("app", ""), OverrideMode::Duplicate).unwrap();
        c.link("app", "lib", LinkType::DependsOn).unwrap();
        c.set_value("lib", "f", "run").unwrap();
        c
    }

    #[test]
    fn snapshot_round_trips() {
        let snapshot = Snapshot::from_collection(&sample());
        let raw = snapshot.encode().unwrap();
        let restored = Snapshot::decode(&raw).unwrap().into_collection().unwrap();
        assert_eq!(Snapshot::from_collection(&restored), snapshot);
        assert_eq!(restored.names(), vec!["lib", "app", "app(1)"]);
    }

    #[test]
    fn snapshot_is_an_ordered_triple() {
        let raw = Snapshot::from_collection(&sample()).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let parts = value.as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2]["app"][0]["name"], "lib");
        assert_eq!(parts[2]["app"][0]["linkType"], "dependson");
        assert_eq!(parts[1]["lib"]["f"], "run");
    }

    #[test]
    fn decode_rejects_bad_names() {
        let raw = r#"[[{"name":"bad name","code":"","placeholders":[]}],{},{}]"#;
        assert!(matches!(Snapshot::decode(raw), Err(SchemaError::Invalid(_))));
        assert!(matches!(Snapshot::decode("{nope"), Err(SchemaError::Json(_))));
    }

    #[test]
    fn missing_link_table_fails_integrity() {
        let raw = r#"[[{"name":"a","code":"","placeholders":[]}],{}]"#;
        let snapshot = Snapshot::decode(raw).unwrap();
        assert_eq!(
            snapshot.check_integrity(),
            Err(IntegrityError { snippets: 1, link_keys: 0 })
        );
        let empty = Snapshot::decode("[[],{}]").unwrap();
        assert!(empty.into_collection().unwrap().is_empty());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::with_dir(dir.path()).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
