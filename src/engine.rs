//! The composition engine: a snippet collection plus the state derived from it.
//!
//! Every mutation goes through [`Engine`], which afterwards recomputes the
//! generated output and the validation errors and then persists the snapshot,
//! in that order.

use crate::assembly::{Assembly, assemble};
use crate::config::{DEFAULT_ERROR_STORAGE_KEY, DEFAULT_STORAGE_KEY};
use crate::error::{EngineError, IntegrityError, Result, ValidationError};
use crate::models::snippet::is_valid_name;
use crate::models::{
    KeyValueStore, LinkType, OverrideMode, Placeholder, Snapshot, Snippet, SnippetCollection,
};
use crate::remote::{ImportResolver, SnippetSource};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Storage keys for the primary snapshot and the quarantined payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub primary: String,
    pub quarantine: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            primary: DEFAULT_STORAGE_KEY.to_string(),
            quarantine: DEFAULT_ERROR_STORAGE_KEY.to_string(),
        }
    }
}

/// Why saved data could not be used, with the raw payload for bug reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub payload: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl Diagnostic {
    fn new(message: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            message: message.into(),
            payload,
            detected_at: Utc::now(),
        }
    }
}

pub struct Engine<S: KeyValueStore> {
    collection: SnippetCollection,
    store: S,
    keys: StorageKeys,
    loaded: bool,
    assembly: Assembly,
    diagnostic: Option<Diagnostic>,
    max_import_depth: usize,
}

impl<S: KeyValueStore> Engine<S> {
    /// An empty engine that has not loaded anything yet and will not persist until it does.
    pub fn new(store: S, keys: StorageKeys) -> Self {
        Self {
            collection: SnippetCollection::new(),
            store,
            keys,
            loaded: false,
            assembly: Assembly::default(),
            diagnostic: None,
            max_import_depth: crate::remote::resolver::DEFAULT_MAX_IMPORT_DEPTH,
        }
    }

    /// Creates an engine and loads the persisted snapshot.
    pub fn open(store: S, keys: StorageKeys) -> Result<Self> {
        let mut engine = Self::new(store, keys);
        engine.load()?;
        Ok(engine)
    }

    pub fn with_max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = depth;
        self
    }

    /// Restores state from the primary key. A payload that fails to decode,
    /// validate or pass the integrity check is quarantined and the engine
    /// continues empty.
    pub fn load(&mut self) -> Result<()> {
        match self.store.get(&self.keys.primary)? {
            Some(raw) => {
                let restored = Snapshot::decode(&raw)
                    .map_err(EngineError::from)
                    .and_then(Snapshot::into_collection);
                match restored {
                    Ok(collection) => {
                        info!(snippets = collection.len(), "restored snippets");
                        self.collection = collection;
                    }
                    Err(err) => self.quarantine(raw, &err)?,
                }
            }
            None => {
                if let Some(payload) = self.store.get(&self.keys.quarantine)? {
                    self.diagnostic = Some(Diagnostic::new(
                        "Saved data from an earlier session could not be restored",
                        Some(payload),
                    ));
                }
            }
        }
        self.loaded = true;
        self.recompute()
    }

    fn quarantine(&mut self, raw: String, err: &EngineError) -> Result<()> {
        error!(error = %err, "saved snippets could not be restored, quarantining payload");
        self.store.set(&self.keys.quarantine, &raw)?;
        self.store.remove(&self.keys.primary)?;
        self.collection.clear();
        self.diagnostic = Some(Diagnostic::new(
            format!("Saved data could not be restored: {}", err),
            Some(raw),
        ));
        Ok(())
    }

    /// Recomputes derived state and persists it. Calling it twice on the same
    /// state yields the same output and snapshot.
    pub fn recompute(&mut self) -> Result<()> {
        self.collection.backfill_values();
        if let Err(err) = self.check_integrity() {
            self.reset_corrupted(err)?;
        }
        self.assembly = assemble(&self.collection);
        if self.loaded {
            self.persist()?;
        }
        Ok(())
    }

    fn check_integrity(&self) -> Result<(), IntegrityError> {
        let links = self.collection.links();
        let consistent = self.collection.len() == links.len()
            && self.collection.iter().all(|(id, _)| links.contains(id));
        if consistent {
            Ok(())
        } else {
            Err(IntegrityError {
                snippets: self.collection.len(),
                link_keys: links.len(),
            })
        }
    }

    fn reset_corrupted(&mut self, err: IntegrityError) -> Result<()> {
        error!(error = %err, "snippet state is corrupted, resetting");
        let payload = self.store.get(&self.keys.primary)?;
        if let Some(raw) = &payload {
            self.store.set(&self.keys.quarantine, raw)?;
        }
        self.collection.clear();
        self.diagnostic = Some(Diagnostic::new(
            format!(
                "Something went wrong with your saved data ({}); it could not be restored",
                err
            ),
            payload,
        ));
        Ok(())
    }

    /// Writes the current snapshot to the primary key.
    pub fn persist(&mut self) -> Result<()> {
        let encoded = self.snapshot().encode()?;
        self.store.set(&self.keys.primary, &encoded)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_collection(&self.collection)
    }

    pub fn collection(&self) -> &SnippetCollection {
        &self.collection
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    /// The generated code.
    pub fn output(&self) -> &str {
        &self.assembly.output
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.assembly.errors
    }

    pub fn has_errors(&self) -> bool {
        self.assembly.has_errors()
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    /// Forgets the current diagnostic and the quarantined payload.
    pub fn clear_diagnostic(&mut self) -> Result<()> {
        self.store.remove(&self.keys.quarantine)?;
        self.diagnostic = None;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    fn apply<T>(&mut self, op: impl FnOnce(&mut SnippetCollection) -> Result<T>) -> Result<T> {
        let out = op(&mut self.collection)?;
        self.recompute()?;
        Ok(out)
    }

    /// Adds a snippet and returns its final name. New names may not carry a
    /// `(N)` suffix; overwriting an existing suffixed snippet is allowed.
    pub fn add(&mut self, snippet: Snippet, mode: OverrideMode) -> Result<String> {
        let replaces =
            mode == OverrideMode::Overwrite && self.collection.id_of(&snippet.name).is_some();
        if !replaces && !is_valid_name(&snippet.name) {
            return Err(EngineError::InvalidName(snippet.name));
        }
        self.apply(|c| {
            let id = c.add(snippet, mode)?;
            Ok(c.by_id(id).map(|s| s.name.clone()).unwrap_or_default())
        })
    }

    /// Removes a snippet and everything cascading from it.
    pub fn remove(&mut self, name: &str) -> Result<Vec<String>> {
        self.apply(|c| c.remove(name))
    }

    pub fn move_up(&mut self, name: &str, count: usize) -> Result<bool> {
        self.apply(|c| c.move_up(name, count))
    }

    pub fn move_down(&mut self, name: &str, count: usize) -> Result<bool> {
        self.apply(|c| c.move_down(name, count))
    }

    pub fn link(&mut self, source: &str, target: &str, link_type: LinkType) -> Result<()> {
        self.apply(|c| c.link(source, target, link_type))
    }

    pub fn edit_code(&mut self, name: &str, code: impl Into<String>) -> Result<()> {
        self.apply(|c| c.edit_code(name, code))
    }

    pub fn edit_error_code(&mut self, name: &str, error_code: Option<String>) -> Result<()> {
        self.apply(|c| c.edit_error_code(name, error_code))
    }

    pub fn set_readonly(&mut self, name: &str, readonly: bool) -> Result<()> {
        self.apply(|c| c.set_readonly(name, readonly))
    }

    pub fn add_placeholder(&mut self, name: &str, placeholder: Placeholder) -> Result<()> {
        self.apply(|c| c.add_placeholder(name, placeholder))
    }

    pub fn remove_placeholder(&mut self, name: &str, placeholder: &str) -> Result<()> {
        self.apply(|c| c.remove_placeholder(name, placeholder))
    }

    pub fn edit_placeholder_pattern(
        &mut self,
        name: &str,
        placeholder: &str,
        pattern: Option<String>,
    ) -> Result<()> {
        self.apply(|c| c.edit_placeholder_pattern(name, placeholder, pattern))
    }

    pub fn edit_placeholder_default(
        &mut self,
        name: &str,
        placeholder: &str,
        default: Option<String>,
    ) -> Result<()> {
        self.apply(|c| c.edit_placeholder_default(name, placeholder, default))
    }

    pub fn set_value(
        &mut self,
        name: &str,
        placeholder: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        self.apply(|c| c.set_value(name, placeholder, value))
    }

    /// Adds a snippet after fetching and inserting everything it imports.
    /// Nothing is inserted if any fetch fails or `cancel` fires.
    pub async fn add_with_imports(
        &mut self,
        snippet: Snippet,
        source: &dyn SnippetSource,
        cancel: CancellationToken,
    ) -> Result<String> {
        let resolver =
            ImportResolver::new(source, cancel).with_max_depth(self.max_import_depth);
        let plan = resolver.resolve(snippet).await?;
        let name = plan.commit(&mut self.collection)?;
        self.recompute()?;
        Ok(name)
    }

    /// Fetches a snippet definition from `uri` and adds it with its imports.
    pub async fn load_from_web(
        &mut self,
        uri: &str,
        source: &dyn SnippetSource,
        cancel: CancellationToken,
    ) -> Result<String> {
        let resolver = ImportResolver::new(source, cancel.clone())
            .with_max_depth(self.max_import_depth);
        let snippet = match resolver.fetch_root(uri).await {
            Ok(snippet) => snippet,
            Err(err) => {
                warn!(uri, error = %err, "could not load snippet");
                return Err(err.into());
            }
        };
        self.add_with_imports(snippet, source, cancel).await
    }
}
