//! snix-compose - composes code snippets into one generated file.
//!
//! Snippets carry placeholders that are filled in and validated, may depend on
//! each other through typed links, and can import further snippets from
//! remote repositories. The [`Engine`] owns the collection and recomputes the
//! generated output and validation errors after every mutation.

pub mod assembly;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod remote;

pub use assembly::{Assembly, assemble};
pub use config::Config;
pub use engine::{Diagnostic, Engine, StorageKeys};
pub use error::{EngineError, FetchError, IntegrityError, Result, SchemaError, ValidationError};
pub use models::{
    FileStore, KeyValueStore, Link, LinkType, MemoryStore, OverrideMode, Placeholder, Snippet,
    SnippetCollection, SnippetId,
};
