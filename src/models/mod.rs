pub mod collection;
pub mod links;
pub mod snippet;
pub mod storage;
pub mod template;
pub mod values;

pub use collection::SnippetCollection;
pub use links::{Link, LinkGraph, MoveBounds};
pub use snippet::{
    DEFAULT_PLACEHOLDER_PATTERN, LinkType, OverrideMode, Placeholder, Requirement, Snippet,
    SnippetId, SnippetImport,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Snapshot};
pub use values::PlaceholderValues;
