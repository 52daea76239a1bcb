//! Pulling snippet definitions and repo manifests from URIs.

pub mod repo;
pub mod resolver;
pub mod source;

pub use repo::{
    RepoReport, RepoStatus, SnippetCategory, SnippetLink, SnippetRepo, categories, check_repos,
    fetch_repo, short_repo_name,
};
pub use resolver::{ImportPlan, ImportResolver};
pub use source::{SnippetSource, WebSource, fetch_snippet};
