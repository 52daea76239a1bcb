use crate::error::FetchError;
use crate::remote::source::{SnippetSource, reject_error_document, schema_error};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

static REPO_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:(?:[a-z0-9]*?:/{2,})?(?:[a-z0-9]+?\.[a-z0-9]+?)/(.*?)?)|(?:(?:\.|/){1,2}(?:.*?/)+(.*?)))\.repo\.json$",
    )
    .expect("static regex")
});

/// One importable snippet listed by a repo manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetLink {
    #[serde(rename = "repoID")]
    pub repo_id: String,
    pub name: String,
    pub link: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetRepo {
    #[serde(rename = "repoID")]
    pub repo_id: String,
    pub snippet_links: Vec<SnippetLink>,
    /// Where the manifest was fetched from.
    #[serde(skip)]
    pub repo_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetCategory {
    pub name: String,
    pub links: Vec<SnippetLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoStatus {
    Up { snippet_count: usize },
    Down { message: String },
}

#[derive(Debug, Clone)]
pub struct RepoReport {
    pub url: String,
    pub repo: Option<SnippetRepo>,
    pub status: RepoStatus,
}

impl RepoReport {
    /// The manifest's `repoID` when it was fetched, otherwise a short name taken from the URL.
    pub fn display_name(&self) -> String {
        match &self.repo {
            Some(repo) => repo.repo_id.clone(),
            None => short_repo_name(&self.url),
        }
    }
}

pub async fn fetch_repo(source: &dyn SnippetSource, uri: &str) -> Result<SnippetRepo, FetchError> {
    let value = reject_error_document(uri, source.fetch_json(uri).await?)?;
    let mut repo: SnippetRepo =
        serde_json::from_value(value).map_err(|e| schema_error(uri, e.into()))?;
    repo.repo_url = uri.to_string();
    Ok(repo)
}

/// Fetches every manifest. Manifests don't touch the collection, so they load concurrently.
pub async fn check_repos(source: &dyn SnippetSource, urls: &[String]) -> Vec<RepoReport> {
    let fetches = urls.iter().map(|url| async move {
        match fetch_repo(source, url).await {
            Ok(repo) => RepoReport {
                url: url.clone(),
                status: RepoStatus::Up {
                    snippet_count: repo.snippet_links.len(),
                },
                repo: Some(repo),
            },
            Err(error) => {
                warn!(url = %url, %error, "repo is down");
                RepoReport {
                    url: url.clone(),
                    repo: None,
                    status: RepoStatus::Down {
                        message: error.to_string(),
                    },
                }
            }
        }
    });
    join_all(fetches).await
}

/// Groups snippet links across repos by category, in first-seen order.
pub fn categories(repos: &[SnippetRepo]) -> Vec<SnippetCategory> {
    let mut out: Vec<SnippetCategory> = Vec::new();
    for link in repos.iter().flat_map(|r| r.snippet_links.iter()) {
        match out.iter_mut().find(|c| c.name == link.category) {
            Some(category) => category.links.push(link.clone()),
            None => out.push(SnippetCategory {
                name: link.category.clone(),
                links: vec![link.clone()],
            }),
        }
    }
    out
}

/// `https://host/dir/main.repo.json` becomes `dir/main`, `./master.repo.json` becomes `master`.
pub fn short_repo_name(url: &str) -> String {
    match REPO_URI_RE.captures(url) {
        Some(caps) => {
            let first = caps.get(1).map_or("", |m| m.as_str());
            let second = caps.get(2).map_or("", |m| m.as_str());
            format!("{}{}", first, second)
        }
        None => url.to_string(),
    }
}
