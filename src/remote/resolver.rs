//! Import resolution.
//!
//! Resolution runs in two phases. The fetch phase walks the import tree one
//! fetch at a time and builds an [`ImportPlan`] without touching the
//! collection. The commit phase inserts the plan bottom-up in one synchronous
//! step, so a failed or cancelled fetch never leaves half-linked snippets.

use crate::error::{FetchError, Result, SchemaError};
use crate::models::{Link, LinkType, OverrideMode, Snippet, SnippetCollection, SnippetId};
use crate::remote::source::{SnippetSource, fetch_snippet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 16;

#[derive(Debug, Clone)]
struct PlanNode {
    snippet: Snippet,
    mode: OverrideMode,
    imports: Vec<(usize, LinkType)>,
}

/// A fully fetched import tree, ready to be inserted.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    nodes: Vec<PlanNode>,
}

impl ImportPlan {
    /// Number of snippets the plan inserts, the importing snippet included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The importing snippet.
    pub fn root(&self) -> Option<&Snippet> {
        self.nodes.first().map(|n| &n.snippet)
    }

    /// Inserts every imported snippet before its importer and links the importer
    /// to each import's final name. Returns the root's final name.
    ///
    /// Either the whole plan is inserted or, on error, the collection is left untouched.
    pub fn commit(self, collection: &mut SnippetCollection) -> Result<String> {
        let mut staged = collection.clone();
        let mut nodes: Vec<Option<PlanNode>> = self.nodes.into_iter().map(Some).collect();
        let root = insert_node(&mut nodes, 0, &mut staged)?;
        let name = staged
            .by_id(root)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        *collection = staged;
        Ok(name)
    }
}

fn insert_node(
    nodes: &mut [Option<PlanNode>],
    index: usize,
    collection: &mut SnippetCollection,
) -> Result<SnippetId> {
    let Some(node) = nodes.get_mut(index).and_then(Option::take) else {
        let issue = format!("import plan references node {} twice", index);
        return Err(SchemaError::Invalid(vec![issue]).into());
    };

    let mut links = Vec::with_capacity(node.imports.len());
    for (child, link_type) in &node.imports {
        let child_id = insert_node(nodes, *child, collection)?;
        links.push(Link::new(child_id, *link_type));
    }
    let id = collection.add_with_links(node.snippet, node.mode, links)?;
    if let Some(s) = collection.by_id(id) {
        debug!(name = %s.name, "committed import");
    }
    Ok(id)
}

/// Fetches a snippet's import tree sequentially, bound to a cancellation token.
pub struct ImportResolver<'a> {
    source: &'a dyn SnippetSource,
    cancel: CancellationToken,
    max_depth: usize,
}

impl<'a> ImportResolver<'a> {
    pub fn new(source: &'a dyn SnippetSource, cancel: CancellationToken) -> Self {
        Self {
            source,
            cancel,
            max_depth: DEFAULT_MAX_IMPORT_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fetches a top-level snippet definition, honouring cancellation.
    pub async fn fetch_root(&self, uri: &str) -> Result<Snippet, FetchError> {
        self.fetch(uri).await
    }

    /// Builds the plan for inserting `root` along with everything it imports.
    pub async fn resolve(&self, mut root: Snippet) -> Result<ImportPlan, FetchError> {
        let root_imports = root.imports.take().unwrap_or_default();
        let mode = root.override_mode.unwrap_or_default();
        let mut nodes = vec![PlanNode {
            snippet: root,
            mode,
            imports: Vec::new(),
        }];
        let mut pending = vec![(0usize, 0usize, root_imports)];

        while let Some((parent, depth, imports)) = pending.pop() {
            if imports.is_empty() {
                continue;
            }
            if depth >= self.max_depth {
                return Err(FetchError::TooDeep(self.max_depth));
            }

            let mut children = Vec::with_capacity(imports.len());
            for import in imports {
                let mut snippet = self.fetch(&import.link).await?;
                let nested = snippet.imports.take().unwrap_or_default();
                let mode = import
                    .override_mode
                    .or(snippet.override_mode)
                    .unwrap_or_default();

                let index = nodes.len();
                nodes.push(PlanNode {
                    snippet,
                    mode,
                    imports: Vec::new(),
                });
                nodes[parent].imports.push((index, import.link_type));
                children.push((index, depth + 1, nested));
            }
            // earlier imports are descended into first
            pending.extend(children.into_iter().rev());
        }

        info!(snippets = nodes.len(), "import tree resolved");
        Ok(ImportPlan { nodes })
    }

    async fn fetch(&self, uri: &str) -> Result<Snippet, FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            res = fetch_snippet(self.source, uri) => res,
        }
    }
}
