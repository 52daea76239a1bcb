//! Directed, typed relations between snippets.
//!
//! Every snippet owns one list of outgoing edges. The graph answers two
//! questions for the collection: which snippets go away together when one is
//! removed, and how far a snippet may travel when it is reordered.

use crate::models::snippet::{LinkType, SnippetId};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub target: SnippetId,
    pub link_type: LinkType,
}

impl Link {
    pub fn new(target: SnippetId, link_type: LinkType) -> Self {
        Self { target, link_type }
    }
}

/// Index range a snippet may move within without crossing a linked neighbour.
///
/// `above` is the position of the nearest barrier before the snippet, `below`
/// the position of the nearest barrier after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveBounds {
    pub above: Option<usize>,
    pub below: Option<usize>,
}

impl MoveBounds {
    pub fn allows(&self, target: usize) -> bool {
        let past_above = self.above.is_none_or(|a| target > a);
        let before_below = self.below.is_none_or(|b| target < b);
        past_above && before_below
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    edges: HashMap<SnippetId, Vec<Link>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a snippet with an empty edge list unless it already has one.
    pub fn insert_node(&mut self, id: SnippetId) {
        self.edges.entry(id).or_default();
    }

    pub fn set_links(&mut self, source: SnippetId, links: Vec<Link>) {
        self.edges.insert(source, links);
    }

    pub fn add_link(&mut self, source: SnippetId, target: SnippetId, link_type: LinkType) {
        self.edges
            .entry(source)
            .or_default()
            .push(Link::new(target, link_type));
    }

    pub fn outgoing(&self, id: SnippetId) -> &[Link] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: SnippetId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Number of edge lists, which is one per known snippet when consistent.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Drops the node's edge list and every edge pointing at it.
    pub fn remove_node(&mut self, id: SnippetId) {
        self.edges.remove(&id);
        for links in self.edges.values_mut() {
            links.retain(|l| l.target != id);
        }
    }

    /// Snippets that must be removed together with `root`, `root` first.
    ///
    /// A snippet whose edge to a removed one is `dependson` or `both` goes with
    /// it, as does every target of a removed snippet's `both` or `isdependent`
    /// edges. The rule is applied transitively; each snippet is visited once,
    /// so cycles terminate.
    pub fn cascade(&self, root: SnippetId) -> Vec<SnippetId> {
        let mut visited = HashSet::from([root]);
        let mut order = vec![root];
        let mut queue = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            for next in self.cascade_neighbours(current) {
                if visited.insert(next) {
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }
        order
    }

    fn cascade_neighbours(&self, id: SnippetId) -> Vec<SnippetId> {
        let dependents = self.edges.iter().filter_map(|(source, links)| {
            let depends = links.iter().any(|l| {
                l.target == id && matches!(l.link_type, LinkType::DependsOn | LinkType::Both)
            });
            (*source != id && depends).then_some(*source)
        });
        let required_by = self
            .outgoing(id)
            .iter()
            .filter(|l| matches!(l.link_type, LinkType::Both | LinkType::IsDependent))
            .map(|l| l.target);

        let mut out: Vec<SnippetId> = dependents.chain(required_by).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Every snippet linked to `id` by an order-constraining edge, in either direction.
    pub fn barriers(&self, id: SnippetId) -> HashSet<SnippetId> {
        let outgoing = self
            .outgoing(id)
            .iter()
            .filter(|l| l.link_type.constrains_order())
            .map(|l| l.target);
        let incoming = self.edges.iter().filter_map(|(source, links)| {
            let linked = links
                .iter()
                .any(|l| l.target == id && l.link_type.constrains_order());
            linked.then_some(*source)
        });
        outgoing.chain(incoming).filter(|n| *n != id).collect()
    }

    /// Bounds for moving `id`, currently at `current`, given each snippet's
    /// position in the collection order.
    pub fn move_bounds(
        &self,
        id: SnippetId,
        current: usize,
        position: impl Fn(SnippetId) -> Option<usize>,
    ) -> MoveBounds {
        let positions: Vec<usize> = self.barriers(id).into_iter().filter_map(position).collect();
        MoveBounds {
            above: positions.iter().copied().filter(|p| *p < current).max(),
            below: positions.iter().copied().filter(|p| *p > current).min(),
        }
    }
}
