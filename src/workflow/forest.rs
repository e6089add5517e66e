/// Dynamic graph forest
///
/// Keeps the workflow's connectivity correct while it is being edited. The
/// forest owns a list of pairwise node-disjoint directed graphs, and every
/// graph is weakly connected: adding an edge between two graphs merges them,
/// removing the last link between two halves splits them.
///
/// All operations are synchronous and atomic. The forest does no locking of
/// its own; callers that share it across tasks wrap it themselves (see
/// `ForestRegistry`).

use crate::error::{ForestError, ForestResult};
use crate::workflow::types::{Edge, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A directed graph over named nodes
///
/// Invariant: every edge's endpoints are members of `nodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub(crate) nodes: BTreeSet<String>,
    pub(crate) edges: BTreeSet<Edge>,
}

impl Graph {
    /// Graph holding a single node and no edges
    pub fn singleton(node: impl Into<String>) -> Self {
        let mut nodes = BTreeSet::new();
        nodes.insert(node.into());
        Self {
            nodes,
            edges: BTreeSet::new(),
        }
    }

    /// Build a graph from explicit parts, checking that every edge endpoint exists
    pub fn from_parts<N, E>(nodes: N, edges: E) -> ForestResult<Self>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        E: IntoIterator<Item = Edge>,
    {
        let nodes: BTreeSet<String> = nodes.into_iter().map(Into::into).collect();
        let mut graph = Self {
            nodes,
            edges: BTreeSet::new(),
        };
        for edge in edges {
            for end in [&edge.src, &edge.dst] {
                if !graph.nodes.contains(end) {
                    return Err(ForestError::NodeNotFound(end.clone()));
                }
            }
            graph.edges.insert(edge);
        }
        Ok(graph)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn contains_edge(&self, src: &str, dst: &str) -> bool {
        self.edges.iter().any(|e| e.src == src && e.dst == dst)
    }

    /// Raw outgoing neighbours of `node`, self-loop included
    pub fn successors(&self, node: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.src == node)
            .map(|e| e.dst.as_str())
            .collect()
    }

    /// Raw incoming neighbours of `node`, self-loop included
    pub fn predecessors(&self, node: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.dst == node)
            .map(|e| e.src.as_str())
            .collect()
    }

    /// Whether `node` has no neighbours
    ///
    /// With `self_loop_isolates` a node whose only edge is its own self-loop
    /// counts as isolated; without it, the self-loop is a connection.
    pub fn is_isolated(&self, node: &str, self_loop_isolates: bool) -> bool {
        !self
            .edges
            .iter()
            .filter(|e| e.touches(node))
            .any(|e| !(self_loop_isolates && e.is_self_loop()))
    }

    /// Subgraph induced by `keep`: its nodes plus every edge with both ends inside
    pub fn induced(&self, keep: &BTreeSet<String>) -> Graph {
        Graph {
            nodes: self.nodes.intersection(keep).cloned().collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| keep.contains(&e.src) && keep.contains(&e.dst))
                .cloned()
                .collect(),
        }
    }

    /// Weakly connected components, edge direction ignored
    pub fn weak_components(&self) -> Vec<BTreeSet<String>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> =
            self.nodes.iter().map(|n| (n.as_str(), Vec::new())).collect();
        for edge in self.edges.iter().filter(|e| !e.is_self_loop()) {
            adjacency.entry(edge.src.as_str()).or_default().push(edge.dst.as_str());
            adjacency.entry(edge.dst.as_str()).or_default().push(edge.src.as_str());
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut components = Vec::new();
        for start in self.nodes.iter().map(String::as_str) {
            if !seen.insert(start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                component.insert(current.to_string());
                for &next in adjacency.get(current).into_iter().flatten() {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    fn rename(&mut self, old: &str, new: &str) {
        self.nodes.remove(old);
        self.nodes.insert(new.to_string());
        let relabel = |name: &String| {
            if name == old {
                new.to_string()
            } else {
                name.clone()
            }
        };
        self.edges = self
            .edges
            .iter()
            .map(|e| Edge::new(relabel(&e.src), relabel(&e.dst)))
            .collect();
    }
}

/// Ordered collection of pairwise node-disjoint graphs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphForest {
    graphs: Vec<Graph>,
}

impl GraphForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest from a workflow definition
    ///
    /// Every item becomes a singleton graph, then each connection is added in
    /// order so merges happen exactly as they would during interactive editing.
    pub fn from_workflow(workflow: &Workflow) -> ForestResult<Self> {
        let mut forest = Self::new();
        for item in &workflow.items {
            forest.add_singleton_graph(item)?;
        }
        for edge in &workflow.connections {
            forest.add_edge(&edge.src, &edge.dst)?;
        }
        tracing::debug!(
            "🌲 Built forest for workflow '{}': {} items in {} graphs",
            workflow.id,
            forest.node_count(),
            forest.len()
        );
        Ok(forest)
    }

    /// Flatten the forest back into a workflow definition
    pub fn to_workflow(&self, id: impl Into<String>, name: impl Into<String>) -> Workflow {
        Workflow {
            id: id.into(),
            name: name.into(),
            items: self
                .graphs
                .iter()
                .flat_map(|g| g.nodes.iter().cloned())
                .collect(),
            connections: self
                .graphs
                .iter()
                .flat_map(|g| g.edges.iter().cloned())
                .collect(),
        }
    }

    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }

    /// Number of graphs in the forest
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.graphs.iter().map(Graph::node_count).sum()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.graphs.iter().any(|g| g.contains_node(node))
    }

    /// Position of the graph that holds `node`
    pub fn graph_index_of(&self, node: &str) -> ForestResult<usize> {
        self.graphs
            .iter()
            .position(|g| g.contains_node(node))
            .ok_or_else(|| ForestError::NodeNotFound(node.to_string()))
    }

    pub fn graph_containing(&self, node: &str) -> ForestResult<&Graph> {
        self.graph_index_of(node).map(|idx| &self.graphs[idx])
    }

    pub fn graph_containing_edge(&self, src: &str, dst: &str) -> ForestResult<&Graph> {
        self.edge_graph_index(src, dst).map(|idx| &self.graphs[idx])
    }

    fn edge_graph_index(&self, src: &str, dst: &str) -> ForestResult<usize> {
        self.graphs
            .iter()
            .position(|g| g.contains_edge(src, dst))
            .ok_or_else(|| ForestError::GraphNotFound {
                src: src.to_string(),
                dst: dst.to_string(),
            })
    }

    /// Add a brand new node as its own graph
    pub fn add_singleton_graph(&mut self, node: &str) -> ForestResult<()> {
        if self.contains(node) {
            return Err(ForestError::DuplicateName(node.to_string()));
        }
        self.graphs.push(Graph::singleton(node));
        tracing::debug!("➕ Added singleton graph '{}'", node);
        Ok(())
    }

    /// Connect `src` to `dst`, merging their graphs when they differ
    pub fn add_edge(&mut self, src: &str, dst: &str) -> ForestResult<()> {
        let src_idx = self.graph_index_of(src)?;
        let dst_idx = self.graph_index_of(dst)?;
        let edge = Edge::new(src, dst);

        if src_idx == dst_idx {
            self.graphs[src_idx].edges.insert(edge);
            tracing::debug!("🔗 Added edge {} -> {} within one graph", src, dst);
            return Ok(());
        }

        // Remove the later index first so the earlier one stays valid.
        let (first, second) = if src_idx > dst_idx {
            (src_idx, dst_idx)
        } else {
            (dst_idx, src_idx)
        };
        let a = self.graphs.remove(first);
        let b = self.graphs.remove(second);

        let mut merged = Graph {
            nodes: a.nodes.union(&b.nodes).cloned().collect(),
            edges: a.edges.union(&b.edges).cloned().collect(),
        };
        merged.edges.insert(edge);
        tracing::info!(
            "🔀 Merged graphs via {} -> {} ({} nodes)",
            src,
            dst,
            merged.node_count()
        );
        self.graphs.push(merged);
        Ok(())
    }

    /// Remove an edge, splitting its graph in two when it was the only link
    pub fn remove_edge(&mut self, src: &str, dst: &str) -> ForestResult<()> {
        let idx = self.edge_graph_index(src, dst)?;
        let edge = Edge::new(src, dst);
        self.graphs[idx].edges.remove(&edge);

        if edge.is_self_loop() {
            tracing::debug!("➖ Removed self-loop on '{}'", src);
            return Ok(());
        }

        let components = self.graphs[idx].weak_components();
        match components.len() {
            0 | 1 => {
                tracing::debug!("➖ Removed edge {} -> {}; graph still connected", src, dst);
                Ok(())
            }
            2 => {
                let old = self.graphs.remove(idx);
                for component in &components {
                    self.graphs.push(old.induced(component));
                }
                tracing::info!(
                    "✂️ Split graph on removal of {} -> {} into {} + {} nodes",
                    src,
                    dst,
                    components[0].len(),
                    components[1].len()
                );
                Ok(())
            }
            n => {
                self.graphs[idx].edges.insert(edge);
                Err(ForestError::Invariant(format!(
                    "removing {} -> {} produced {} components",
                    src, dst, n
                )))
            }
        }
    }

    /// Remove a node and every edge touching it
    ///
    /// The remainder of its graph is re-partitioned into weakly connected
    /// components: nodes left isolated become singletons (keeping their
    /// self-loops), and the graph vanishes if nothing is left.
    ///
    /// This goes further than only pulling out newly isolated nodes: removing
    /// the middle of a chain leaves two graphs, not one disconnected graph.
    /// Every graph therefore stays weakly connected, which is what lets
    /// `remove_edge` assume a split yields exactly two pieces.
    pub fn remove_node(&mut self, node: &str) -> ForestResult<()> {
        let idx = self.graph_index_of(node)?;
        let graph = &mut self.graphs[idx];
        graph.edges.retain(|e| !e.touches(node));
        graph.nodes.remove(node);

        if graph.is_empty() {
            self.graphs.remove(idx);
            tracing::debug!("🗑️ Removed node '{}' and its now empty graph", node);
            return Ok(());
        }

        let components = graph.weak_components();
        if components.len() == 1 {
            tracing::debug!("🗑️ Removed node '{}'", node);
            return Ok(());
        }

        let old = self.graphs.remove(idx);
        let keep_in_place = components.iter().position(|c| c.len() > 1).unwrap_or(0);
        self.graphs.insert(idx, old.induced(&components[keep_in_place]));
        for (i, component) in components.iter().enumerate() {
            if i != keep_in_place {
                self.graphs.push(old.induced(component));
            }
        }
        tracing::info!(
            "🗑️ Removed node '{}'; remainder split into {} graphs",
            node,
            components.len()
        );
        Ok(())
    }

    /// Relabel a node in place, edges included
    pub fn rename_node(&mut self, old: &str, new: &str) -> ForestResult<()> {
        let idx = self.graph_index_of(old)?;
        if self.contains(new) {
            return Err(ForestError::DuplicateName(new.to_string()));
        }
        self.graphs[idx].rename(old, new);
        tracing::debug!("✏️ Renamed node '{}' to '{}'", old, new);
        Ok(())
    }

    /// Whether `node` is linked to anything
    ///
    /// A lone self-loop counts as a connection unless `self_loop_isolates` is set.
    pub fn has_connections(&self, node: &str, self_loop_isolates: bool) -> ForestResult<bool> {
        let graph = self.graph_containing(node)?;
        Ok(!graph.is_isolated(node, self_loop_isolates))
    }
}
