/// Cycle analysis over a single graph
///
/// Pure functions: acyclicity test, topological ordering with successor
/// lists, ancestor-restricted ordering and a heuristic cycle breaker.
/// Self-loops are feedback edges and never count as cycles here.

use crate::error::{ForestError, ForestResult};
use crate::workflow::forest::Graph;
use crate::workflow::types::Edge;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// One step of a topological order: a node and its direct successors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEntry {
    pub node: String,
    pub successors: Vec<String>,
}

/// Topological order of a DAG with each node's successor list
///
/// Empty when the graph it was computed from has a cycle; callers treat that
/// as "not executable yet", not as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopologicalOrder {
    entries: Vec<OrderEntry>,
}

impl TopologicalOrder {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nodes in execution order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.node.as_str())
    }

    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    /// Direct successors of `node`, empty if the node is not part of the order
    pub fn successors(&self, node: &str) -> &[String] {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .map(|e| e.successors.as_slice())
            .unwrap_or(&[])
    }

    /// Position of `node` in the order
    pub fn position(&self, node: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.node == node)
    }
}

/// Kahn's algorithm; `None` when a cycle prevents a full ordering
fn kahn_order(graph: &Graph) -> Option<Vec<&str>> {
    let mut in_degree: BTreeMap<&str, usize> = graph.nodes().map(|n| (n, 0)).collect();
    for edge in graph.edges().filter(|e| !e.is_self_loop()) {
        *in_degree.entry(edge.dst.as_str()).or_default() += 1;
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|&(_, degree)| *degree == 0)
        .map(|(&node, _)| node)
        .collect();

    let mut sorted = Vec::with_capacity(graph.node_count());
    while let Some(node) = queue.pop_front() {
        sorted.push(node);
        for next in graph.successors(node) {
            if next == node {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    (sorted.len() == graph.node_count()).then_some(sorted)
}

pub fn is_acyclic(graph: &Graph) -> bool {
    kahn_order(graph).is_some()
}

/// Topological order of `graph` with raw successor lists
///
/// Returns an empty order for cyclic graphs.
pub fn topological_order(graph: &Graph) -> TopologicalOrder {
    let Some(sorted) = kahn_order(graph) else {
        tracing::debug!("🔁 Graph has cycles, no topological order");
        return TopologicalOrder::default();
    };
    TopologicalOrder {
        entries: sorted
            .into_iter()
            .map(|node| OrderEntry {
                node: node.to_string(),
                successors: graph.successors(node).into_iter().map(str::to_string).collect(),
            })
            .collect(),
    }
}

/// `target` and every node that can reach it
pub fn ancestors_of(graph: &Graph, target: &str) -> ForestResult<BTreeSet<String>> {
    if !graph.contains_node(target) {
        return Err(ForestError::NodeNotFound(target.to_string()));
    }
    let mut seen = BTreeSet::from([target.to_string()]);
    let mut queue = VecDeque::from([target]);
    while let Some(current) = queue.pop_front() {
        for prev in graph.predecessors(current) {
            if seen.insert(prev.to_string()) {
                queue.push_back(prev);
            }
        }
    }
    Ok(seen)
}

/// Topological order of the subgraph induced by `target` and its ancestors
pub fn order_up_to_node(graph: &Graph, target: &str) -> ForestResult<TopologicalOrder> {
    let keep = ancestors_of(graph, target)?;
    Ok(topological_order(&graph.induced(&keep)))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Any one cycle of `graph` as its sequence of edges
pub fn find_cycle(graph: &Graph) -> Option<Vec<Edge>> {
    let mut state: BTreeMap<&str, Visit> = BTreeMap::new();
    let mut path: Vec<&str> = Vec::new();
    for start in graph.nodes() {
        if state.contains_key(start) {
            continue;
        }
        if let Some(cycle) = visit(graph, start, &mut state, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'g>(
    graph: &'g Graph,
    node: &'g str,
    state: &mut BTreeMap<&'g str, Visit>,
    path: &mut Vec<&'g str>,
) -> Option<Vec<Edge>> {
    state.insert(node, Visit::Active);
    path.push(node);
    for next in graph.successors(node) {
        if next == node {
            continue;
        }
        match state.get(next).copied() {
            Some(Visit::Active) => {
                let start = path.iter().position(|&n| n == next)?;
                let mut cycle: Vec<Edge> = path[start..]
                    .windows(2)
                    .map(|pair| Edge::new(pair[0], pair[1]))
                    .collect();
                cycle.push(Edge::new(node, next));
                return Some(cycle);
            }
            Some(Visit::Done) => {}
            None => {
                if let Some(cycle) = visit(graph, next, state, path) {
                    return Some(cycle);
                }
            }
        }
    }
    path.pop();
    state.insert(node, Visit::Done);
    None
}

/// Edges whose removal makes `graph` acyclic, picked at random from each cycle
///
/// Works on a private copy. Not a minimum feedback edge set.
pub fn edges_causing_cycles(graph: &Graph) -> Vec<Edge> {
    edges_causing_cycles_with(graph, &mut rand::thread_rng())
}

/// Same as [`edges_causing_cycles`] with a caller-supplied RNG
pub fn edges_causing_cycles_with<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Vec<Edge> {
    let mut copy = graph.clone();
    let mut removed = Vec::new();
    while let Some(cycle) = find_cycle(&copy) {
        let Some(edge) = cycle.choose(rng).cloned() else {
            break;
        };
        copy.edges.remove(&edge);
        tracing::debug!("✂️ Breaking cycle at {}", edge);
        removed.push(edge);
    }
    removed
}
