/// Execution engine
///
/// Glue between the forest and the coordinator: finds the graph to run,
/// refuses graphs that are not DAGs, builds a coordinator over the
/// topological order and drives it. Independent graphs share no nodes or
/// resources, so each one gets its own coordinator and they may run
/// concurrently.

use crate::error::{ForestError, ForestResult};
use crate::runtime::coordinator::{ExecutionCoordinator, RunReport};
use crate::runtime::item::Item;
use crate::runtime::resources::ResourceTable;
use crate::workflow::cycles::{edges_causing_cycles, is_acyclic, order_up_to_node, topological_order};
use crate::workflow::forest::{Graph, GraphForest};
use std::{collections::HashMap, sync::Arc};
use tokio::task::JoinSet;

/// Item registry plus the logic to turn a graph into a run
#[derive(Default, Clone)]
pub struct ExecutionEngine {
    /// Items keyed by node name
    items: HashMap<String, Arc<dyn Item>>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.items.keys().collect();
        names.sort();
        f.debug_struct("ExecutionEngine").field("items", &names).finish()
    }
}

impl ExecutionEngine {
    pub fn new(items: HashMap<String, Arc<dyn Item>>) -> Self {
        Self { items }
    }

    /// Attach (or replace) the item behind a node
    pub fn register(&mut self, name: impl Into<String>, item: Arc<dyn Item>) {
        self.items.insert(name.into(), item);
    }

    /// Follow a node rename so the item stays attached
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(item) = self.items.remove(old) {
            self.items.insert(new.to_string(), item);
        }
    }

    fn ensure_dag(graph: &Graph) -> ForestResult<()> {
        if is_acyclic(graph) {
            return Ok(());
        }
        let suggestion: Vec<String> = edges_causing_cycles(graph)
            .iter()
            .map(ToString::to_string)
            .collect();
        tracing::warn!(
            "🔁 Refusing to execute cyclic graph; remove one of: {}",
            suggestion.join(", ")
        );
        Err(ForestError::NotADag)
    }

    /// Coordinator for the whole graph containing `node`
    pub fn coordinator_for(
        &self,
        forest: &GraphForest,
        node: &str,
    ) -> ForestResult<ExecutionCoordinator> {
        let graph = forest.graph_containing(node)?;
        Self::ensure_dag(graph)?;
        ExecutionCoordinator::new(topological_order(graph), &self.items)
    }

    /// Coordinator for `target` and everything upstream of it
    pub fn coordinator_up_to(
        &self,
        forest: &GraphForest,
        target: &str,
    ) -> ForestResult<ExecutionCoordinator> {
        let graph = forest.graph_containing(target)?;
        Self::ensure_dag(graph)?;
        ExecutionCoordinator::new(order_up_to_node(graph, target)?, &self.items)
    }

    /// Run the graph containing `node` to completion or abort
    pub async fn execute_graph(&self, forest: &GraphForest, node: &str) -> ForestResult<RunReport> {
        let coordinator = self.coordinator_for(forest, node)?;
        Ok(coordinator.run().await)
    }

    /// Run only `target` and its ancestors
    pub async fn execute_up_to(&self, forest: &GraphForest, target: &str) -> ForestResult<RunReport> {
        let coordinator = self.coordinator_up_to(forest, target)?;
        Ok(coordinator.run().await)
    }

    /// Dry-run the graph containing `node` and return the predicted resources
    pub fn simulate_graph(&self, forest: &GraphForest, node: &str) -> ForestResult<ResourceTable> {
        Ok(self.coordinator_for(forest, node)?.simulate())
    }

    /// Run every executable graph of the forest concurrently
    ///
    /// Cyclic graphs and graphs with unregistered items are skipped.
    pub async fn execute_forest(&self, forest: &GraphForest) -> Vec<RunReport> {
        let mut runs = JoinSet::new();
        for graph in forest.graphs() {
            let Some(first) = graph.nodes().next() else {
                continue;
            };
            match self.coordinator_for(forest, first) {
                Ok(coordinator) => {
                    runs.spawn(coordinator.run());
                }
                Err(e) => {
                    tracing::warn!("⏭️ Skipping graph containing '{}': {}", first, e);
                }
            }
        }

        tracing::info!("🔄 Executing {} graphs concurrently", runs.len());
        let mut reports = Vec::with_capacity(runs.len());
        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!("❌ Graph run aborted: {}", e),
            }
        }
        reports
    }
}
