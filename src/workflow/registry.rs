/// Shared forest registry using ArcSwap snapshots
///
/// The forest itself has no internal locking, so the registry owns it behind
/// a single async mutex: every mutation goes through `edit`, one at a time.
/// After each successful edit the graph list is published as an immutable
/// snapshot, so readers (listing, ordering, export) never wait on writers.

use crate::error::{ForestError, ForestResult};
use crate::workflow::forest::{Graph, GraphForest};
use crate::workflow::types::Workflow;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct ForestRegistry {
    /// The authoritative forest; writers serialize on this lock
    forest: Mutex<GraphForest>,
    /// Last published graph list for lock-free reads
    snapshot: ArcSwap<Vec<Graph>>,
}

impl Default for ForestRegistry {
    fn default() -> Self {
        Self::new(GraphForest::new())
    }
}

impl ForestRegistry {
    pub fn new(forest: GraphForest) -> Self {
        let snapshot = ArcSwap::from_pointee(forest.graphs().to_vec());
        Self {
            forest: Mutex::new(forest),
            snapshot,
        }
    }

    /// Current graphs (lock-free read)
    pub fn snapshot(&self) -> Arc<Vec<Graph>> {
        self.snapshot.load_full()
    }

    /// Copy of the graph holding `node` from the current snapshot
    pub fn graph_containing(&self, node: &str) -> ForestResult<Graph> {
        self.snapshot
            .load()
            .iter()
            .find(|g| g.contains_node(node))
            .cloned()
            .ok_or_else(|| ForestError::NodeNotFound(node.to_string()))
    }

    /// Apply one mutation and publish the new snapshot if it succeeded
    pub async fn edit<T>(
        &self,
        apply: impl FnOnce(&mut GraphForest) -> ForestResult<T>,
    ) -> ForestResult<T> {
        let mut forest = self.forest.lock().await;
        let result = apply(&mut *forest)?;
        self.snapshot.store(Arc::new(forest.graphs().to_vec()));
        tracing::debug!("📊 Published forest snapshot: {} graphs", forest.len());
        Ok(result)
    }

    /// Replace the whole forest with one built from `workflow`
    pub async fn load_workflow(&self, workflow: &Workflow) -> ForestResult<usize> {
        let fresh = GraphForest::from_workflow(workflow)?;
        let graph_count = fresh.len();
        self.edit(move |forest| {
            *forest = fresh;
            Ok(())
        })
        .await?;
        tracing::info!("📥 Loaded workflow '{}' ({} graphs)", workflow.id, graph_count);
        Ok(graph_count)
    }

    /// Clone of the full forest, taken under the lock
    pub async fn forest(&self) -> GraphForest {
        self.forest.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_edit_keeps_previous_snapshot() {
        let registry = ForestRegistry::default();
        registry.edit(|f| f.add_singleton_graph("a")).await.unwrap();
        let before = registry.snapshot();

        assert!(registry.edit(|f| f.add_edge("a", "ghost")).await.is_err());
        assert_eq!(registry.snapshot(), before);
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn edits_publish_new_snapshot() {
        let registry = ForestRegistry::default();
        registry.edit(|f| f.add_singleton_graph("a")).await.unwrap();
        registry.edit(|f| f.add_singleton_graph("b")).await.unwrap();
        assert_eq!(registry.snapshot().len(), 2);

        registry.edit(|f| f.add_edge("a", "b")).await.unwrap();
        assert_eq!(registry.snapshot().len(), 1);
        assert!(registry.graph_containing("b").unwrap().contains_edge("a", "b"));
        assert_eq!(registry.forest().await.len(), 1);
    }
}
