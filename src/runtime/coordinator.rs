/// Sequential execution coordinator
///
/// Walks one graph's topological order, running a single item at a time.
/// After dispatching an item the coordinator suspends until that item's
/// completion signal arrives on a oneshot channel; a `Continuing` status
/// propagates resources to the successors and moves on, `Stopped` or
/// `Failed` ends the run and discards the rest of the queue.

use crate::error::{ForestError, ForestResult};
use crate::runtime::item::{ExecutionStatus, Item, ItemContext, ItemOutcome};
use crate::runtime::resources::{ResourceSet, ResourceTable};
use crate::workflow::cycles::TopologicalOrder;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Terminal status of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Stopped,
    Failed,
}

/// Observable coordinator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum CoordinatorState {
    /// Nothing running yet
    Idle,
    /// The named node is executing
    Running(String),
    /// Run over, either drained or aborted
    Finished(RunStatus),
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Nodes that were dispatched, in order
    pub executed: Vec<String>,
    /// Resource visibility at the end of the run
    pub resources: ResourceTable,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Cloneable control surface for a running coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    state: watch::Receiver<CoordinatorState>,
    cancel: CancellationToken,
}

impl CoordinatorHandle {
    pub fn state(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    /// Receiver for waiting on state transitions
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.clone()
    }

    /// Ask the running item to cancel; the run then finishes as `Stopped`
    ///
    /// Returns false when no item is running.
    pub fn stop(&self) -> bool {
        let running = match &*self.state.borrow() {
            CoordinatorState::Running(node) => Some(node.clone()),
            _ => None,
        };
        match running {
            Some(node) => {
                tracing::info!("⏹️ Stop requested while '{}' is running", node);
                self.cancel.cancel();
                true
            }
            None => {
                tracing::info!("⏹️ Stop requested but nothing is running");
                false
            }
        }
    }
}

/// Drives one acyclic graph to completion or abort
pub struct ExecutionCoordinator {
    order: TopologicalOrder,
    items: HashMap<String, Arc<dyn Item>>,
    state: watch::Sender<CoordinatorState>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ExecutionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionCoordinator")
            .field("order", &self.order)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl ExecutionCoordinator {
    /// Create a coordinator for `order`; every node needs an item
    ///
    /// An empty order is what a cyclic graph yields, so it is refused.
    pub fn new(
        order: TopologicalOrder,
        items: &HashMap<String, Arc<dyn Item>>,
    ) -> ForestResult<Self> {
        if order.is_empty() {
            return Err(ForestError::NotADag);
        }
        let mut selected = HashMap::new();
        for node in order.nodes() {
            let item = items
                .get(node)
                .ok_or_else(|| ForestError::NodeNotFound(node.to_string()))?;
            selected.insert(node.to_string(), Arc::clone(item));
        }
        let (state, _) = watch::channel(CoordinatorState::Idle);
        Ok(Self {
            order,
            items: selected,
            state,
            cancel: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            state: self.state.subscribe(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn order(&self) -> &TopologicalOrder {
        &self.order
    }

    /// Union of what the direct successors of `node` offer upstream
    fn downstream_view(&self, node: &str) -> ResourceSet {
        self.order
            .successors(node)
            .iter()
            .filter(|next| next.as_str() != node)
            .filter_map(|next| self.items.get(next))
            .flat_map(|item| item.resources_for_predecessors())
            .collect()
    }

    /// Dry run: ask every item what it would produce and propagate it
    pub fn simulate(&self) -> ResourceTable {
        let mut table = ResourceTable::for_nodes(self.order.nodes());
        for node in self.order.nodes() {
            let Some(item) = self.items.get(node) else {
                continue;
            };
            let upstream = table.resources_of(node).cloned().unwrap_or_default();
            table.record_produced(node, item.simulate(&upstream));
            table.propagate(node, self.order.successors(node));
        }
        table
    }

    async fn dispatch(&self, node: &str, table: &ResourceTable) -> ItemOutcome {
        let Some(item) = self.items.get(node).map(Arc::clone) else {
            return ItemOutcome::failed();
        };
        let ctx = ItemContext {
            name: node.to_string(),
            upstream: table.resources_of(node).cloned().unwrap_or_default(),
            downstream: self.downstream_view(node),
            cancel: self.cancel.child_token(),
        };

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = item.execute(ctx).await;
            let _ = tx.send(outcome);
        });

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!("❌ Item '{}' dropped its completion signal", node);
                ItemOutcome::failed()
            }
        }
    }

    /// Run every node of the order, one at a time
    pub async fn run(self) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut table = ResourceTable::for_nodes(self.order.nodes());
        let mut queue: VecDeque<String> = self.order.nodes().map(str::to_string).collect();
        let mut executed = Vec::new();

        tracing::info!("🚀 Run {} started with {} items", run_id, queue.len());

        let status = loop {
            if self.cancel.is_cancelled() {
                break RunStatus::Stopped;
            }
            let Some(node) = queue.pop_front() else {
                break RunStatus::Success;
            };

            self.state.send_replace(CoordinatorState::Running(node.clone()));
            tracing::info!("📍 Run {}: executing '{}'", run_id, node);
            let outcome = self.dispatch(&node, &table).await;
            executed.push(node.clone());

            if self.cancel.is_cancelled() {
                tracing::warn!("⏸️ Run {}: '{}' reported back after stop", run_id, node);
                break RunStatus::Stopped;
            }

            match outcome.status {
                ExecutionStatus::Continuing => {
                    table.record_produced(&node, outcome.produced);
                    table.propagate(&node, self.order.successors(&node));
                    tracing::debug!("✅ Run {}: '{}' finished", run_id, node);
                }
                ExecutionStatus::Stopped => {
                    tracing::warn!("⏸️ Run {}: '{}' stopped", run_id, node);
                    break RunStatus::Stopped;
                }
                ExecutionStatus::Failed => {
                    tracing::warn!("❌ Run {}: '{}' failed", run_id, node);
                    break RunStatus::Failed;
                }
            }
        };

        if !queue.is_empty() {
            tracing::debug!("🧹 Run {}: discarded {} queued items", run_id, queue.len());
        }
        self.state.send_replace(CoordinatorState::Finished(status));
        let finished_at = Utc::now();
        tracing::info!(
            "🏁 Run {} finished as {:?} in {}ms",
            run_id,
            status,
            (finished_at - started_at).num_milliseconds()
        );

        RunReport {
            run_id,
            status,
            executed,
            resources: table,
            started_at,
            finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::resources::Resource;
    use crate::workflow::cycles::topological_order;
    use crate::workflow::forest::Graph;
    use crate::workflow::types::Edge;
    use async_trait::async_trait;

    struct Producer(&'static str);

    #[async_trait]
    impl Item for Producer {
        async fn execute(&self, _ctx: ItemContext) -> ItemOutcome {
            ItemOutcome::continuing([Resource::produced_file(self.0)])
        }

        fn simulate(&self, _upstream: &ResourceSet) -> Vec<Resource> {
            vec![Resource::produced_file(self.0)]
        }
    }

    struct WaitForCancel;

    #[async_trait]
    impl Item for WaitForCancel {
        async fn execute(&self, ctx: ItemContext) -> ItemOutcome {
            ctx.cancel.cancelled().await;
            ItemOutcome::stopped()
        }
    }

    struct Panics;

    #[async_trait]
    impl Item for Panics {
        async fn execute(&self, _ctx: ItemContext) -> ItemOutcome {
            panic!("item blew up");
        }
    }

    fn chain(nodes: &[&str]) -> TopologicalOrder {
        let edges = nodes.windows(2).map(|w| Edge::new(w[0], w[1]));
        topological_order(&Graph::from_parts(nodes.iter().copied(), edges).unwrap())
    }

    fn item(item: impl Item + 'static) -> Arc<dyn Item> {
        Arc::new(item)
    }

    fn items(pairs: Vec<(&str, Arc<dyn Item>)>) -> HashMap<String, Arc<dyn Item>> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn missing_item_is_rejected() {
        let items = items(vec![("a", item(Producer("a.out")))]);
        assert!(matches!(
            ExecutionCoordinator::new(chain(&["a", "b"]), &items),
            Err(ForestError::NodeNotFound(name)) if name == "b"
        ));
    }

    #[test]
    fn stop_while_idle_has_nothing_to_stop() {
        let items = items(vec![("a", item(Producer("a.out")))]);
        let coordinator = ExecutionCoordinator::new(chain(&["a"]), &items).unwrap();
        let handle = coordinator.handle();
        assert_eq!(handle.state(), CoordinatorState::Idle);
        assert!(!handle.stop());
    }

    #[test]
    fn simulate_prepopulates_without_running() {
        let items = items(vec![
            ("a", item(Producer("/a.out"))),
            ("b", item(Producer("/b.out"))),
        ]);
        let coordinator = ExecutionCoordinator::new(chain(&["a", "b"]), &items).unwrap();
        let table = coordinator.simulate();
        assert_eq!(table.find_exact("b", "a.out"), Some("/a.out"));
        assert_eq!(coordinator.handle().state(), CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn stop_cancels_running_item() {
        let items = items(vec![
            ("a", item(WaitForCancel)),
            ("b", item(Producer("/b.out"))),
        ]);
        let coordinator = ExecutionCoordinator::new(chain(&["a", "b"]), &items).unwrap();
        let handle = coordinator.handle();
        let mut states = handle.subscribe();
        let run = tokio::spawn(coordinator.run());

        states
            .wait_for(|s| *s == CoordinatorState::Running("a".to_string()))
            .await
            .unwrap();
        assert!(handle.stop());

        let report = run.await.unwrap();
        assert_eq!(report.status, RunStatus::Stopped);
        assert_eq!(report.executed, vec!["a".to_string()]);
        assert!(report.resources.resources_of("b").unwrap().is_empty());
        assert_eq!(handle.state(), CoordinatorState::Finished(RunStatus::Stopped));
        assert!(!handle.stop());
    }

    #[tokio::test]
    async fn panicking_item_fails_the_run() {
        let items = items(vec![
            ("a", item(Panics)),
            ("b", item(Producer("/b.out"))),
        ]);
        let report = ExecutionCoordinator::new(chain(&["a", "b"]), &items)
            .unwrap()
            .run()
            .await;
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.executed, vec!["a".to_string()]);
    }

    #[test]
    fn cyclic_order_is_refused() {
        let graph = Graph::from_parts(["a", "b"], [Edge::new("a", "b"), Edge::new("b", "a")]).unwrap();
        let items = items(vec![
            ("a", item(Producer("/a.out"))),
            ("b", item(Producer("/b.out"))),
        ]);
        assert!(matches!(
            ExecutionCoordinator::new(topological_order(&graph), &items),
            Err(ForestError::NotADag)
        ));
        assert!(matches!(
            ExecutionCoordinator::new(TopologicalOrder::default(), &HashMap::new()),
            Err(ForestError::NotADag)
        ));
    }

    #[tokio::test]
    async fn producer_does_not_see_its_own_output() {
        let items = items(vec![
            ("a", item(Producer("/a.out"))),
            ("b", item(Producer("/b.out"))),
        ]);
        let report = ExecutionCoordinator::new(chain(&["a", "b"]), &items)
            .unwrap()
            .run()
            .await;
        assert_eq!(report.status, RunStatus::Success);
        assert!(report.resources.resources_of("a").unwrap().is_empty());
        assert_eq!(report.resources.find_exact("b", "a.out"), Some("/a.out"));
        assert_eq!(report.resources.find_exact("b", "b.out"), None);
        assert!(report
            .resources
            .produced_by("b")
            .unwrap()
            .contains(&Resource::produced_file("/b.out")));
    }
}
