/// Item execution contract
///
/// The coordinator knows nothing about what an item does. It hands the item
/// the resources it can see, waits for a single outcome, and reacts to the
/// reported status. Cancellation is cooperative through the token in the
/// context.

use crate::runtime::resources::{Resource, ResourceSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Status an item reports when it finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Finished normally; downstream items may run
    Continuing,
    /// Stopped on request
    Stopped,
    /// Finished with an error
    Failed,
}

/// Completion signal carried back from an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub status: ExecutionStatus,
    /// Resources the item produced; only honoured when `status` is `Continuing`
    pub produced: Vec<Resource>,
}

impl ItemOutcome {
    pub fn continuing(produced: impl IntoIterator<Item = Resource>) -> Self {
        Self {
            status: ExecutionStatus::Continuing,
            produced: produced.into_iter().collect(),
        }
    }

    pub fn stopped() -> Self {
        Self {
            status: ExecutionStatus::Stopped,
            produced: Vec::new(),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: ExecutionStatus::Failed,
            produced: Vec::new(),
        }
    }
}

/// Everything an item receives when dispatched
#[derive(Debug, Clone)]
pub struct ItemContext {
    /// Name of the node being executed
    pub name: String,
    /// Resources made visible by already finished upstream items
    pub upstream: ResourceSet,
    /// Resources the direct successors offer to their predecessors
    pub downstream: ResourceSet,
    /// Cancelled when the run is asked to stop
    pub cancel: CancellationToken,
}

/// A unit of work attached to one node of the graph
#[async_trait]
pub trait Item: Send + Sync {
    /// Run the item to completion
    async fn execute(&self, ctx: ItemContext) -> ItemOutcome;

    /// Dry run used for design-time validation: the resources the item would
    /// produce given `upstream`, without doing any real work
    fn simulate(&self, _upstream: &ResourceSet) -> Vec<Resource> {
        Vec::new()
    }

    /// Resources offered to direct predecessors (e.g. a data store's endpoint)
    fn resources_for_predecessors(&self) -> Vec<Resource> {
        Vec::new()
    }
}
