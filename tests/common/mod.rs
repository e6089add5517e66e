//! Shared test items and forest builders.

#![allow(dead_code)]

use async_trait::async_trait;
use itemflow::runtime::{ExecutionStatus, Item, ItemContext, ItemOutcome, Resource, ResourceSet};
use itemflow::GraphForest;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What an item saw when it was dispatched
#[derive(Debug, Clone)]
pub struct Visit {
    pub name: String,
    pub upstream: ResourceSet,
    pub downstream: ResourceSet,
}

pub type Journal = Arc<Mutex<Vec<Visit>>>;

/// Item that records its context, produces one file and reports a fixed status
pub struct ScriptedItem {
    pub journal: Journal,
    pub produces: Vec<Resource>,
    pub offers: Vec<Resource>,
    pub status: ExecutionStatus,
}

#[async_trait]
impl Item for ScriptedItem {
    async fn execute(&self, ctx: ItemContext) -> ItemOutcome {
        self.journal.lock().unwrap().push(Visit {
            name: ctx.name.clone(),
            upstream: ctx.upstream.clone(),
            downstream: ctx.downstream.clone(),
        });
        ItemOutcome {
            status: self.status,
            produced: self.produces.clone(),
        }
    }

    fn simulate(&self, _upstream: &ResourceSet) -> Vec<Resource> {
        self.produces.clone()
    }

    fn resources_for_predecessors(&self) -> Vec<Resource> {
        self.offers.clone()
    }
}

pub fn forest(nodes: &[&str], edges: &[(&str, &str)]) -> GraphForest {
    let mut forest = GraphForest::new();
    for node in nodes {
        forest.add_singleton_graph(node).unwrap();
    }
    for (src, dst) in edges {
        forest.add_edge(src, dst).unwrap();
    }
    forest
}

/// One scripted item per node, producing `/out/{name}.dat`
pub fn scripted_items(
    nodes: &[&str],
    status_of: impl Fn(&str) -> ExecutionStatus,
) -> (HashMap<String, Arc<dyn Item>>, Journal) {
    let journal: Journal = Arc::default();
    let items = nodes
        .iter()
        .map(|name| {
            let item: Arc<dyn Item> = Arc::new(ScriptedItem {
                journal: Arc::clone(&journal),
                produces: vec![Resource::produced_file(format!("/out/{}.dat", name))],
                offers: Vec::new(),
                status: status_of(name),
            });
            (name.to_string(), item)
        })
        .collect();
    (items, journal)
}

pub fn visited(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().iter().map(|v| v.name.clone()).collect()
}
