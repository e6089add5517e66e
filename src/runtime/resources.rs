/// Per-item resource visibility
///
/// Each item of the running graph sees a set of resources (database
/// endpoints, file references, produced files, imported records). Sets only
/// ever grow during a run: a finished item's resources are unioned into its
/// successors, nothing is overwritten or withdrawn.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Resource category, declared in lookup priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Database or service endpoint (URL-like handle)
    Endpoint,
    /// Reference to an existing file
    File,
    /// File produced by an item during the run
    ProducedFile,
    /// Record imported into a data store
    ImportedRecord,
}

impl ResourceKind {
    /// All categories, highest lookup priority first
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Endpoint,
        ResourceKind::File,
        ResourceKind::ProducedFile,
        ResourceKind::ImportedRecord,
    ];
}

/// A single (category, value) resource entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub value: String,
}

impl Resource {
    pub fn new(kind: ResourceKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn endpoint(value: impl Into<String>) -> Self {
        Self::new(ResourceKind::Endpoint, value)
    }

    pub fn file(value: impl Into<String>) -> Self {
        Self::new(ResourceKind::File, value)
    }

    pub fn produced_file(value: impl Into<String>) -> Self {
        Self::new(ResourceKind::ProducedFile, value)
    }

    pub fn imported_record(value: impl Into<String>) -> Self {
        Self::new(ResourceKind::ImportedRecord, value)
    }
}

/// Final path component of a path or URL-like handle
pub fn basename(value: &str) -> &str {
    let trimmed = value.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Compile a `*`/`?` pattern; brackets are matched literally
///
/// Runs of `*` collapse to one, `glob` rejects `**` inside a name.
fn compile_pattern(pattern: &str) -> Option<glob::Pattern> {
    let mut escaped = String::with_capacity(pattern.len());
    let mut prev_star = false;
    for ch in pattern.chars() {
        match ch {
            '*' if prev_star => continue,
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            _ => escaped.push(ch),
        }
        prev_star = ch == '*';
    }
    match glob::Pattern::new(&escaped) {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            tracing::warn!("⚠️ Invalid resource pattern '{}': {}", pattern, e);
            None
        }
    }
}

/// Resources visible to one item, grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSet {
    by_kind: BTreeMap<ResourceKind, BTreeSet<String>>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; returns false when it was already present
    pub fn insert(&mut self, resource: Resource) -> bool {
        self.by_kind
            .entry(resource.kind)
            .or_default()
            .insert(resource.value)
    }

    /// Union `other` into this set
    pub fn merge(&mut self, other: &ResourceSet) {
        for (kind, values) in &other.by_kind {
            self.by_kind
                .entry(*kind)
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    pub fn get(&self, kind: ResourceKind) -> impl Iterator<Item = &str> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.by_kind
            .get(&resource.kind)
            .is_some_and(|values| values.contains(&resource.value))
    }

    pub fn len(&self) -> usize {
        self.by_kind.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every resource, in category priority order
    pub fn iter(&self) -> impl Iterator<Item = Resource> + '_ {
        self.by_kind.iter().flat_map(|(kind, values)| {
            values.iter().map(move |value| Resource::new(*kind, value.clone()))
        })
    }

    /// Whether every resource of `self` is also in `other`
    pub fn is_subset(&self, other: &ResourceSet) -> bool {
        self.iter().all(|resource| other.contains(&resource))
    }

    /// First value whose basename equals `filename`, by category priority
    pub fn find_exact(&self, filename: &str) -> Option<&str> {
        ResourceKind::ALL
            .iter()
            .flat_map(|kind| self.get(*kind))
            .find(|value| basename(value) == filename)
    }

    /// Every value whose basename matches `pattern` across all categories
    ///
    /// Without wildcards this is [`find_exact`](Self::find_exact) wrapped in a list.
    pub fn find_glob(&self, pattern: &str) -> Vec<&str> {
        if !has_wildcards(pattern) {
            return self.find_exact(pattern).into_iter().collect();
        }
        let Some(compiled) = compile_pattern(pattern) else {
            return Vec::new();
        };
        ResourceKind::ALL
            .iter()
            .flat_map(|kind| self.get(*kind))
            .filter(|value| compiled.matches(basename(value)))
            .collect()
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        let mut set = Self::new();
        for resource in iter {
            set.insert(resource);
        }
        set
    }
}

/// Node name → resources visible to that node, plus what each node produced
///
/// `visible` only ever holds what finished predecessors passed down; a node's
/// own output sits in `produced` until it is propagated to its successors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTable {
    visible: BTreeMap<String, ResourceSet>,
    produced: BTreeMap<String, ResourceSet>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty entries for every given node
    pub fn for_nodes<'a>(nodes: impl IntoIterator<Item = &'a str>) -> Self {
        let visible: BTreeMap<String, ResourceSet> = nodes
            .into_iter()
            .map(|node| (node.to_string(), ResourceSet::new()))
            .collect();
        let produced = visible.clone();
        Self { visible, produced }
    }

    /// Record what `node` produced; successors see it after `propagate`
    pub fn record_produced(&mut self, node: &str, resources: impl IntoIterator<Item = Resource>) {
        let entry = self.produced.entry(node.to_string()).or_default();
        for resource in resources {
            entry.insert(resource);
        }
        self.visible.entry(node.to_string()).or_default();
    }

    /// Union everything visible to or produced by `from` into each of `to`
    pub fn propagate<S: AsRef<str>>(&mut self, from: &str, to: &[S]) {
        let mut outgoing = self.visible.get(from).cloned().unwrap_or_default();
        if let Some(own) = self.produced.get(from) {
            outgoing.merge(own);
        }
        for target in to {
            let target = target.as_ref();
            if target == from {
                continue;
            }
            self.visible.entry(target.to_string()).or_default().merge(&outgoing);
            tracing::debug!(
                "📦 Propagated {} resources from '{}' to '{}'",
                outgoing.len(),
                from,
                target
            );
        }
    }

    /// Resources passed down to `node` by its predecessors
    pub fn resources_of(&self, node: &str) -> Option<&ResourceSet> {
        self.visible.get(node)
    }

    /// Resources `node` itself produced
    pub fn produced_by(&self, node: &str) -> Option<&ResourceSet> {
        self.produced.get(node)
    }

    /// Values of one category visible to `node`
    pub fn visible_to(&self, node: &str, kind: ResourceKind) -> BTreeSet<&str> {
        self.visible
            .get(node)
            .map(|set| set.get(kind).collect())
            .unwrap_or_default()
    }

    pub fn find_exact(&self, node: &str, filename: &str) -> Option<&str> {
        self.visible.get(node)?.find_exact(filename)
    }

    pub fn find_glob(&self, node: &str, pattern: &str) -> Vec<&str> {
        self.visible
            .get(node)
            .map(|set| set.find_glob(pattern))
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.visible.keys().map(String::as_str)
    }
}
