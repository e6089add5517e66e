/// GraphML export for a single graph
///
/// Emits a minimal document: one `<node>` per node and one `<edge>` per edge,
/// self-loops included. Only DAGs are exported.

use crate::error::{ForestError, ForestResult};
use crate::workflow::cycles::is_acyclic;
use crate::workflow::forest::Graph;
use std::fmt::Write as _;
use std::path::Path;

fn escape_attr(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render `graph` as GraphML text
pub fn to_graphml(graph: &Graph) -> ForestResult<String> {
    if !is_acyclic(graph) {
        return Err(ForestError::NotADag);
    }

    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    doc.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
    doc.push_str("  <graph edgedefault=\"directed\">\n");
    // Writing into a String cannot fail.
    for node in graph.nodes() {
        let _ = writeln!(doc, "    <node id=\"{}\"/>", escape_attr(node));
    }
    for edge in graph.edges() {
        let _ = writeln!(
            doc,
            "    <edge source=\"{}\" target=\"{}\"/>",
            escape_attr(&edge.src),
            escape_attr(&edge.dst)
        );
    }
    doc.push_str("  </graph>\n");
    doc.push_str("</graphml>\n");
    Ok(doc)
}

/// Write `graph` to `path` as GraphML; fails with `NotADag` for cyclic graphs
pub fn export_graphml(graph: &Graph, path: impl AsRef<Path>) -> ForestResult<()> {
    let path = path.as_ref();
    let doc = to_graphml(graph)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, doc)?;
    tracing::info!("📤 Exported graph ({} nodes) to {}", graph.node_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::Edge;

    #[test]
    fn writes_nodes_edges_and_self_loops() {
        let graph = Graph::from_parts(
            ["a", "b&c"],
            [Edge::new("a", "b&c"), Edge::new("a", "a")],
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("graph.graphml");
        export_graphml(&graph, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<node id=\"a\"/>"));
        assert!(text.contains("<node id=\"b&amp;c\"/>"));
        assert!(text.contains("<edge source=\"a\" target=\"b&amp;c\"/>"));
        assert!(text.contains("<edge source=\"a\" target=\"a\"/>"));
    }

    #[test]
    fn refuses_cyclic_graph() {
        let graph = Graph::from_parts(["a", "b"], [Edge::new("a", "b"), Edge::new("b", "a")]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.graphml");
        assert!(matches!(export_graphml(&graph, &path), Err(ForestError::NotADag)));
        assert!(!path.exists());
    }
}
