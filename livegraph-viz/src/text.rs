//! Plain-text tree renderer.
//!
//! Prints the root property and, beneath it, what it depends on:
//!
//! ```text
//! name
//! ├── first
//! └── last
//! ```
//!
//! A property already on the current path is printed once more with a
//! `(cycle)` marker and not descended into.

use anyhow::Result;
use livegraph_core::graph::NodeId;
use livegraph_core::PropertyGraph;
use std::collections::HashMap;

use crate::{GraphRenderer, LayoutOptions};

#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    /// Append the node id to every label
    pub show_ids: bool,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self { show_ids: false }
    }

    #[must_use]
    pub fn with_ids(mut self, enabled: bool) -> Self {
        self.show_ids = enabled;
        self
    }

    fn label(&self, graph: &PropertyGraph, id: NodeId) -> String {
        let label = graph.graph.label(id).unwrap_or("?");
        if self.show_ids {
            format!("{} #{}", label, id)
        } else {
            label.to_string()
        }
    }

    fn write_children(
        &self,
        graph: &PropertyGraph,
        dependencies: &HashMap<NodeId, Vec<NodeId>>,
        id: NodeId,
        prefix: &str,
        path: &mut Vec<NodeId>,
        out: &mut String,
    ) {
        let Some(children) = dependencies.get(&id) else {
            return;
        };
        for (i, &child) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
            out.push_str(prefix);
            out.push_str(branch);
            out.push_str(&self.label(graph, child));
            if path.contains(&child) {
                out.push_str(" (cycle)\n");
                continue;
            }
            out.push('\n');
            path.push(child);
            self.write_children(graph, dependencies, child, &format!("{}{}", prefix, indent), path, out);
            path.pop();
        }
    }
}

impl GraphRenderer for TextRenderer {
    fn render(&self, graph: &PropertyGraph, _layout: &LayoutOptions) -> Result<String> {
        // edges point dependency -> dependent; walk them backwards
        let mut dependencies: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &graph.graph.edges {
            dependencies.entry(edge.to).or_default().push(edge.from);
        }

        let Some(root) = graph.graph.nodes.first().map(|n| n.id) else {
            return Ok(format!("{}\n", graph.root));
        };
        let mut out = format!("{}\n", self.label(graph, root));
        let mut path = vec![root];
        self.write_children(graph, &dependencies, root, "", &mut path, &mut out);
        Ok(out)
    }

    fn format_name(&self) -> &'static str {
        "text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livegraph_core::{build_graph, DependencyMap};

    fn render(root: &str, entries: &[(&str, &[&str])]) -> String {
        let map: DependencyMap = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect::<Vec<_>>()))
            .collect();
        let graph = PropertyGraph {
            root: root.to_string(),
            graph: build_graph(root, &map),
        };
        TextRenderer::new().render(&graph, &LayoutOptions::default()).unwrap()
    }

    #[test]
    fn test_value_property() {
        assert_eq!(render("first", &[("first", &[])]), "first\n");
    }

    #[test]
    fn test_computed_property() {
        let out = render("name", &[("name", &["first", "last"]), ("first", &[]), ("last", &[])]);
        assert_eq!(out, "name\n├── first\n└── last\n");
    }

    #[test]
    fn test_nested_dependencies() {
        let out = render(
            "greeting",
            &[("greeting", &["name", "title"]), ("name", &["first"]), ("first", &[]), ("title", &[])],
        );
        assert_eq!(out, "greeting\n├── name\n│   └── first\n└── title\n");
    }

    #[test]
    fn test_cycle_is_marked() {
        let out = render("a", &[("a", &["b"]), ("b", &["a"])]);
        assert_eq!(out, "a\n└── b\n    └── a (cycle)\n");
    }

    #[test]
    fn test_ids() {
        let map: DependencyMap = [("x", Vec::<String>::new())].into_iter().collect();
        let graph = PropertyGraph {
            root: "x".to_string(),
            graph: build_graph("x", &map),
        };
        let out = TextRenderer::new()
            .with_ids(true)
            .render(&graph, &LayoutOptions::default())
            .unwrap();
        assert_eq!(out, "x #1\n");
    }
}
