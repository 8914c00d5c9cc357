//! DOT Format Export for Property Graphs
//!
//! Exports property dependency graphs to Graphviz DOT format with cycle
//! highlighting, coloring by dependency count and a marked root node.

use anyhow::Result;
use livegraph_core::{LayoutDirection, PropertyGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashSet;

use crate::graphviz::LayoutEngine;
use crate::{GraphRenderer, LayoutOptions};

/// DOT exporter with Doxygen-style attributes
#[derive(Debug, Clone)]
pub struct DotExporter {
    /// Highlight dependency cycles in red
    pub show_cycles: bool,
    /// Color nodes by how many properties they read
    pub color_by_dependencies: bool,
    /// Draw the root property with a heavier outline
    pub highlight_root: bool,
}

impl DotExporter {
    pub fn new() -> Self {
        Self {
            show_cycles: true,
            color_by_dependencies: true,
            highlight_root: true,
        }
    }

    /// Builder pattern: enable/disable cycle highlighting
    #[must_use]
    pub fn with_cycle_highlighting(mut self, enabled: bool) -> Self {
        self.show_cycles = enabled;
        self
    }

    /// Builder pattern: enable/disable dependency-count coloring
    #[must_use]
    pub fn with_dependency_coloring(mut self, enabled: bool) -> Self {
        self.color_by_dependencies = enabled;
        self
    }

    #[must_use]
    pub fn with_root_highlighting(mut self, enabled: bool) -> Self {
        self.highlight_root = enabled;
        self
    }

    /// Export one property graph to DOT
    pub fn export(&self, property: &PropertyGraph, layout: &LayoutOptions) -> String {
        let graph = property.graph.to_petgraph();
        let mut dot = format!("digraph \"{}\" {{\n", escape_dot_label(&property.root));

        if layout.hierarchical {
            dot.push_str(&format!("  rankdir={};\n", rankdir(layout.direction)));
        } else {
            dot.push_str(&format!("  layout={};\n", LayoutEngine::Neato));
        }
        dot.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\"];\n");
        dot.push_str("  edge [fontname=\"Helvetica\", fontsize=10];\n\n");

        let cyclic: Vec<HashSet<String>> = if self.show_cycles {
            property
                .graph
                .cycles()
                .into_iter()
                .map(|labels| labels.into_iter().collect())
                .collect()
        } else {
            Vec::new()
        };

        // petgraph indices follow node order, so node i has id nodes[i].id
        for (index, node) in property.graph.nodes.iter().enumerate() {
            let idx = petgraph::graph::NodeIndex::new(index);
            let color = if self.color_by_dependencies {
                dependency_color(graph.edges_directed(idx, Direction::Incoming).count())
            } else {
                "lightblue"
            };
            let outline = if self.highlight_root && node.label == property.root {
                ", penwidth=\"2.0\""
            } else {
                ""
            };
            dot.push_str(&format!(
                "  n{} [label=\"{}\", fillcolor=\"{}\"{}];\n",
                node.id,
                escape_dot_label(&node.label),
                color,
                outline
            ));
        }

        dot.push('\n');

        for edge in graph.edge_references() {
            let from = &graph[edge.source()];
            let to = &graph[edge.target()];
            let in_cycle = cyclic.iter().any(|c| c.contains(from) && c.contains(to));
            let (color, penwidth) = if in_cycle { ("red", "2.0") } else { ("blue", "1.0") };
            let from_id = property.graph.nodes[edge.source().index()].id;
            let to_id = property.graph.nodes[edge.target().index()].id;
            dot.push_str(&format!(
                "  n{} -> n{} [color=\"{}\", penwidth=\"{}\"];\n",
                from_id, to_id, color, penwidth
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

impl Default for DotExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphRenderer for DotExporter {
    fn render(&self, graph: &PropertyGraph, layout: &LayoutOptions) -> Result<String> {
        Ok(self.export(graph, layout))
    }

    fn format_name(&self) -> &'static str {
        "dot"
    }
}

/// Graphviz `rankdir` for a layout direction
fn rankdir(direction: LayoutDirection) -> &'static str {
    match direction {
        LayoutDirection::Ud => "TB",
        LayoutDirection::Du => "BT",
        LayoutDirection::Lr => "LR",
        LayoutDirection::Rl => "RL",
    }
}

/// Node color by number of direct dependencies
fn dependency_color(in_degree: usize) -> &'static str {
    match in_degree {
        0 => "lightgray",     // plain value
        1..=2 => "lightgreen",
        3..=5 => "yellow",
        _ => "orange",
    }
}

/// Escape special characters for DOT labels
fn escape_dot_label(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
