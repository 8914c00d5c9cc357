//! vis-network JSON.
//!
//! Produces the `{ nodes, edges, options }` document a vis-network
//! `Network` is constructed from. Nodes and edges are the graph's own
//! serialized form; `options.layout.hierarchical` carries the direction.

use anyhow::{Context, Result};
use livegraph_core::{Graph, PropertyGraph};
use serde::Serialize;

use crate::{GraphRenderer, LayoutOptions};

#[derive(Debug, Serialize)]
struct Hierarchical {
    direction: &'static str,
}

#[derive(Debug, Serialize)]
struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    hierarchical: Option<Hierarchical>,
}

#[derive(Debug, Serialize)]
struct NetworkOptions {
    layout: Layout,
}

#[derive(Debug, Serialize)]
struct Network<'g> {
    key: &'g str,
    #[serde(flatten)]
    graph: &'g Graph,
    options: NetworkOptions,
}

/// Renderer producing vis-network input as JSON
#[derive(Debug, Clone, Default)]
pub struct VisRenderer {
    pub pretty: bool,
}

impl VisRenderer {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    #[must_use]
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    /// The network document as a JSON value
    pub fn to_value(&self, graph: &PropertyGraph, layout: &LayoutOptions) -> Result<serde_json::Value> {
        serde_json::to_value(network(graph, layout)).context("Failed to serialize vis-network document")
    }
}

fn network<'g>(graph: &'g PropertyGraph, layout: &LayoutOptions) -> Network<'g> {
    Network {
        key: &graph.root,
        graph: &graph.graph,
        options: NetworkOptions {
            layout: Layout {
                hierarchical: layout.hierarchical.then(|| Hierarchical {
                    direction: layout.direction.as_str(),
                }),
            },
        },
    }
}

impl GraphRenderer for VisRenderer {
    fn render(&self, graph: &PropertyGraph, layout: &LayoutOptions) -> Result<String> {
        let document = network(graph, layout);
        let json = if self.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        json.context("Failed to serialize vis-network document")
    }

    fn format_name(&self) -> &'static str {
        "vis"
    }
}
