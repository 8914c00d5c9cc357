//! Property dependency graphs.
//!
//! A [`Graph`] is the node/edge set handed to a renderer: nodes carry
//! sequential ids starting at 1 and an edge `from A to B` means B depends on
//! A. [`build_graph`] derives one from a root label and a [`DependencyMap`];
//! conversion to `petgraph` backs DOT export and cycle detection.

pub mod builder;

pub use builder::{build_graph, build_property_graphs};

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

pub type NodeId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
}

/// Arrow decoration of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Arrows {
    #[default]
    #[serde(rename = "to")]
    To,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub arrows: Arrows,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.label.as_str())
    }

    /// Edges as `(dependency, dependent)` label pairs
    pub fn labeled_edges(&self) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .filter_map(|e| Some((self.label(e.from)?, self.label(e.to)?)))
            .collect()
    }

    /// Same labels and same labeled edges, regardless of id assignment
    pub fn structurally_equal(&self, other: &Graph) -> bool {
        let labels = |g: &Graph| g.nodes.iter().map(|n| n.label.clone()).collect::<BTreeSet<_>>();
        let edges = |g: &Graph| {
            g.labeled_edges()
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect::<BTreeSet<_>>()
        };
        labels(self) == labels(other) && edges(self) == edges(other)
    }

    /// Convert to a petgraph graph; node weights are labels
    pub fn to_petgraph(&self) -> DiGraph<String, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
        for node in &self.nodes {
            index.insert(node.id, graph.add_node(node.label.clone()));
        }
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
                graph.add_edge(from, to, ());
            }
        }
        graph
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.to_petgraph())
    }

    /// Labels of every dependency cycle, each sorted
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let graph = self.to_petgraph();
        tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut labels: Vec<String> = scc.into_iter().map(|i| graph[i].clone()).collect();
                labels.sort();
                labels
            })
            .collect()
    }
}

/// Graph rooted at one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyGraph {
    pub root: String,
    pub graph: Graph,
}

/// Hierarchical layout direction hint for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayoutDirection {
    /// Up-down
    Ud,
    /// Down-up
    Du,
    /// Left-right
    Lr,
    /// Right-left, dependencies to the right of their dependents
    #[default]
    Rl,
}

impl LayoutDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ud => "UD",
            Self::Du => "DU",
            Self::Lr => "LR",
            Self::Rl => "RL",
        }
    }
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UD" | "TB" => Ok(Self::Ud),
            "DU" | "BT" => Ok(Self::Du),
            "LR" => Ok(Self::Lr),
            "RL" => Ok(Self::Rl),
            other => Err(format!("unknown layout direction: {}", other)),
        }
    }
}
