//! Graph construction from a dependency map.
//!
//! Depth-first from the root: each dependency gets the next id on first
//! sight, an edge `dependency -> current` is added, and the dependency is
//! expanded in turn. A label is expanded at most once, so cyclic maps
//! terminate and shared sub-dependencies contribute their edges once.

use super::{Arrows, Edge, Graph, Node, NodeId, PropertyGraph};
use crate::models::DependencyMap;
use std::collections::{HashMap, HashSet};

struct Builder<'m> {
    dependencies: &'m DependencyMap,
    ids: HashMap<String, NodeId>,
    expanded: HashSet<String>,
    graph: Graph,
}

impl<'m> Builder<'m> {
    fn id_for(&mut self, label: &str) -> NodeId {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.graph.nodes.len() as NodeId + 1;
        self.ids.insert(label.to_string(), id);
        self.graph.nodes.push(Node {
            id,
            label: label.to_string(),
        });
        id
    }

    fn expand(&mut self, label: &str) {
        if !self.expanded.insert(label.to_string()) {
            return;
        }
        let map = self.dependencies;
        let Some(dependencies) = map.get(label) else {
            return;
        };
        let current = self.id_for(label);
        for dependency in dependencies {
            let from = self.id_for(dependency);
            self.graph.edges.push(Edge {
                from,
                to: current,
                arrows: Arrows::To,
            });
            self.expand(dependency);
        }
    }
}

/// Build the graph of everything `root` transitively depends on
pub fn build_graph(root: &str, dependencies: &DependencyMap) -> Graph {
    let mut builder = Builder {
        dependencies,
        ids: HashMap::new(),
        expanded: HashSet::new(),
        graph: Graph::default(),
    };
    builder.id_for(root);
    builder.expand(root);
    builder.graph
}

/// One graph per property, in map order
pub fn build_property_graphs(dependencies: &DependencyMap) -> Vec<PropertyGraph> {
    dependencies
        .keys()
        .map(|root| PropertyGraph {
            root: root.to_string(),
            graph: build_graph(root, dependencies),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(entries: &[(&str, &[&str])]) -> DependencyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect::<Vec<_>>()))
            .collect()
    }

    fn node(id: NodeId, label: &str) -> Node {
        Node {
            id,
            label: label.to_string(),
        }
    }

    fn edge(from: NodeId, to: NodeId) -> Edge {
        Edge {
            from,
            to,
            arrows: Arrows::To,
        }
    }

    #[test]
    fn test_name_depends_on_first_and_last() {
        let deps = map(&[("name", &["first", "last"]), ("first", &[]), ("last", &[])]);
        let graph = build_graph("name", &deps);
        assert_eq!(graph.nodes, vec![node(1, "name"), node(2, "first"), node(3, "last")]);
        assert_eq!(graph.edges, vec![edge(2, 1), edge(3, 1)]);
    }

    #[test]
    fn test_root_without_entry_is_a_single_node() {
        let graph = build_graph("orphan", &DependencyMap::new());
        assert_eq!(graph.nodes, vec![node(1, "orphan")]);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_transitive_expansion_is_depth_first() {
        let deps = map(&[("a", &["b", "d"]), ("b", &["c"]), ("d", &["c"])]);
        let graph = build_graph("a", &deps);
        let labels: Vec<_> = graph.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c", "d"]);
        assert_eq!(
            graph.labeled_edges(),
            vec![("b", "a"), ("c", "b"), ("d", "a"), ("c", "d")]
        );
    }

    #[test]
    fn test_two_cycle_terminates() {
        let deps = map(&[("a", &["b"]), ("b", &["a"])]);
        let graph = build_graph("a", &deps);
        assert_eq!(graph.nodes, vec![node(1, "a"), node(2, "b")]);
        assert_eq!(graph.edges, vec![edge(2, 1), edge(1, 2)]);
    }

    #[test]
    fn test_self_dependency_terminates() {
        let graph = build_graph("a", &map(&[("a", &["a"])]));
        assert_eq!(graph.nodes, vec![node(1, "a")]);
        assert_eq!(graph.edges, vec![edge(1, 1)]);
    }

    #[test]
    fn test_one_graph_per_property() {
        let deps = map(&[("first", &[]), ("last", &[]), ("name", &["first", "last"])]);
        let graphs = build_property_graphs(&deps);
        let roots: Vec<_> = graphs.iter().map(|g| g.root.as_str()).collect();
        assert_eq!(roots, vec!["first", "last", "name"]);
        assert_eq!(graphs[0].graph.nodes, vec![node(1, "first")]);
        assert_eq!(graphs[2].graph.edges.len(), 2);
    }

    fn dependency_maps() -> impl Strategy<Value = DependencyMap> {
        let label = prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]);
        prop::collection::vec(
            (label.clone(), prop::collection::vec(label, 0..5)),
            0..8,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect::<Vec<_>>()))
                .collect::<DependencyMap>()
        })
    }

    proptest! {
        #[test]
        fn prop_builder_terminates_with_sequential_ids(deps in dependency_maps()) {
            let graph = build_graph("a", &deps);
            let ids: Vec<_> = graph.nodes.iter().map(|n| n.id).collect();
            let expected: Vec<NodeId> = (1..=graph.nodes.len() as NodeId).collect();
            prop_assert_eq!(ids, expected);

            let labels: HashSet<_> = graph.nodes.iter().map(|n| n.label.as_str()).collect();
            prop_assert_eq!(labels.len(), graph.nodes.len());
            for e in &graph.edges {
                prop_assert!(graph.node(e.from).is_some());
                prop_assert!(graph.node(e.to).is_some());
            }
        }

        #[test]
        fn prop_builder_is_idempotent(deps in dependency_maps()) {
            let first = build_graph("a", &deps);
            let second = build_graph("a", &deps);
            prop_assert!(first.structurally_equal(&second));
            prop_assert_eq!(first, second);
        }
    }
}
