use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graph::{Graph, NodeIndex};

use crate::error::GraphError;
use crate::registry::Registry;

/// The dependency graph derived from the requires/provides relation.
///
/// Nodes are registered tasks; a directed edge runs from the task that
/// provides a key to every task that requires it. Edges are deduplicated, so
/// two tasks sharing several keys are still connected by a single edge.
#[derive(Debug)]
pub(crate) struct TaskGraph {
    graph: Graph<usize, ()>,
}

impl TaskGraph {
    /// Derives the graph, resolving every required key to its provider.
    pub fn build(registry: &Registry) -> Result<Self, GraphError> {
        let mut graph = Graph::new();

        let indices: Vec<NodeIndex> = (0..registry.tasks.len())
            .map(|index| graph.add_node(index))
            .collect();

        let mut edges = HashSet::new();

        for (consumer, task) in registry.tasks.iter().enumerate() {
            for requirement in &task.requires {
                let provider = match registry.provider_index(&requirement.key) {
                    Some(provider) => provider,
                    // Keys seeded by the caller are externally provided and
                    // contribute no edge.
                    None if registry.is_seeded(&requirement.key) => continue,
                    None => {
                        return Err(GraphError::UnresolvedDependency {
                            task: task.name.clone(),
                            key: requirement.key.clone(),
                        });
                    }
                };

                if edges.insert((provider, consumer)) {
                    graph.add_edge(indices[provider], indices[consumer], ());
                }
            }
        }

        Ok(Self { graph })
    }

    /// Computes a topological ordering over the graph, as indices into the
    /// registry's task list.
    ///
    /// The ordering is deterministic for a fixed registration order, so
    /// repeated runs of the same pipeline are reproducible.
    pub fn execution_order(&self, registry: &Registry) -> Result<Vec<usize>, GraphError> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let task = self.graph[cycle.node_id()];
            GraphError::Cycle(registry.tasks[task].name.clone())
        })?;

        Ok(sorted.into_iter().map(|index| self.graph[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Outcome;

    fn register(registry: &mut Registry, name: &str, requires: &[&str], provides: &[&str]) {
        registry
            .task(name)
            .requires(requires.iter().copied())
            .provides(provides.iter().copied())
            .run(|_, _, _| Ok(Outcome::Ran))
            .unwrap();
    }

    fn position(order: &[usize], registry: &Registry, name: &str) -> usize {
        order
            .iter()
            .position(|&index| registry.tasks[index].name.as_ref() == name)
            .unwrap()
    }

    #[test]
    fn test_order_respects_edges() {
        let mut registry = Registry::new();
        register(&mut registry, "link", &["objects"], &["binary"]);
        register(&mut registry, "compile", &["sources"], &["objects"]);
        register(&mut registry, "fetch", &[], &["sources"]);
        register(&mut registry, "flash", &["binary"], &["image"]);

        let graph = TaskGraph::build(&registry).unwrap();
        let order = graph.execution_order(&registry).unwrap();

        assert_eq!(order.len(), 4);
        assert!(position(&order, &registry, "fetch") < position(&order, &registry, "compile"));
        assert!(position(&order, &registry, "compile") < position(&order, &registry, "link"));
        assert!(position(&order, &registry, "link") < position(&order, &registry, "flash"));
    }

    #[test]
    fn test_order_is_deterministic() {
        let build_order = || {
            let mut registry = Registry::new();
            register(&mut registry, "a", &[], &["k1"]);
            register(&mut registry, "b", &[], &["k2"]);
            register(&mut registry, "c", &["k1", "k2"], &["k3"]);
            register(&mut registry, "d", &[], &["k4"]);

            let graph = TaskGraph::build(&registry).unwrap();
            let order = graph.execution_order(&registry).unwrap();
            order
                .into_iter()
                .map(|index| registry.tasks[index].name.to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(build_order(), build_order());
    }

    #[test]
    fn test_edges_deduplicated() {
        let mut registry = Registry::new();
        register(&mut registry, "producer", &[], &["k1", "k2"]);
        register(&mut registry, "consumer", &["k1", "k2"], &[]);

        let graph = TaskGraph::build(&registry).unwrap();
        assert_eq!(graph.graph.edge_count(), 1);
    }

    #[test]
    fn test_seeded_key_counts_as_provided() {
        let mut registry = Registry::new();
        registry.seed("src", "main");
        register(&mut registry, "compile", &["src"], &["binary"]);

        let graph = TaskGraph::build(&registry).unwrap();
        assert_eq!(graph.graph.edge_count(), 0);
    }

    #[test]
    fn test_unresolved_dependency() {
        let mut registry = Registry::new();
        register(&mut registry, "lonely", &["nowhere"], &["somewhere"]);

        let err = TaskGraph::build(&registry).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnresolvedDependency { ref task, ref key }
                if task.as_ref() == "lonely" && key.as_ref() == "nowhere"
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let mut registry = Registry::new();
        register(&mut registry, "chicken", &["egg"], &["bird"]);
        register(&mut registry, "hatch", &["bird"], &["egg"]);

        let graph = TaskGraph::build(&registry).unwrap();
        let err = graph.execution_order(&registry).unwrap_err();
        assert!(matches!(err, GraphError::Cycle(_)));
    }
}
