use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef as _;
use petgraph::{Direction, algo};
use std::collections::{HashMap, HashSet};
use wavegate_core::{Error, Result, Task, TaskId};

/// Immutable task dependency graph
///
/// Edges point from a dependency to its dependent. Node indices follow the
/// input order of the tasks, which keeps layering deterministic.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraph<Task, ()>,
}

impl TaskGraph {
    /// Builds the graph, rejecting duplicate ids and unresolved dependencies.
    ///
    /// # Errors
    /// Returns `Error::DuplicateTask` or `Error::UnknownDependency`.
    pub fn from_tasks(tasks: &[Task]) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_map: HashMap<&TaskId, NodeIndex> = HashMap::new();

        for task in tasks {
            if node_map.contains_key(&task.id) {
                return Err(Error::DuplicateTask(task.id.clone()));
            }
            let node = graph.add_node(task.clone());
            node_map.insert(&task.id, node);
        }

        for task in tasks {
            let task_node = node_map[&task.id];
            for dep_id in &task.dependencies {
                let Some(&dep_node) = node_map.get(dep_id) else {
                    return Err(Error::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dep_id.clone(),
                    });
                };
                graph.add_edge(dep_node, task_node, ());
            }
        }

        Ok(Self { graph })
    }

    /// Detect cycles (invalid graph)
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        algo::is_cyclic_directed(&self.graph)
    }

    /// Tasks that take part in a dependency cycle, sorted by id.
    #[must_use]
    pub fn cycle_members(&self) -> Vec<TaskId> {
        let mut members: Vec<TaskId> = algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .flatten()
            .map(|node| self.graph[node].id.clone())
            .collect();
        members.sort();
        members
    }

    /// Kahn layering: layer 0 holds tasks without dependencies, layer k the
    /// tasks whose dependencies all sit in earlier layers.
    ///
    /// Tasks inside a layer keep their input order.
    ///
    /// # Errors
    /// Returns `Error::CyclicDependency` naming the tasks on a cycle.
    pub fn layers(&self) -> Result<Vec<Vec<Task>>> {
        let mut remaining: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|node| {
                let in_degree = self
                    .graph
                    .edges_directed(node, Direction::Incoming)
                    .count();
                (node, in_degree)
            })
            .collect();

        let mut current: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|node| remaining.get(node) == Some(&0))
            .collect();
        let mut placed: HashSet<NodeIndex> = HashSet::new();
        let mut layers = Vec::new();

        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                placed.insert(node);
                for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                    let target = edge.target();
                    if let Some(in_degree) = remaining.get_mut(&target) {
                        *in_degree = in_degree.saturating_sub(1);
                        if *in_degree == 0 {
                            next.push(target);
                        }
                    }
                }
            }
            layers.push(
                current
                    .iter()
                    .map(|&node| self.graph[node].clone())
                    .collect(),
            );
            next.sort_unstable();
            next.dedup();
            current = next;
        }

        if placed.len() != self.graph.node_count() {
            return Err(Error::CyclicDependency(self.cycle_members()));
        }

        Ok(layers)
    }

    /// Get total task count
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get all tasks in input order
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.graph.node_weights().cloned().collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::assertions_on_result_states,
    reason = "Test code has different conventions"
)]
mod tests {
    use super::*;

    fn layer_ids(layers: &[Vec<Task>]) -> Vec<Vec<&str>> {
        layers
            .iter()
            .map(|layer| layer.iter().map(|task| task.id.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_layers_follow_dependencies() {
        let tasks = vec![
            Task::new("t3", "w").with_dependencies(["t1", "t2"]),
            Task::new("t1", "w"),
            Task::new("t2", "w"),
        ];
        let graph = match TaskGraph::from_tasks(&tasks) {
            Ok(graph) => graph,
            Err(error) => panic!("graph construction failed: {error}"),
        };
        assert!(!graph.has_cycles());

        let layers = match graph.layers() {
            Ok(layers) => layers,
            Err(error) => panic!("layering failed: {error}"),
        };
        assert_eq!(layer_ids(&layers), vec![vec!["t1", "t2"], vec!["t3"]]);
    }

    #[test]
    fn test_diamond_layers() {
        let tasks = vec![
            Task::new("root", "w"),
            Task::new("left", "w").with_dependencies(["root"]),
            Task::new("right", "w").with_dependencies(["root"]),
            Task::new("join", "w").with_dependencies(["left", "right"]),
        ];
        let layers = match TaskGraph::from_tasks(&tasks).and_then(|graph| graph.layers()) {
            Ok(layers) => layers,
            Err(error) => panic!("layering failed: {error}"),
        };
        assert_eq!(
            layer_ids(&layers),
            vec![vec!["root"], vec!["left", "right"], vec!["join"]]
        );
    }

    #[test]
    fn test_cycle_is_reported_with_members() {
        let tasks = vec![
            Task::new("a", "w").with_dependencies(["b"]),
            Task::new("b", "w").with_dependencies(["a"]),
            Task::new("c", "w"),
        ];
        let graph = match TaskGraph::from_tasks(&tasks) {
            Ok(graph) => graph,
            Err(error) => panic!("graph construction failed: {error}"),
        };
        assert!(graph.has_cycles());
        assert_eq!(graph.cycle_members(), vec![TaskId::new("a"), TaskId::new("b")]);

        match graph.layers() {
            Err(Error::CyclicDependency(members)) => {
                assert_eq!(members, vec![TaskId::new("a"), TaskId::new("b")]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![Task::new("loop", "w").with_dependencies(["loop"])];
        let graph = match TaskGraph::from_tasks(&tasks) {
            Ok(graph) => graph,
            Err(error) => panic!("graph construction failed: {error}"),
        };
        assert_eq!(graph.cycle_members(), vec![TaskId::new("loop")]);
        assert!(graph.layers().is_err());
    }

    #[test]
    fn test_duplicate_and_unknown_ids_rejected() {
        let duplicate = vec![Task::new("a", "w"), Task::new("a", "w")];
        assert!(matches!(
            TaskGraph::from_tasks(&duplicate),
            Err(Error::DuplicateTask(_))
        ));

        let unknown = vec![Task::new("a", "w").with_dependencies(["ghost"])];
        assert!(matches!(
            TaskGraph::from_tasks(&unknown),
            Err(Error::UnknownDependency { .. })
        ));
    }
}
