//! Dependency graph for tasks and subtasks
//!
//! Built fresh from a [`TaskCollection`] whenever it is needed. Nodes are every
//! task and subtask; edges point from a dependent to each of its dependencies.
//! Uses petgraph for storage and topological ordering.
//!
//! Self-references, dangling references and repeated entries never become
//! edges. Those are node-local problems reported separately by the validator,
//! so every cycle found here has at least two distinct nodes.

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

use super::collection::TaskCollection;
use super::id::TaskRef;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Dependency cycle detected: {0}")]
    CycleDetected(Cycle),
}

/// A closed dependency path: the first node is repeated at the end
///
/// `[3, 1, 2, 3]` reads "3 depends on 1, 1 depends on 2, 2 depends on 3".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cycle(Vec<TaskRef>);

impl Cycle {
    /// Closes an open node sequence into a cycle
    fn from_nodes(nodes: &[TaskRef]) -> Self {
        let mut path = nodes.to_vec();
        if let Some(first) = nodes.first() {
            path.push(*first);
        }
        Self(path)
    }

    /// Full closed path, first node repeated at the end
    pub fn path(&self) -> &[TaskRef] {
        &self.0
    }

    /// Distinct nodes in cycle order
    pub fn nodes(&self) -> &[TaskRef] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    /// Edges as (dependent, dependency) pairs
    pub fn edges(&self) -> impl Iterator<Item = (TaskRef, TaskRef)> + '_ {
        self.0.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Returns true if the cycle passes through the given node
    pub fn contains(&self, task_ref: &TaskRef) -> bool {
        self.nodes().contains(task_ref)
    }

    /// Rotates the cycle so it starts at its lowest ref
    fn normalized(&self) -> Self {
        let nodes = self.nodes();
        let start = nodes
            .iter()
            .enumerate()
            .min_by_key(|(_, r)| **r)
            .map(|(i, _)| i)
            .unwrap_or(0);

        let rotated: Vec<TaskRef> = nodes[start..].iter().chain(&nodes[..start]).copied().collect();
        Self::from_nodes(&rotated)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(" -> "))
    }
}

impl Serialize for Cycle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter().map(|r| r.to_string()))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Finished,
}

/// A dependency graph over every task and subtask
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<TaskRef, ()>,

    /// Map from TaskRef to node index
    node_map: HashMap<TaskRef, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a graph from the current state of a collection
    pub fn from_collection(collection: &TaskCollection) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        for entity in collection.entities() {
            graph.add_node(entity.task_ref());
        }

        // Second pass: add all edges
        for entity in collection.entities() {
            let from = entity.task_ref();
            for dep in entity.dependencies() {
                graph.add_edge(&from, dep);
            }
        }

        graph
    }

    /// Adds a node to the graph
    pub fn add_node(&mut self, task_ref: TaskRef) {
        if !self.node_map.contains_key(&task_ref) {
            let idx = self.graph.add_node(task_ref);
            self.node_map.insert(task_ref, idx);
        }
    }

    /// Adds an edge `from` depends on `to`
    ///
    /// Returns false (and adds nothing) for self-loops, unknown nodes and
    /// edges that already exist.
    pub fn add_edge(&mut self, from: &TaskRef, to: &TaskRef) -> bool {
        if from == to {
            return false;
        }

        let (from_idx, to_idx) = match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(f), Some(t)) => (*f, *t),
            _ => return false,
        };

        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return false;
        }

        self.graph.add_edge(from_idx, to_idx, ());
        true
    }

    /// Neighbours of a node in edge insertion order
    fn ordered_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        // petgraph lists the most recently added edge first
        let mut neighbors: Vec<_> = self.graph.neighbors_directed(idx, direction).collect();
        neighbors.reverse();
        neighbors
    }

    fn refs(&self, indices: Vec<NodeIndex>) -> Vec<TaskRef> {
        indices
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).copied())
            .collect()
    }

    /// Returns the direct dependencies of a node
    pub fn dependencies(&self, task_ref: &TaskRef) -> Vec<TaskRef> {
        match self.node_map.get(task_ref) {
            Some(idx) => self.refs(self.ordered_neighbors(*idx, Direction::Outgoing)),
            None => vec![],
        }
    }

    /// Returns the direct dependents of a node (entities that depend on it)
    pub fn dependents(&self, task_ref: &TaskRef) -> Vec<TaskRef> {
        match self.node_map.get(task_ref) {
            Some(idx) => self.refs(self.ordered_neighbors(*idx, Direction::Incoming)),
            None => vec![],
        }
    }

    /// Depth-first walk with an explicit recursion stack
    ///
    /// Roots are visited in node insertion order and edges in insertion
    /// order. Every back edge yields the cycle formed by the stack segment it
    /// closes; cycles are normalized to start at their lowest ref and
    /// reported once each.
    fn walk_cycles(&self, stop_at_first: bool) -> Vec<Cycle> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut seen = HashSet::new();
        let mut cycles = Vec::new();

        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::Unvisited {
                continue;
            }

            // Each frame holds a node and its ordered neighbours plus a cursor
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            let mut path: Vec<NodeIndex> = Vec::new();

            marks[root.index()] = Mark::OnStack;
            path.push(root);
            stack.push((root, self.ordered_neighbors(root, Direction::Outgoing), 0));

            while let Some((node, neighbors, cursor)) = stack.last_mut() {
                if *cursor < neighbors.len() {
                    let next = neighbors[*cursor];
                    *cursor += 1;

                    match marks[next.index()] {
                        Mark::Unvisited => {
                            marks[next.index()] = Mark::OnStack;
                            path.push(next);
                            let next_neighbors = self.ordered_neighbors(next, Direction::Outgoing);
                            stack.push((next, next_neighbors, 0));
                        }
                        Mark::OnStack => {
                            let start = path.iter().position(|n| *n == next).unwrap_or(0);
                            let nodes = self.refs(path[start..].to_vec());
                            let cycle = Cycle::from_nodes(&nodes).normalized();

                            if seen.insert(cycle.clone()) {
                                cycles.push(cycle);
                                if stop_at_first {
                                    return cycles;
                                }
                            }
                        }
                        Mark::Finished => {}
                    }
                } else {
                    marks[node.index()] = Mark::Finished;
                    path.pop();
                    stack.pop();
                }
            }
        }

        cycles
    }

    /// Returns every distinct cycle reachable by the depth-first walk
    pub fn find_cycles(&self) -> Vec<Cycle> {
        self.walk_cycles(false)
    }

    /// Returns the first cycle the depth-first walk runs into
    pub fn first_cycle(&self) -> Option<Cycle> {
        self.walk_cycles(true).into_iter().next()
    }

    /// Returns true if the graph contains any cycle
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Shortest dependency path from `from` to `to`, both ends included
    pub fn path_between(&self, from: &TaskRef, to: &TaskRef) -> Option<Vec<TaskRef>> {
        let start = *self.node_map.get(from)?;
        let goal = *self.node_map.get(to)?;

        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut indices = vec![goal];
                let mut cursor = goal;
                while let Some(prev) = previous.get(&cursor) {
                    indices.push(*prev);
                    cursor = *prev;
                }
                indices.reverse();
                return Some(self.refs(indices));
            }

            for next in self.ordered_neighbors(current, Direction::Outgoing) {
                if visited.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Cycle that the edge `from -> to` closes, if any
    ///
    /// The path starts at `from`: `[from, to, ..., from]`.
    pub fn cycle_through(&self, from: &TaskRef, to: &TaskRef) -> Option<Cycle> {
        if from == to {
            return Some(Cycle::from_nodes(&[*from]));
        }
        let back = self.path_between(to, from)?;
        let mut nodes = vec![*from];
        nodes.extend(back.iter().take(back.len().saturating_sub(1)));
        Some(Cycle::from_nodes(&nodes))
    }

    /// Returns all nodes with dependencies before dependents
    pub fn topological_order(&self) -> Result<Vec<TaskRef>, GraphError> {
        match toposort(&self.graph, None) {
            Ok(order) => {
                // Edges point at dependencies, so toposort yields dependents first
                let mut refs = self.refs(order);
                refs.reverse();
                Ok(refs)
            }
            Err(_) => {
                let cycle = self
                    .first_cycle()
                    .unwrap_or_else(|| Cycle::from_nodes(&[]));
                Err(GraphError::CycleDetected(cycle))
            }
        }
    }

    /// Returns true if the graph contains the node
    pub fn contains(&self, task_ref: &TaskRef) -> bool {
        self.node_map.contains_key(task_ref)
    }

    /// Returns the number of nodes in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns the number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
