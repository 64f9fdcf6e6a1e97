// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Index-addressed DAG.
//!
//! Nodes refer to each other by position only, so a [`Graph`] owns all of its
//! nodes, serializes as a plain array, and cannot form reference cycles.
//! Graphs are validated once at construction and never mutated afterwards.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Structural defects rejected when building a [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: usize },
    #[error("node {node} references missing node {index}")]
    OutOfRange { node: usize, index: usize },
    #[error("node {node} references itself")]
    SelfLoop { node: usize },
    #[error("node {node} lists {other} twice")]
    DuplicateEdge { node: usize, other: usize },
    #[error("edge {parent} -> {child} is not recorded on both nodes")]
    Asymmetric { parent: usize, child: usize },
    #[error("cycle through node {node}")]
    Cycle { node: usize },
}

/// A graph node: payload plus parent/child positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node<T> {
    pub data: T,
    pub index: usize,
    pub parent_indexes: Vec<usize>,
    pub child_indexes: Vec<usize>,
}

/// A validated DAG; insertion order is index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Graph<T> {
    /// Validate `nodes` and wrap them.
    pub fn from_nodes(nodes: Vec<Node<T>>) -> Result<Self, GraphError> {
        validate(&nodes)?;
        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node<T>> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node<T>> {
        self.nodes.iter()
    }

    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&Node<T>> {
        self.nodes.iter().find(|n| pred(&n.data))
    }

    /// Direct parents of `node`; empty for unknown indexes.
    pub fn parents(&self, node: usize) -> impl Iterator<Item = &Node<T>> {
        self.linked(node, |n| &n.parent_indexes)
    }

    /// Direct children of `node`; empty for unknown indexes.
    pub fn children(&self, node: usize) -> impl Iterator<Item = &Node<T>> {
        self.linked(node, |n| &n.child_indexes)
    }

    fn linked<'a>(
        &'a self,
        node: usize,
        edges: impl Fn(&'a Node<T>) -> &'a Vec<usize>,
    ) -> impl Iterator<Item = &'a Node<T>> {
        self.nodes
            .get(node)
            .map(|n| edges(n).as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&i| self.nodes.get(i))
    }

    /// True if `candidate` is a parent of `node`, or recursively a parent of
    /// one of its parents. Unknown indexes are never ancestors.
    pub fn is_recursive_ancestor(&self, node: usize, candidate: usize) -> bool {
        let Some(start) = self.nodes.get(node) else {
            return false;
        };
        let mut seen = HashSet::new();
        let mut stack: Vec<usize> = start.parent_indexes.clone();
        while let Some(parent) = stack.pop() {
            if parent == candidate {
                return true;
            }
            if !seen.insert(parent) {
                continue;
            }
            if let Some(p) = self.nodes.get(parent) {
                stack.extend(p.parent_indexes.iter().copied());
            }
        }
        false
    }

    /// All recursive ancestors of `node`, ascending.
    pub fn recursive_ancestors(&self, node: usize) -> Vec<usize> {
        let mut found: Vec<usize> =
            (0..self.nodes.len()).filter(|&c| self.is_recursive_ancestor(node, c)).collect();
        found.sort_unstable();
        found
    }

    /// Transform payloads while keeping the same shape.
    pub fn map<U>(&self, mut f: impl FnMut(&Node<T>) -> U) -> Graph<U> {
        Graph {
            nodes: self
                .nodes
                .iter()
                .map(|n| Node {
                    data: f(n),
                    index: n.index,
                    parent_indexes: n.parent_indexes.clone(),
                    child_indexes: n.child_indexes.clone(),
                })
                .collect(),
        }
    }
}

impl<T> std::ops::Index<usize> for Graph<T> {
    type Output = Node<T>;

    fn index(&self, index: usize) -> &Node<T> {
        &self.nodes[index]
    }
}

impl<'a, T> IntoIterator for &'a Graph<T> {
    type Item = &'a Node<T>;
    type IntoIter = std::slice::Iter<'a, Node<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl<T: Serialize> Serialize for Graph<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.nodes.serialize(s)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Graph<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let nodes = Vec::<Node<T>>::deserialize(d)?;
        Graph::from_nodes(nodes).map_err(serde::de::Error::custom)
    }
}

/// Incremental construction by payload and edge.
pub struct GraphBuilder<T> {
    data: Vec<T>,
    edges: Vec<(usize, usize)>,
}

impl<T> Default for GraphBuilder<T> {
    fn default() -> Self {
        Self { data: Vec::new(), edges: Vec::new() }
    }
}

impl<T> GraphBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its index.
    pub fn add_node(&mut self, data: T) -> usize {
        self.data.push(data);
        self.data.len() - 1
    }

    /// Record that `child` depends on `parent`.
    pub fn add_edge(&mut self, parent: usize, child: usize) -> &mut Self {
        self.edges.push((parent, child));
        self
    }

    pub fn build(self) -> Result<Graph<T>, GraphError> {
        let len = self.data.len();
        let mut nodes: Vec<Node<T>> = self
            .data
            .into_iter()
            .enumerate()
            .map(|(index, data)| Node { data, index, parent_indexes: Vec::new(), child_indexes: Vec::new() })
            .collect();
        for (parent, child) in self.edges {
            if parent >= len {
                return Err(GraphError::OutOfRange { node: child, index: parent });
            }
            if child >= len {
                return Err(GraphError::OutOfRange { node: parent, index: child });
            }
            nodes[child].parent_indexes.push(parent);
            nodes[parent].child_indexes.push(child);
        }
        Graph::from_nodes(nodes)
    }
}

fn validate<T>(nodes: &[Node<T>]) -> Result<(), GraphError> {
    let len = nodes.len();
    for (position, node) in nodes.iter().enumerate() {
        if node.index != position {
            return Err(GraphError::IndexMismatch { position, index: node.index });
        }
        for list in [&node.parent_indexes, &node.child_indexes] {
            let mut seen = HashSet::new();
            for &other in list {
                if other >= len {
                    return Err(GraphError::OutOfRange { node: position, index: other });
                }
                if other == position {
                    return Err(GraphError::SelfLoop { node: position });
                }
                if !seen.insert(other) {
                    return Err(GraphError::DuplicateEdge { node: position, other });
                }
            }
        }
    }
    for node in nodes {
        for &parent in &node.parent_indexes {
            if !nodes[parent].child_indexes.contains(&node.index) {
                return Err(GraphError::Asymmetric { parent, child: node.index });
            }
        }
        for &child in &node.child_indexes {
            if !nodes[child].parent_indexes.contains(&node.index) {
                return Err(GraphError::Asymmetric { parent: node.index, child });
            }
        }
    }

    // Kahn's algorithm: any node left with unresolved parents sits on a cycle.
    let mut pending: Vec<usize> = nodes.iter().map(|n| n.parent_indexes.len()).collect();
    let mut ready: VecDeque<usize> = (0..len).filter(|&i| pending[i] == 0).collect();
    let mut visited = 0;
    while let Some(i) = ready.pop_front() {
        visited += 1;
        for &child in &nodes[i].child_indexes {
            pending[child] -= 1;
            if pending[child] == 0 {
                ready.push_back(child);
            }
        }
    }
    if visited < len {
        let node = pending.iter().position(|&p| p > 0).unwrap_or(0);
        return Err(GraphError::Cycle { node });
    }
    Ok(())
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
