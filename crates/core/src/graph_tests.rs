// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

/// a -> b -> d, a -> c, e isolated
fn diamond_ish() -> Graph<&'static str> {
    let mut b = GraphBuilder::new();
    let a = b.add_node("a");
    let bb = b.add_node("b");
    let c = b.add_node("c");
    let d = b.add_node("d");
    b.add_node("e");
    b.add_edge(a, bb).add_edge(bb, d).add_edge(a, c);
    b.build().unwrap()
}

#[yare::parameterized(
    direct_parent        = { 1, 0, true },
    grandparent          = { 3, 0, true },
    parent_of_leaf       = { 3, 1, true },
    sibling_branch       = { 3, 2, false },
    child_is_not_parent  = { 0, 1, false },
    isolated_node        = { 4, 0, false },
    self_is_not_ancestor = { 1, 1, false },
    unknown_node         = { 99, 0, false },
)]
fn recursive_ancestry(node: usize, candidate: usize, expected: bool) {
    assert_eq!(diamond_ish().is_recursive_ancestor(node, candidate), expected);
}

#[test]
fn ancestors_listed_ascending() {
    assert_eq!(diamond_ish().recursive_ancestors(3), vec![0, 1]);
    assert!(diamond_ish().recursive_ancestors(0).is_empty());
}

#[test]
fn parents_and_children() {
    let g = diamond_ish();
    let names = |it: &mut dyn Iterator<Item = &Node<&'static str>>| it.map(|n| n.data).collect::<Vec<_>>();
    assert_eq!(names(&mut g.parents(3)), vec!["b"]);
    assert_eq!(names(&mut g.children(0)), vec!["b", "c"]);
    assert!(g.parents(0).next().is_none());
    assert!(g.children(99).next().is_none());
}

#[test]
fn builder_records_both_directions() {
    let g = diamond_ish();
    assert_eq!(g[0].child_indexes, vec![1, 2]);
    assert_eq!(g[3].parent_indexes, vec![1]);
    assert_eq!(g.len(), 5);
}

#[test]
fn builder_rejects_cycle() {
    let mut b = GraphBuilder::new();
    let x = b.add_node(());
    let y = b.add_node(());
    b.add_edge(x, y).add_edge(y, x);
    assert!(matches!(b.build(), Err(GraphError::Cycle { .. })));
}

#[test]
fn builder_rejects_unknown_edge_target() {
    let mut b = GraphBuilder::new();
    let x = b.add_node(());
    b.add_edge(x, 7);
    assert_eq!(b.build().unwrap_err(), GraphError::OutOfRange { node: 0, index: 7 });
}

#[test]
fn from_nodes_rejects_one_sided_edge() {
    let nodes = vec![
        Node { data: (), index: 0, parent_indexes: vec![], child_indexes: vec![] },
        Node { data: (), index: 1, parent_indexes: vec![0], child_indexes: vec![] },
    ];
    assert_eq!(
        Graph::from_nodes(nodes).unwrap_err(),
        GraphError::Asymmetric { parent: 0, child: 1 }
    );
}

#[test]
fn from_nodes_rejects_misplaced_index() {
    let nodes = vec![Node { data: (), index: 3, parent_indexes: vec![], child_indexes: vec![] }];
    assert_eq!(
        Graph::from_nodes(nodes).unwrap_err(),
        GraphError::IndexMismatch { position: 0, index: 3 }
    );
}

#[test]
fn serde_round_trip_revalidates() {
    let g = diamond_ish();
    let json = serde_json::to_value(&g).unwrap();
    assert_eq!(json[1]["parentIndexes"], serde_json::json!([0]));
    let back: Graph<String> = serde_json::from_value(json).unwrap();
    assert_eq!(back[3].data, "d");

    let broken = serde_json::json!([{ "data": 1, "index": 0, "parentIndexes": [0], "childIndexes": [0] }]);
    assert!(serde_json::from_value::<Graph<u32>>(broken).is_err());
}

#[test]
fn map_keeps_shape() {
    let g = diamond_ish().map(|n| n.data.len() + n.index);
    assert_eq!(g[3].data, 4);
    assert_eq!(g[3].parent_indexes, vec![1]);
}

proptest! {
    // Edges only point from lower to higher index, so every generated graph is acyclic.
    #[test]
    fn ancestry_matches_transitive_closure(edges in prop::collection::vec((0usize..8, 0usize..8), 0..20)) {
        let mut b = GraphBuilder::new();
        for i in 0..8 {
            b.add_node(i);
        }
        let mut unique: Vec<(usize, usize)> = edges
            .into_iter()
            .filter(|(p, c)| p < c)
            .collect();
        unique.sort_unstable();
        unique.dedup();
        for &(p, c) in &unique {
            b.add_edge(p, c);
        }
        let g = b.build().unwrap();

        // Floyd–Warshall style closure over the edge list.
        let mut reach = [[false; 8]; 8];
        for &(p, c) in &unique {
            reach[c][p] = true;
        }
        for k in 0..8 {
            for i in 0..8 {
                for j in 0..8 {
                    if reach[i][k] && reach[k][j] {
                        reach[i][j] = true;
                    }
                }
            }
        }
        for (node, row) in reach.iter().enumerate() {
            for (candidate, &expected) in row.iter().enumerate() {
                prop_assert_eq!(g.is_recursive_ancestor(node, candidate), expected);
            }
        }
    }
}
