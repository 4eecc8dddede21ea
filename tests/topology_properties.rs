// tests/topology_properties.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use proptest::prelude::*;
use serde_json::json;

use agentgraph::graph::topology::{Mask, Topology};
use agentgraph::graph::{ConnectionBuilder, RoundExecutor, UnitArena};
use agentgraph::graph::unit::Unit;
use agentgraph::types::{EdgeKind, RunOptions};
use agentgraph_test_utils::ScriptedAgent;

// Strategy for an arbitrary square 0/1 matrix, diagonal included.
fn mask_strategy(max_units: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    (1..=max_units).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(0u8..=1, n), n)
    })
}

fn arena(n: usize) -> UnitArena {
    let mut arena = UnitArena::new();
    for i in 0..n {
        let label = format!("u{i}");
        arena.insert(Unit::new(
            Some(label.clone()),
            "scripted",
            "Scripted",
            Box::new(ScriptedAgent::new(label)),
        ));
    }
    arena
}

fn is_acyclic(edges: &[(String, String)]) -> bool {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (from, to) in edges {
        graph.add_edge(from.as_str(), to.as_str(), ());
    }
    toposort(&graph, None).is_ok()
}

/// Off-diagonal ones of `rows` as unit id pairs, row-major.
fn mask_pairs(rows: &[Vec<u8>]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            if v == 1 && i != j {
                pairs.push((format!("u{i}"), format!("u{j}")));
            }
        }
    }
    pairs
}

proptest! {
    #[test]
    fn builds_are_deterministic(rows in mask_strategy(7), round in 0usize..3) {
        let n = rows.len();
        let mask = Mask::from_rows(&rows).unwrap();
        let topology = Topology::new(mask.clone(), mask);

        let mut first = arena(n);
        let mut second = arena(n);
        for a in [&mut first, &mut second] {
            ConnectionBuilder::build_spatial(a, &topology);
            ConnectionBuilder::build_temporal(a, &topology, round);
        }

        prop_assert_eq!(first.edges(EdgeKind::Spatial), second.edges(EdgeKind::Spatial));
        prop_assert_eq!(first.edges(EdgeKind::Temporal), second.edges(EdgeKind::Temporal));

        // Rebuilding in place gives the same result again.
        ConnectionBuilder::build_spatial(&mut first, &topology);
        prop_assert_eq!(first.edges(EdgeKind::Spatial), second.edges(EdgeKind::Spatial));
    }

    #[test]
    fn spatial_edges_are_acyclic_and_temporal_follow_mask(rows in mask_strategy(7)) {
        let n = rows.len();
        let mask = Mask::from_rows(&rows).unwrap();
        let topology = Topology::new(mask.clone(), mask);
        let mut arena = arena(n);

        ConnectionBuilder::build_spatial(&mut arena, &topology);
        ConnectionBuilder::build_temporal(&mut arena, &topology, 1);

        let spatial = arena.edges(EdgeKind::Spatial);
        let temporal = arena.edges(EdgeKind::Temporal);
        prop_assert!(is_acyclic(&spatial));
        prop_assert!(spatial.iter().all(|(a, b)| a != b));

        // Temporal edges never order execution: every off-diagonal entry
        // materialises, cycles included.
        let expected: Vec<(String, String)> = mask_pairs(&rows);
        prop_assert_eq!(temporal, expected);

        // A mutual pair never materialises both ways.
        for (a, b) in &spatial {
            prop_assert!(!spatial.contains(&(b.clone(), a.clone())));
        }
    }

    #[test]
    fn every_round_drains(rows in mask_strategy(7)) {
        let n = rows.len();
        let mut arena = arena(n);
        let mut spatial = Mask::from_rows(&rows).unwrap();
        for i in 0..n {
            spatial.set(i, i, false);
        }
        let topology = Topology::new(spatial, Mask::zeros(n));
        ConnectionBuilder::build_spatial(&mut arena, &topology);

        let executor = RoundExecutor::new(&RunOptions::default());
        let report = executor.run_round(&mut arena, 0, &json!(null));

        prop_assert_eq!(report.executed.len(), n);
        prop_assert!(report.failed.is_empty());
    }
}
