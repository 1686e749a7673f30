//! Property tests for the graph store invariants.
//!
//! Graphs are generated from random embeddings and random similarity weights;
//! every property must hold for any of them.

use proptest::prelude::*;
use symgraph::{DualGraph, EdgeType, Error, GraphConfig, Layer, Node, QuantileEstimator, WalkParams};

const DIM: usize = 3;

fn embedding() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, DIM)
}

/// Nodes on both layers with unique ids.
fn dual_nodes() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec((any::<bool>(), embedding()), 1..24).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (is_text, v))| {
                if is_text {
                    Node::text(format!("t{i}"), v)
                } else {
                    Node::expression(format!("e{i}"), v)
                }
            })
            .collect()
    })
}

/// A text chain with the given weights plus one anchored expression per
/// text node.
fn weighted_graph(weights: &[f64]) -> DualGraph {
    let mut graph = DualGraph::default();
    let n = weights.len() + 1;
    graph
        .add_nodes((0..n).map(|i| Node::text(format!("t{i}"), vec![1.0; DIM])))
        .unwrap();
    graph
        .add_nodes((0..n).map(|i| Node::expression(format!("e{i}"), vec![1.0; DIM])))
        .unwrap();
    for (i, &w) in weights.iter().enumerate() {
        graph.add_edge(&format!("t{i}"), &format!("t{}", i + 1), EdgeType::TextSim, w).unwrap();
    }
    for i in 0..n {
        graph.add_edge(&format!("e{i}"), &format!("t{i}"), EdgeType::AnchorOccursIn, 1.0).unwrap();
    }
    graph
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_prune_keeps_anchors_and_heavy_edges(
        weights in prop::collection::vec(0.0f64..=1.0, 1..200),
        percentile in 0.0f64..=100.0,
    ) {
        let mut graph = weighted_graph(&weights);
        let anchors_before = graph.count_edges_of(EdgeType::AnchorOccursIn);

        let report = graph.percentile_prune(percentile).unwrap();
        let threshold = report.threshold.unwrap();

        prop_assert_eq!(graph.count_edges_of(EdgeType::AnchorOccursIn), anchors_before);
        prop_assert!(graph.edges()
            .filter(|e| e.edge_type != EdgeType::AnchorOccursIn)
            .all(|e| e.weight >= threshold));

        // The estimate stays inside the observed range.
        let min = weights.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(threshold >= min && threshold <= max);
    }

    #[test]
    fn prop_knn_respects_k_layers_and_self(nodes in dual_nodes(), k in 0usize..6) {
        let mut graph = DualGraph::default();
        graph.add_nodes(nodes).unwrap();
        graph.build_knn_edges(Layer::Text, k, EdgeType::TextSim).unwrap();
        graph.build_knn_edges(Layer::Expression, k, EdgeType::ExprSyn).unwrap();

        for node in graph.nodes() {
            let out = graph.out_edges(&node.id).unwrap();
            prop_assert!(out.len() <= k);
            for edge in out {
                prop_assert_ne!(edge.target, node.id.as_str());
                let target = graph.node(edge.target).unwrap();
                prop_assert_eq!(target.layer, node.layer);
                let expected = match node.layer {
                    Layer::Text => EdgeType::TextSim,
                    Layer::Expression => EdgeType::ExprSyn,
                };
                prop_assert_eq!(edge.edge_type, expected);
                prop_assert!((0.0..=1.0).contains(&edge.weight));
            }
        }
    }

    #[test]
    fn prop_walks_are_bounded_and_valid(
        nodes in dual_nodes(),
        num_walks in 1usize..20,
        walk_length in 1usize..30,
        seed in any::<u64>(),
    ) {
        let mut graph = DualGraph::new(GraphConfig::default().with_seed(seed));
        graph.add_nodes(nodes).unwrap();
        graph.build_knn_edges(Layer::Text, 3, EdgeType::TextSim).unwrap();
        graph.build_knn_edges(Layer::Expression, 3, EdgeType::ExprSyn).unwrap();

        let params = WalkParams { num_walks, walk_length, ..WalkParams::default() };
        let walks = graph.sample_walks(&params).unwrap();
        prop_assert_eq!(walks.len(), num_walks);
        for walk in &walks {
            prop_assert!(!walk.is_empty());
            prop_assert!(walk.len() <= walk_length);
            prop_assert!(walk.iter().all(|id| graph.contains(id)));
        }
    }

    #[test]
    fn prop_capacity_failure_is_atomic(
        existing in 0usize..10,
        extra in 1usize..10,
        cap in 1usize..15,
    ) {
        let mut graph = DualGraph::new(GraphConfig::default().with_max_nodes(cap));
        let first = existing.min(cap);
        graph.add_nodes((0..first).map(|i| Node::text(format!("a{i}"), vec![1.0]))).unwrap();

        let result = graph.add_nodes((0..extra).map(|i| Node::text(format!("b{i}"), vec![1.0])));
        if first + extra > cap {
            let is_capacity_error = matches!(result, Err(Error::CapacityExceeded { .. }));
            prop_assert!(is_capacity_error);
            prop_assert_eq!(graph.node_count(), first);
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(graph.node_count(), first + extra);
        }
    }

    #[test]
    fn prop_quantile_monotone_and_bounded(
        values in prop::collection::vec(-1e6f64..1e6, 1..500),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let mut estimator = QuantileEstimator::new();
        for &v in &values {
            estimator.update(v);
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let q_lo = estimator.quantile(lo).unwrap();
        let q_hi = estimator.quantile(hi).unwrap();
        prop_assert!(q_lo <= q_hi);
        prop_assert!(q_lo >= estimator.min().unwrap() && q_hi <= estimator.max().unwrap());
    }
}
