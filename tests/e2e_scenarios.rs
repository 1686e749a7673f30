//! End-to-end scenarios over the graph store: KNN, anchors, pruning, walks.
//!
//! Each test builds a small graph by hand through the public API and checks
//! the observable edge set afterwards.

use symgraph::{DualGraph, EdgeType, Error, GraphConfig, Layer, Node, WalkParams, WalkSampler};

// ============================================================================
// Helper: three parallel text vectors plus one anchored expression.
// ============================================================================

fn parallel_text_graph() -> DualGraph {
    let mut graph = DualGraph::default();
    graph
        .add_nodes(vec![
            Node::text("t0", vec![1.0, 1.0, 1.0, 1.0]),
            Node::text("t1", vec![2.0, 2.0, 2.0, 2.0]),
            Node::text("t2", vec![3.0, 3.0, 3.0, 3.0]),
        ])
        .unwrap();
    graph
}

// ============================================================================
// 1. KNN over parallel vectors
// ============================================================================

#[test]
fn test_knn_parallel_vectors() {
    let mut graph = parallel_text_graph();
    let added = graph.build_knn_edges(Layer::Text, 2, EdgeType::TextSim).unwrap();
    assert_eq!(added, 6);

    for id in ["t0", "t1", "t2"] {
        let out = graph.out_edges(id).unwrap();
        assert_eq!(out.len(), 2, "node {id}");
        for edge in out {
            assert_eq!(edge.edge_type, EdgeType::TextSim);
            assert_ne!(edge.target, id);
            assert!((edge.weight - 1.0).abs() < 1e-9);
        }
    }
}

// ============================================================================
// 2. Anchor survives a maximal prune
// ============================================================================

#[test]
fn test_anchor_survives_prune_at_maximum() {
    let mut graph = DualGraph::default();
    graph
        .add_nodes(vec![
            Node::text("t0", vec![1.0, 0.0]),
            Node::text("t1", vec![0.8, 0.6]),
            Node::text("t2", vec![0.0, 1.0]),
            Node::expression("e0", vec![0.5, 0.5]),
        ])
        .unwrap();
    graph.add_edge("e0", "t0", EdgeType::AnchorOccursIn, 1.0).unwrap();
    graph.add_edge("t0", "t1", EdgeType::TextSim, 0.8).unwrap();
    graph.add_edge("t1", "t2", EdgeType::TextSim, 0.6).unwrap();
    graph.add_edge("t2", "t0", EdgeType::TextSim, 0.1).unwrap();

    let report = graph.percentile_prune(100.0).unwrap();
    assert_eq!(report.considered, 3);
    assert_eq!(report.threshold, Some(0.8));

    // The 100th percentile is the maximum weight and pruning drops only
    // edges strictly below the threshold (`weight < 0.8`), so the 0.8 edge stays.
    let remaining: Vec<f64> = graph
        .edges()
        .filter(|e| e.edge_type == EdgeType::TextSim)
        .map(|e| e.weight)
        .collect();
    assert_eq!(remaining, vec![0.8]);

    let anchor = graph.out_edges("e0").unwrap();
    assert_eq!(anchor.len(), 1);
    assert_eq!(anchor[0].target, "t0");
    assert_eq!(anchor[0].edge_type, EdgeType::AnchorOccursIn);
    assert_eq!(anchor[0].weight, 1.0);
}

// ============================================================================
// 3. Full pipeline on a hand-built dual-layer graph
// ============================================================================

#[test]
fn test_knn_prune_walk_pipeline() {
    let mut graph = DualGraph::new(GraphConfig::default().with_seed(7));
    graph
        .add_nodes(vec![
            Node::text("t0", vec![1.0, 0.0, 0.0]),
            Node::text("t1", vec![0.9, 0.1, 0.0]),
            Node::text("t2", vec![0.0, 1.0, 0.0]),
            Node::expression("e0", vec![0.0, 0.0, 1.0]),
            Node::expression("e1", vec![0.1, 0.0, 0.9]),
        ])
        .unwrap();
    graph.add_edge("e0", "t0", EdgeType::AnchorOccursIn, 1.0).unwrap();
    graph.add_edge("e1", "t2", EdgeType::AnchorOccursIn, 1.0).unwrap();
    graph.build_knn_edges(Layer::Text, 2, EdgeType::TextSim).unwrap();
    graph.build_knn_edges(Layer::Expression, 1, EdgeType::ExprSyn).unwrap();
    graph.percentile_prune(50.0).unwrap();

    assert_eq!(graph.count_edges_of(EdgeType::AnchorOccursIn), 2);
    assert!(graph.edges().all(|e| {
        let (s, t) = (graph.node(e.source).unwrap(), graph.node(e.target).unwrap());
        e.edge_type == EdgeType::AnchorOccursIn || s.layer == t.layer
    }));

    let params = WalkParams { num_walks: 12, walk_length: 6, ..WalkParams::default() };
    let walks = graph.sample_walks(&params).unwrap();
    assert_eq!(walks.len(), 12);
    for walk in &walks {
        assert!(!walk.is_empty() && walk.len() <= 6);
        assert!(walk.iter().all(|id| graph.contains(id)));
    }

    // Same seed, same corpus.
    assert_eq!(graph.sample_walks(&params).unwrap(), walks);
    let mut other = WalkSampler::new(&graph, 7);
    assert_eq!(other.sample(&params).unwrap(), walks);
}

// ============================================================================
// 4. Error paths
// ============================================================================

#[test]
fn test_failed_batches_leave_graph_untouched() {
    let mut graph = DualGraph::new(GraphConfig::default().with_max_nodes(4));
    graph.add_nodes(vec![Node::text("a", vec![1.0]), Node::text("b", vec![1.0])]).unwrap();

    let err = graph
        .add_nodes(vec![Node::text("c", vec![1.0]), Node::text("a", vec![1.0])])
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateNode(id) if id == "a"));
    assert_eq!(graph.node_count(), 2);
    assert!(!graph.contains("c"));

    let err = graph
        .add_nodes((0..3).map(|i| Node::text(format!("n{i}"), vec![1.0])))
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { current: 2, requested: 3, capacity: 4 }));
    assert_eq!(graph.node_count(), 2);

    let err = graph.add_edge("a", "ghost", EdgeType::TextSim, 0.5).unwrap_err();
    assert!(matches!(err, Error::UnknownNode(id) if id == "ghost"));
    let err = graph.add_edge_named("a", "b", "FOLLOWS", 0.5).unwrap_err();
    assert!(matches!(err, Error::UnsupportedEdgeType(_)));
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_invalid_walk_params() {
    let graph = parallel_text_graph();
    let bad = WalkParams { walk_length: 0, ..WalkParams::default() };
    assert!(matches!(graph.sample_walks(&bad), Err(Error::InvalidWalkParams(_))));
    let bad = WalkParams { q: -1.0, ..WalkParams::default() };
    assert!(matches!(graph.sample_walks(&bad), Err(Error::InvalidWalkParams(_))));
}
