//! Same-layer k-nearest-neighbor edge construction.
//!
//! Exact top-k by cosine similarity. Embeddings are L2-normalized once per
//! call (in f64), then each member is compared against every other member of
//! the layer. A production-scale store would swap this for an ANN index; the
//! contract stays "top-k by true cosine within the layer".

use tracing::info;

use crate::model::{Edge, EdgeType, Layer, NodeHandle};
use crate::{Error, Result};
use super::DualGraph;

/// L2-normalize into f64. A zero vector stays zero.
pub fn l2_normalized(v: &[f32]) -> Vec<f64> {
    let norm = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return vec![0.0; v.len()];
    }
    v.iter().map(|&x| x as f64 / norm).collect()
}

/// Cosine similarity in `[-1, 1]`; 0 when either side is a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    dot(&l2_normalized(a), &l2_normalized(b))
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl DualGraph {
    /// For every node in `layer`, add up to `k` outgoing `edge_type` edges to
    /// its most similar same-layer neighbors, excluding itself.
    ///
    /// Ties keep registry (insertion) order. Weight is the cosine similarity,
    /// clamped on insert, so anti-correlated neighbors get weight 0.
    /// Returns the number of edges added.
    pub fn build_knn_edges(&mut self, layer: Layer, k: usize, edge_type: EdgeType) -> Result<usize> {
        if edge_type.is_structural() {
            return Err(Error::UnsupportedEdgeType(format!(
                "{edge_type} is structural and cannot carry similarity"
            )));
        }

        let members: Vec<NodeHandle> = self
            .node_slice()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.layer == layer)
            .map(|(i, _)| NodeHandle(i as u32))
            .collect();
        if k == 0 || members.len() < 2 {
            return Ok(0);
        }

        let normalized: Vec<Vec<f64>> = members
            .iter()
            .map(|h| l2_normalized(&self.node_slice()[h.index()].embedding))
            .collect();

        let mut pending = Vec::with_capacity(members.len() * k.min(members.len() - 1));
        let mut scored: Vec<(usize, f64)> = Vec::with_capacity(members.len());
        for (i, &source) in members.iter().enumerate() {
            scored.clear();
            scored.extend(
                (0..members.len())
                    .filter(|&j| j != i)
                    .map(|j| (j, dot(&normalized[i], &normalized[j]))),
            );
            // Stable sort: equal similarities stay in registry order.
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            pending.extend(
                scored
                    .iter()
                    .take(k)
                    .map(|&(j, sim)| Edge::new(source, members[j], edge_type, sim)),
            );
        }

        let added = pending.len();
        for edge in pending {
            self.push_edge(edge);
        }
        info!(%layer, k, %edge_type, nodes = members.len(), added, "built knn edges");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    #[test]
    fn test_parallel_vectors_give_unit_weight() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![
            Node::text("t0", vec![1.0; 4]),
            Node::text("t1", vec![2.0; 4]),
            Node::text("t2", vec![3.0; 4]),
        ])
        .unwrap();

        let added = g.build_knn_edges(Layer::Text, 2, EdgeType::TextSim).unwrap();
        assert_eq!(added, 6);
        for id in ["t0", "t1", "t2"] {
            let out = g.out_edges(id).unwrap();
            assert_eq!(out.len(), 2);
            assert!(out.iter().all(|e| e.target != id));
            assert!(out.iter().all(|e| e.edge_type == EdgeType::TextSim));
            assert!(out.iter().all(|e| (e.weight - 1.0).abs() < 1e-9));
        }
    }

    #[test]
    fn test_picks_most_similar() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![
            Node::text("a", vec![1.0, 0.0]),
            Node::text("far", vec![0.0, 1.0]),
            Node::text("near", vec![0.9, 0.1]),
        ])
        .unwrap();
        g.build_knn_edges(Layer::Text, 1, EdgeType::TextSim).unwrap();
        let out = g.out_edges("a").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, "near");
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![
            Node::text("q", vec![1.0, 0.0]),
            Node::text("first", vec![0.0, 1.0]),
            Node::text("second", vec![0.0, 2.0]),
        ])
        .unwrap();
        g.build_knn_edges(Layer::Text, 1, EdgeType::TextSim).unwrap();
        assert_eq!(g.out_edges("q").unwrap()[0].target, "first");
    }

    #[test]
    fn test_negative_similarity_clamped_to_zero() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![Node::text("a", vec![1.0, 0.0]), Node::text("b", vec![-1.0, 0.0])])
            .unwrap();
        g.build_knn_edges(Layer::Text, 1, EdgeType::TextSim).unwrap();
        assert_eq!(g.out_edges("a").unwrap()[0].weight, 0.0);
    }

    #[test]
    fn test_never_links_across_layers() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![
            Node::text("t0", vec![1.0, 0.0]),
            Node::text("t1", vec![1.0, 0.1]),
            Node::expression("e0", vec![1.0, 0.0]),
        ])
        .unwrap();
        g.build_knn_edges(Layer::Text, 5, EdgeType::TextSim).unwrap();
        assert_eq!(g.edge_count(), 2);
        assert!(g.edges().all(|e| e.source != "e0" && e.target != "e0"));
        // A single-member layer has nobody to link to.
        assert_eq!(g.build_knn_edges(Layer::Expression, 5, EdgeType::ExprSyn).unwrap(), 0);
    }

    #[test]
    fn test_k_zero_and_anchor_type() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![Node::text("a", vec![1.0]), Node::text("b", vec![1.0])]).unwrap();
        assert_eq!(g.build_knn_edges(Layer::Text, 0, EdgeType::TextSim).unwrap(), 0);
        let err = g.build_knn_edges(Layer::Text, 1, EdgeType::AnchorOccursIn).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEdgeType(_)));
    }

    #[test]
    fn test_cosine_helpers() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(l2_normalized(&[3.0, 4.0]), vec![0.6, 0.8]);
    }
}
