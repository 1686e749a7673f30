//! # Biased Dual-Layer Random Walks
//!
//! node2vec-flavored walks over the typed multi-graph. At each step the
//! current node's outgoing edges are grouped per target (parallel edge
//! weights summed), then biased:
//!
//! | Condition | Factor |
//! |-----------|--------|
//! | target is the previous node (backtrack) | `1 / p` |
//! | target is on the other layer | `layer_switch_prob` |
//! | target is on the same layer | `1 / q` |
//!
//! The backtrack factor stacks with the layer factor.
//!
//! ## Approximation
//!
//! Canonical node2vec keys its transition table on `(previous, current)` and
//! distinguishes "distance 1 from previous" from "distance 2". This sampler
//! only looks at the current node's edges plus the identity of the previous
//! node, and uses `q` as a same-layer damping rather than an in/out
//! distinction. Output distributions therefore differ from reference
//! node2vec; artifacts trained on these walks depend on that, so do not
//! "fix" it to the exact second-order form.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::SymGraphConfig;
use crate::model::NodeHandle;
use crate::{Error, Result};
use super::DualGraph;

/// Floor applied to `p` and `q` before dividing.
const MIN_BIAS: f64 = 1e-3;

/// Walk corpus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkParams {
    pub num_walks: usize,
    /// Maximum nodes per walk, start included.
    pub walk_length: usize,
    /// Return bias: larger discourages backtracking.
    pub p: f64,
    /// Same-layer damping: larger pushes walks off the local layer.
    pub q: f64,
    /// Multiplier on cross-layer transitions.
    pub layer_switch_prob: f64,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            num_walks: 40,
            walk_length: 120,
            p: 0.75,
            q: 1.5,
            layer_switch_prob: 0.15,
        }
    }
}

impl WalkParams {
    pub fn validate(&self) -> Result<()> {
        if self.walk_length == 0 {
            return Err(Error::InvalidWalkParams("walk_length must be at least 1".into()));
        }
        for (name, value) in [("p", self.p), ("q", self.q)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidWalkParams(format!("{name} must be positive, got {value}")));
            }
        }
        if !self.layer_switch_prob.is_finite() || self.layer_switch_prob < 0.0 {
            return Err(Error::InvalidWalkParams(format!(
                "layer_switch_prob must be non-negative, got {}",
                self.layer_switch_prob
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Sampler
// ============================================================================

/// Read-only walk generator over a stable graph.
///
/// Each sampler owns its RNG, so several samplers with different seeds can
/// run over the same `&DualGraph` on different threads.
pub struct WalkSampler<'g> {
    graph: &'g DualGraph,
    rng: StdRng,
}

impl<'g> WalkSampler<'g> {
    pub fn new(graph: &'g DualGraph, seed: u64) -> Self {
        Self::from_rng(graph, StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(graph: &'g DualGraph, rng: StdRng) -> Self {
        Self { graph, rng }
    }

    /// Generate `num_walks` walks, each starting at a uniformly chosen node.
    ///
    /// Empty graph → empty corpus.
    pub fn sample(&mut self, params: &WalkParams) -> Result<Vec<Vec<String>>> {
        params.validate()?;
        let n = self.graph.node_count();
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut walks = Vec::with_capacity(params.num_walks);
        for _ in 0..params.num_walks {
            let start = NodeHandle(self.rng.gen_range(0..n) as u32);
            let walk = self.walk_handles(start, params);
            walks.push(self.to_ids(&walk));
        }
        Ok(walks)
    }

    /// One walk from a named start node.
    pub fn walk_from(&mut self, start: &str, params: &WalkParams) -> Result<Vec<String>> {
        params.validate()?;
        let start = self
            .graph
            .handle(start)
            .ok_or_else(|| Error::UnknownNode(start.to_string()))?;
        let walk = self.walk_handles(start, params);
        Ok(self.to_ids(&walk))
    }

    fn to_ids(&self, walk: &[NodeHandle]) -> Vec<String> {
        walk.iter()
            .map(|&h| self.graph.node_slice()[h.index()].id.clone())
            .collect()
    }

    fn walk_handles(&mut self, start: NodeHandle, params: &WalkParams) -> Vec<NodeHandle> {
        let mut walk = Vec::with_capacity(params.walk_length);
        walk.push(start);
        let mut previous = None;
        let mut current = start;
        while walk.len() < params.walk_length {
            let Some(next) = self.step(current, previous, params) else {
                break;
            };
            walk.push(next);
            previous = Some(current);
            current = next;
        }
        walk
    }

    /// Pick the next node, or `None` when there is no viable transition.
    fn step(
        &mut self,
        current: NodeHandle,
        previous: Option<NodeHandle>,
        params: &WalkParams,
    ) -> Option<NodeHandle> {
        let graph = self.graph;
        let nodes = graph.node_slice();
        let current_layer = nodes[current.index()].layer;

        let mut candidates: SmallVec<[(NodeHandle, f64); 16]> = SmallVec::new();
        for edge in graph.out_edge_records(current) {
            match candidates.iter_mut().find(|(h, _)| *h == edge.target) {
                Some((_, weight)) => *weight += edge.weight,
                None => candidates.push((edge.target, edge.weight)),
            }
        }
        if candidates.is_empty() {
            return None;
        }

        for (candidate, weight) in candidates.iter_mut() {
            if previous == Some(*candidate) {
                *weight /= params.p.max(MIN_BIAS);
            }
            if nodes[candidate.index()].layer != current_layer {
                *weight *= params.layer_switch_prob;
            } else {
                *weight /= params.q.max(MIN_BIAS);
            }
        }

        // All-zero weights: nowhere to go.
        let dist = WeightedIndex::new(candidates.iter().map(|(_, w)| *w)).ok()?;
        Some(candidates[dist.sample(&mut self.rng)].0)
    }
}

impl DualGraph {
    /// Sample a walk corpus seeded from `GraphConfig::seed`.
    pub fn sample_walks(&self, params: &WalkParams) -> Result<Vec<Vec<String>>> {
        WalkSampler::new(self, self.config().seed).sample(params)
    }

    /// Sample with the `walks` section of a full configuration.
    pub fn sample_walks_from(&self, config: &SymGraphConfig) -> Result<Vec<Vec<String>>> {
        self.sample_walks(&config.walks)
    }
}

/// Join each non-empty walk into a whitespace-separated "sentence" for
/// word2vec-style trainers.
pub fn walks_to_sentences(walks: &[Vec<String>]) -> Vec<String> {
    walks.iter().filter(|w| !w.is_empty()).map(|w| w.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeType, Node};

    fn params(num_walks: usize, walk_length: usize) -> WalkParams {
        WalkParams { num_walks, walk_length, p: 1.0, q: 1.0, layer_switch_prob: 0.5 }
    }

    fn two_cycle() -> DualGraph {
        let mut g = DualGraph::default();
        g.add_nodes(vec![Node::text("a", vec![1.0]), Node::text("b", vec![1.0])]).unwrap();
        g.add_edge("a", "b", EdgeType::TextSim, 1.0).unwrap();
        g.add_edge("b", "a", EdgeType::TextSim, 1.0).unwrap();
        g
    }

    #[test]
    fn test_empty_graph_yields_no_walks() {
        let g = DualGraph::default();
        assert!(g.sample_walks(&params(5, 10)).unwrap().is_empty());
    }

    #[test]
    fn test_walk_count_and_length() {
        let g = two_cycle();
        let walks = g.sample_walks(&params(7, 5)).unwrap();
        assert_eq!(walks.len(), 7);
        for walk in &walks {
            assert_eq!(walk.len(), 5);
            for pair in walk.windows(2) {
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_walks_from_full_config() {
        let g = two_cycle();
        let mut config = SymGraphConfig::default();
        config.walks = params(3, 4);
        let walks = g.sample_walks_from(&config).unwrap();
        assert_eq!(walks, g.sample_walks(&params(3, 4)).unwrap());
        assert_eq!(walks.len(), 3);

        config.walks.walk_length = 0;
        assert!(g.sample_walks_from(&config).is_err());
    }

    #[test]
    fn test_dead_end_stops_early() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![Node::text("a", vec![1.0]), Node::text("b", vec![1.0])]).unwrap();
        g.add_edge("a", "b", EdgeType::TextSim, 1.0).unwrap();
        let mut sampler = WalkSampler::new(&g, 1);
        assert_eq!(sampler.walk_from("a", &params(1, 10)).unwrap(), vec!["a", "b"]);
        assert_eq!(sampler.walk_from("b", &params(1, 10)).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_zero_weight_edges_stop_walk() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![Node::text("a", vec![1.0]), Node::text("b", vec![1.0])]).unwrap();
        g.add_edge("a", "b", EdgeType::TextSim, 0.0).unwrap();
        let walk = WalkSampler::new(&g, 3).walk_from("a", &params(1, 4)).unwrap();
        assert_eq!(walk, vec!["a"]);
    }

    #[test]
    fn test_zero_layer_switch_never_crosses() {
        let mut g = DualGraph::default();
        g.add_nodes(vec![
            Node::text("t0", vec![1.0]),
            Node::text("t1", vec![1.0]),
            Node::expression("e0", vec![1.0]),
        ])
        .unwrap();
        g.add_edge("t0", "t1", EdgeType::TextSim, 0.5).unwrap();
        g.add_edge("t1", "t0", EdgeType::TextSim, 0.5).unwrap();
        g.add_edge("t0", "e0", EdgeType::ExprFun, 1.0).unwrap();

        let p = WalkParams { layer_switch_prob: 0.0, ..params(1, 30) };
        let mut sampler = WalkSampler::new(&g, 11);
        for _ in 0..20 {
            let walk = sampler.walk_from("t0", &p).unwrap();
            assert!(!walk.iter().any(|id| id == "e0"));
        }
    }

    #[test]
    fn test_large_p_discourages_backtracking() {
        // star: hub -> {a, b}, a -> hub, b -> hub
        let mut g = DualGraph::default();
        g.add_nodes(vec![
            Node::text("hub", vec![1.0]),
            Node::text("a", vec![1.0]),
            Node::text("b", vec![1.0]),
        ])
        .unwrap();
        for leaf in ["a", "b"] {
            g.add_edge("hub", leaf, EdgeType::TextSim, 1.0).unwrap();
            g.add_edge(leaf, "hub", EdgeType::TextSim, 1.0).unwrap();
        }
        g.add_edge("a", "b", EdgeType::TextSim, 1.0).unwrap();

        // From a (arrived via hub), candidates are hub (backtrack) and b.
        let mut sampler = WalkSampler::new(&g, 5);
        let p = WalkParams { p: 1000.0, ..params(1, 3) };
        let mut backtracks = 0;
        for _ in 0..200 {
            let walk = sampler.walk_from("hub", &p).unwrap();
            if walk[1] == "a" && walk[2] == "hub" {
                backtracks += 1;
            }
        }
        assert!(backtracks < 5, "backtracked {backtracks} times");
    }

    #[test]
    fn test_same_seed_same_corpus() {
        let g = two_cycle();
        let a = WalkSampler::new(&g, 9).sample(&params(10, 6)).unwrap();
        let b = WalkSampler::new(&g, 9).sample(&params(10, 6)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_params() {
        let g = two_cycle();
        assert!(matches!(g.sample_walks(&params(1, 0)), Err(Error::InvalidWalkParams(_))));
        let bad_q = WalkParams { q: 0.0, ..params(1, 3) };
        assert!(matches!(g.sample_walks(&bad_q), Err(Error::InvalidWalkParams(_))));
        let bad_switch = WalkParams { layer_switch_prob: f64::NAN, ..params(1, 3) };
        assert!(matches!(g.sample_walks(&bad_switch), Err(Error::InvalidWalkParams(_))));
    }

    #[test]
    fn test_unknown_start() {
        let g = two_cycle();
        let err = WalkSampler::new(&g, 0).walk_from("zz", &params(1, 3)).unwrap_err();
        assert!(matches!(err, Error::UnknownNode(_)));
    }

    #[test]
    fn test_walks_to_sentences() {
        let walks = vec![vec!["a".to_string(), "b".to_string()], vec![], vec!["c".to_string()]];
        assert_eq!(walks_to_sentences(&walks), vec!["a b", "c"]);
    }
}
