//! # Dual-Layer Graph Store
//!
//! The typed multi-graph that everything else works with.
//!
//! ## Layout
//!
//! ```text
//! index:     "text_0_1" ──► NodeHandle(1)      (string ids live at the boundary)
//! nodes:     [Node; n]                         (arena, insertion order)
//! edges:     [Edge; m]                         (source/target are handles)
//! adjacency: [SmallVec<edge slot>; n]          (outgoing only)
//! ```
//!
//! Parallel edges between the same ordered pair are kept, including edges of
//! the same type. Iteration over nodes is always insertion order, which makes
//! KNN tie-breaking and walk start selection reproducible.
//!
//! ## Limitations
//!
//! - **No removal of nodes**: graphs are rebuilt, not edited.
//! - **Single writer**: no interior locking. Share `&DualGraph` across threads
//!   for read-only work (walks, retrieval), never mutate concurrently.
//! - **Exact KNN**: `build_knn_edges` is O(n²) per layer.

pub mod knn;
pub mod prune;
pub mod walk;
pub mod snapshot;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::GraphConfig;
use crate::model::*;
use crate::{Error, Result};

pub use prune::PruneReport;

type EdgeSlots = SmallVec<[usize; 8]>;

// ============================================================================
// DualGraph
// ============================================================================

/// In-memory dual-layer (text / expression) knowledge graph.
#[derive(Debug, Clone)]
pub struct DualGraph {
    config: GraphConfig,
    nodes: Vec<Node>,
    index: HashMap<String, NodeHandle>,
    edges: Vec<Edge>,
    /// handle → outgoing edge slots
    adjacency: Vec<EdgeSlots>,
    /// Fixed by the first inserted node.
    dimension: Option<usize>,
}

impl Default for DualGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl DualGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            dimension: None,
        }
    }

    /// Default configuration with a custom node cap.
    pub fn with_capacity(max_nodes: usize) -> Self {
        Self::new(GraphConfig::default().with_max_nodes(max_nodes))
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Maximum number of nodes this graph accepts.
    pub fn capacity(&self) -> usize {
        self.config.max_nodes.min(u32::MAX as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Shared embedding dimension, once any node is registered.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    // ========================================================================
    // Node registry
    // ========================================================================

    /// Register a batch of nodes.
    ///
    /// All-or-nothing: capacity, id uniqueness (against the graph and within
    /// the batch) and embedding dimension are checked before anything is
    /// inserted.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> Result<()> {
        let batch: Vec<Node> = nodes.into_iter().collect();
        if batch.is_empty() {
            return Ok(());
        }

        if self.nodes.len() + batch.len() > self.capacity() {
            return Err(Error::CapacityExceeded {
                current: self.nodes.len(),
                requested: batch.len(),
                capacity: self.capacity(),
            });
        }

        {
            // `seen` borrows `batch`; it must be gone before the batch is consumed.
            let mut seen: HashSet<&str> = HashSet::with_capacity(batch.len());
            for node in &batch {
                if self.index.contains_key(node.id.as_str()) || !seen.insert(node.id.as_str()) {
                    return Err(Error::DuplicateNode(node.id.clone()));
                }
            }
        }

        let expected = self.dimension.unwrap_or(batch[0].embedding.len());
        for node in &batch {
            if expected == 0 || node.embedding.len() != expected {
                return Err(Error::DimensionMismatch {
                    id: node.id.clone(),
                    expected,
                    got: node.embedding.len(),
                });
            }
        }

        debug!(count = batch.len(), total = self.nodes.len() + batch.len(), "registering nodes");
        self.dimension = Some(expected);
        for node in batch {
            let handle = NodeHandle(self.nodes.len() as u32);
            self.index.insert(node.id.clone(), handle);
            self.nodes.push(node);
            self.adjacency.push(EdgeSlots::new());
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn handle(&self, id: &str) -> Option<NodeHandle> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.handle(id).map(|h| &self.nodes[h.index()])
    }

    /// Resolve a handle issued by this graph.
    pub fn node_at(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle.index())
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn nodes_in_layer(&self, layer: Layer) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.layer == layer)
    }

    pub fn count_in_layer(&self, layer: Layer) -> usize {
        self.nodes_in_layer(layer).count()
    }

    /// Node totals per layer, every layer present (possibly 0).
    pub fn layer_counts(&self) -> [(Layer, usize); 2] {
        Layer::ALL.map(|layer| (layer, self.count_in_layer(layer)))
    }

    fn resolve(&self, id: &str) -> Result<NodeHandle> {
        self.handle(id).ok_or_else(|| Error::UnknownNode(id.to_string()))
    }

    // ========================================================================
    // Edge registry
    // ========================================================================

    /// Insert one directed typed edge. The weight is clamped into `[0, 1]`.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        edge_type: EdgeType,
        weight: f64,
    ) -> Result<()> {
        let src = self.resolve(source)?;
        let dst = self.resolve(target)?;
        self.push_edge(Edge::new(src, dst, edge_type, weight));
        Ok(())
    }

    /// Like [`add_edge`](Self::add_edge) with the type given by wire name
    /// (`"TEXT_SIM"`, `"ANCHOR_OCCURS_IN"`, ...).
    pub fn add_edge_named(
        &mut self,
        source: &str,
        target: &str,
        edge_type: &str,
        weight: f64,
    ) -> Result<()> {
        let edge_type: EdgeType = edge_type.parse()?;
        self.add_edge(source, target, edge_type, weight)
    }

    pub(crate) fn push_edge(&mut self, edge: Edge) {
        let slot = self.edges.len();
        self.adjacency[edge.source.index()].push(slot);
        self.edges.push(edge);
    }

    /// Keep only the edges matching `keep`; returns how many were dropped.
    pub(crate) fn retain_edges(&mut self, mut keep: impl FnMut(&Edge) -> bool) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| keep(e));
        for slots in &mut self.adjacency {
            slots.clear();
        }
        for (slot, edge) in self.edges.iter().enumerate() {
            self.adjacency[edge.source.index()].push(slot);
        }
        before - self.edges.len()
    }

    fn view(&self, edge: &Edge) -> EdgeView<'_> {
        EdgeView {
            source: &self.nodes[edge.source.index()].id,
            target: &self.nodes[edge.target.index()].id,
            edge_type: edge.edge_type,
            weight: edge.weight,
        }
    }

    /// All edges, resolved to node ids.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.edges.iter().map(|e| self.view(e))
    }

    /// Outgoing edges of `id` in insertion order.
    pub fn out_edges(&self, id: &str) -> Result<Vec<EdgeView<'_>>> {
        let handle = self.resolve(id)?;
        Ok(self.out_edge_records(handle).map(|e| self.view(e)).collect())
    }

    pub(crate) fn out_edge_records(&self, handle: NodeHandle) -> impl Iterator<Item = &Edge> {
        self.adjacency[handle.index()].iter().map(|&slot| &self.edges[slot])
    }

    pub(crate) fn edge_records(&self) -> &[Edge] {
        &self.edges
    }

    pub(crate) fn node_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn count_edges_of(&self, edge_type: EdgeType) -> usize {
        self.edges.iter().filter(|e| e.edge_type == edge_type).count()
    }

    /// Edge totals per type; types with no edges are omitted.
    pub fn edge_type_counts(&self) -> HashMap<EdgeType, usize> {
        let mut counts = HashMap::new();
        for edge in &self.edges {
            *counts.entry(edge.edge_type).or_insert(0) += 1;
        }
        counts
    }
}

// ============================================================================
// Tests
// ============================================================================
