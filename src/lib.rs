//! # symgraph: Dual-Layer Symbolic/Semantic Knowledge Graph
//!
//! Ingests text, detects embedded symbolic expressions, embeds both into a
//! shared vector space, links them with typed edges, prunes weak similarity
//! edges with a streaming quantile threshold, and samples biased random walks
//! for representation learning and retrieval.
//!
//! ## Design Principles
//!
//! 1. **Providers are traits**: embedding, scoring, chunking and expression
//!    extraction are collaborators the caller plugs in
//! 2. **Clean DTOs**: `Node`, `Edge`, `Value` cross all boundaries
//! 3. **Purpose-built store**: node arena + per-node adjacency, string ids
//!    resolved to handles only at the `DualGraph` boundary
//! 4. **Build once, read many**: graphs are rebuilt from scratch, then
//!    consumed read-only by walks and retrieval
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symgraph::{DualGraph, EdgeType, GraphConfig, Layer, Node, WalkParams};
//!
//! # fn example() -> symgraph::Result<()> {
//! let mut graph = DualGraph::new(GraphConfig::default());
//! graph.add_nodes(vec![
//!     Node::text("t0", vec![1.0, 0.0]),
//!     Node::text("t1", vec![0.9, 0.1]),
//!     Node::expression("e0", vec![0.0, 1.0]),
//! ])?;
//! graph.add_edge("e0", "t0", EdgeType::AnchorOccursIn, 1.0)?;
//! graph.build_knn_edges(Layer::Text, 1, EdgeType::TextSim)?;
//! graph.percentile_prune(50.0)?;
//!
//! let walks = graph.sample_walks(&WalkParams::default())?;
//! # let _ = walks;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Layer | Wire name | Similarity edge | Source |
//! |-------|-----------|-----------------|--------|
//! | Text | `text` | `TEXT_SIM` | sentence-merged chunks |
//! | Expression | `expr` | `EXPR_SYN` / `EXPR_FUN` | `$…$`, `\[…\]`, `\(…\)` spans |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod quantile;
pub mod graph;
pub mod providers;
pub mod builder;
pub mod config;
pub mod retrieval;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, NodeHandle, Layer, Edge, EdgeType, EdgeView,
    Value, MetadataMap,
};

// ============================================================================
// Re-exports: Graph store
// ============================================================================

pub use graph::{DualGraph, PruneReport};
pub use graph::snapshot::{GraphSnapshot, SnapshotNode, SnapshotEdge};
pub use graph::walk::{WalkSampler, WalkParams, walks_to_sentences};
pub use quantile::QuantileEstimator;

// ============================================================================
// Re-exports: Providers, builder, configuration
// ============================================================================

pub use providers::{EmbeddingProvider, ScoringProvider, ExpressionExtractor, Chunker};
pub use builder::{GraphBuilder, BuildReport};
pub use config::{SymGraphConfig, GraphConfig, BuilderConfig, ScoringConfig, ScoringMode, RetrievalConfig};
pub use retrieval::{EmbeddingIndex, RetrievedItem};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Capacity exceeded: {current} nodes + {requested} new > max {capacity}")]
    CapacityExceeded { current: usize, requested: usize, capacity: usize },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Unsupported edge type: {0}")]
    UnsupportedEdgeType(String),

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Quantile requested before any observation")]
    EmptyQuantileQuery,

    #[error("Percentile out of range [0, 100]: {0}")]
    InvalidPercentile(f64),

    #[error("Embedding dimension mismatch for {id}: expected {expected}, got {got}")]
    DimensionMismatch { id: String, expected: usize, got: usize },

    #[error("Invalid walk parameters: {0}")]
    InvalidWalkParams(String),

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Scoring provider error: {0}")]
    Scoring(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
