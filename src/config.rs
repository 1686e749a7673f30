//! Configuration.
//!
//! Every section defaults independently, so a partial JSON document only
//! overrides the keys it names:
//!
//! ```json
//! { "graph": { "knn_k": 16 }, "walks": { "walk_length": 40 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::walk::WalkParams;
use crate::model::EdgeType;
use crate::{Error, Result};

// ============================================================================
// Sections
// ============================================================================

/// Graph store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Hard cap on node count.
    pub max_nodes: usize,
    /// Neighbors per node for same-layer similarity edges.
    pub knn_k: usize,
    /// Pruning percentile in `[0, 100]`.
    pub percentile: f64,
    /// Seed for walk sampling.
    pub seed: u64,
    /// Similarity edge type used inside the expression layer.
    pub expr_edge_type: EdgeType,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1_000_000,
            knn_k: 64,
            percentile: 95.0,
            seed: 42,
            expr_edge_type: EdgeType::ExprSyn,
        }
    }
}

impl GraphConfig {
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_nodes == 0 {
            return Err(Error::InvalidConfig("graph.max_nodes must be positive".into()));
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(Error::InvalidConfig(format!(
                "graph.percentile must be within [0, 100], got {}",
                self.percentile
            )));
        }
        if !matches!(self.expr_edge_type, EdgeType::ExprSyn | EdgeType::ExprFun) {
            return Err(Error::InvalidConfig(format!(
                "graph.expr_edge_type must be EXPR_SYN or EXPR_FUN, got {}",
                self.expr_edge_type
            )));
        }
        Ok(())
    }
}

/// Graph builder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Whitespace-token budget per text chunk.
    pub max_chunk_tokens: usize,
    /// Batch size handed to embedding providers.
    pub batch_size: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self { max_chunk_tokens: 128, batch_size: 16 }
    }
}

/// Which specificity scorer to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Perplexity from a caller-supplied language model.
    Model,
    /// Length-based estimate, no model required.
    Heuristic,
}

/// Specificity scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// When false, nodes are inserted without a score.
    pub enabled: bool,
    pub mode: ScoringMode,
    /// Multiplier on structural complexity for expression scores.
    pub expr_structural_weight: f64,
    /// Entries kept by the structural-complexity cache.
    pub cache_capacity: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ScoringMode::Model,
            expr_structural_weight: 0.25,
            cache_capacity: 4096,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

// ============================================================================
// Top-level
// ============================================================================

/// All settings for one graph build and its consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymGraphConfig {
    pub graph: GraphConfig,
    pub walks: WalkParams,
    pub builder: BuilderConfig,
    pub scoring: ScoringConfig,
    pub retrieval: RetrievalConfig,
}

impl SymGraphConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SymGraphConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        self.walks
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("walks: {e}")))?;
        if self.builder.max_chunk_tokens == 0 {
            return Err(Error::InvalidConfig("builder.max_chunk_tokens must be positive".into()));
        }
        if self.builder.batch_size == 0 {
            return Err(Error::InvalidConfig("builder.batch_size must be positive".into()));
        }
        let weight = self.scoring.expr_structural_weight;
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "scoring.expr_structural_weight must be a non-negative number, got {weight}"
            )));
        }
        if self.scoring.cache_capacity == 0 {
            return Err(Error::InvalidConfig("scoring.cache_capacity must be positive".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be positive".into()));
        }
        Ok(())
    }
}
