//! Dense retrieval over a built graph.
//!
//! The index is a fused embedding table: every text node, then every
//! expression node, each in registry order. Queries are scored by raw inner
//! product, so callers wanting cosine ranking pass normalized vectors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::graph::DualGraph;
use crate::model::Layer;
use crate::providers::EmbeddingProvider;
use crate::{Error, Result};

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub node_id: String,
    /// Inner product with the query.
    pub score: f64,
    pub layer: Layer,
    /// Source text from node metadata, when present.
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
struct Row {
    node_id: String,
    layer: Layer,
    text: Option<String>,
}

/// Read-only snapshot of node embeddings for top-k search.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    rows: Vec<Row>,
    /// Row-major, `rows.len() × dimension`.
    matrix: Vec<f32>,
    dimension: usize,
}

impl EmbeddingIndex {
    pub fn from_graph(graph: &DualGraph) -> Self {
        let dimension = graph.dimension().unwrap_or(0);
        let mut rows = Vec::with_capacity(graph.node_count());
        let mut matrix = Vec::with_capacity(graph.node_count() * dimension);
        for layer in Layer::ALL {
            for node in graph.nodes_in_layer(layer) {
                rows.push(Row {
                    node_id: node.id.clone(),
                    layer,
                    text: node.source_text().map(str::to_string),
                });
                matrix.extend_from_slice(&node.embedding);
            }
        }
        debug!(rows = rows.len(), dimension, "indexed graph embeddings");
        Self { rows, matrix, dimension }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Node ids in row order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.node_id.as_str())
    }

    /// Top `top_k` rows by inner product, best first. Equal scores keep row
    /// order. An empty index returns no hits for any query.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<RetrievedItem>> {
        if self.rows.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                id: "query".into(),
                expected: self.dimension,
                got: query.len(),
            });
        }

        let mut scored: Vec<(usize, f64)> = self
            .matrix
            .chunks_exact(self.dimension)
            .map(|row| row.iter().zip(query).map(|(a, b)| *a as f64 * *b as f64).sum::<f64>())
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let row = &self.rows[i];
                RetrievedItem {
                    node_id: row.node_id.clone(),
                    score,
                    layer: row.layer,
                    text: row.text.clone(),
                }
            })
            .collect())
    }

    /// [`search`](Self::search) with `config.top_k`.
    pub fn search_with(&self, query: &[f32], config: &RetrievalConfig) -> Result<Vec<RetrievedItem>> {
        self.search(query, config.top_k)
    }

    /// Embed `query` with `encoder`, then [`search`](Self::search).
    pub fn search_text(
        &self,
        encoder: &dyn EmbeddingProvider,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedItem>> {
        let vector = encoder
            .encode(&[query], 1)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding(format!("{} returned no vector for the query", encoder.model_name())))?;
        self.search(&vector, top_k)
    }
}
