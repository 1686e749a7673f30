//! # Provider Traits
//!
//! Collaborators the graph builder calls out to. The graph store itself never
//! touches them.
//!
//! ```text
//! EmbeddingProvider (trait)
//! ├── encode(&[&str], batch_size) -> Vec<Vec<f32>>   // one row per input
//! └── dimension() -> usize                           // fixed per instance
//!
//! ScoringProvider (trait)                            // optional
//! └── score(&str, Layer) -> f64                      // perplexity / specificity
//!     └── SpecificityScorer { ModelBacked | Heuristic }
//!
//! ExpressionExtractor (trait)   ── LatexExpressionExtractor
//! Chunker (trait)               ── SentenceChunker
//! ```
//!
//! All calls are synchronous. Timeouts, retries and cancellation are the
//! provider's own business.

pub mod scoring;
pub mod text;

use std::sync::Arc;

use crate::model::Layer;
use crate::Result;

pub use scoring::{
    ComplexityCache, HeuristicScorer, LanguageModel, ModelBackedScorer, Perplexity,
    SpecificityScorer, structural_complexity,
};
pub use text::{LatexExpressionExtractor, SentenceChunker};

/// Turns strings into fixed-dimension vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Encode `texts`, returning exactly one vector per input, in order.
    ///
    /// `batch_size` is a throughput hint; implementations may ignore it.
    fn encode(&self, texts: &[&str], batch_size: usize) -> Result<Vec<Vec<f32>>>;

    /// Output dimension. Constant for the lifetime of the provider.
    fn dimension(&self) -> usize;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str {
        "unnamed"
    }
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    fn encode(&self, texts: &[&str], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        (**self).encode(texts, batch_size)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Assigns a specificity score (perplexity) to a node's source text.
pub trait ScoringProvider: Send + Sync {
    fn score(&self, text: &str, layer: Layer) -> Result<f64>;
}

/// Finds symbolic expression spans inside a text. Pure.
pub trait ExpressionExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<String>;
}

/// Splits a document into text chunks. Pure.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
