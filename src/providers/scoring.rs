//! Specificity scoring.
//!
//! A node's score is a perplexity-like number: low for predictable text,
//! high for dense or unusual text. Expressions additionally get a structural
//! bonus:
//!
//! ```text
//! score(expr) = base(expr) × (1 + weight × complexity(expr))
//! complexity  = 0.1 · #operators(+ - * / ^ =)
//!             + 0.2 · max bracket depth ( [ {
//!             + 0.05 · #distinct ASCII letters
//! ```
//!
//! | Scorer | Base score |
//! |--------|------------|
//! | `ModelBacked` | `exp(mean token loss)` from a [`LanguageModel`] |
//! | `Heuristic` | `exp(words / 10)` |
//!
//! Blank input scores 1.0 under both.

use std::sync::Arc;

use moka::sync::Cache;
use tracing::debug;

use crate::config::{ScoringConfig, ScoringMode};
use crate::model::Layer;
use crate::{Error, Result};
use super::ScoringProvider;

// ============================================================================
// Perplexity
// ============================================================================

/// A scored payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perplexity {
    pub value: f64,
    /// Tokens the value was computed over (words for the heuristic).
    pub tokens: usize,
}

impl Perplexity {
    const EMPTY: Perplexity = Perplexity { value: 1.0, tokens: 0 };
}

/// A causal language model that can report its mean per-token loss.
///
/// Loading weights is the implementor's job; this crate never does.
pub trait LanguageModel: Send + Sync {
    /// Mean cross-entropy (natural log) over the tokens of `text`, plus the
    /// token count.
    fn mean_token_loss(&self, text: &str) -> Result<(f64, usize)>;
}

// ============================================================================
// Structural complexity
// ============================================================================

/// Operator, nesting and symbol-variety proxy for expression difficulty.
pub fn structural_complexity(expr: &str) -> f64 {
    let mut operators = 0usize;
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut letters = [false; 52];
    for c in expr.chars() {
        match c {
            '+' | '-' | '*' | '/' | '^' | '=' => operators += 1,
            '(' | '[' | '{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            'a'..='z' => letters[(c as u8 - b'a') as usize] = true,
            'A'..='Z' => letters[26 + (c as u8 - b'A') as usize] = true,
            _ => {}
        }
    }
    let symbols = letters.iter().filter(|&&seen| seen).count();
    0.1 * operators as f64 + 0.2 * max_depth as f64 + 0.05 * symbols as f64
}

/// Bounded memo for [`structural_complexity`].
///
/// Backed by a concurrent moka cache, so eviction is size-bounded but lazy:
/// [`len`](Self::len) flushes pending maintenance before counting.
pub struct ComplexityCache {
    capacity: usize,
    inner: Cache<String, f64>,
}

impl ComplexityCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let inner = Cache::builder().max_capacity(capacity as u64).build();
        Self { capacity, inner }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        self.inner.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached complexity of `expr`, computing and inserting it on a miss.
    pub fn get_or_compute(&self, expr: &str) -> f64 {
        self.inner.get_with(expr.to_string(), || structural_complexity(expr))
    }
}

impl std::fmt::Debug for ComplexityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplexityCache")
            .field("capacity", &self.capacity)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

impl Default for ComplexityCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

// ============================================================================
// Scorers
// ============================================================================

/// `exp(words / 10)`. Needs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn perplexity(&self, text: &str) -> Perplexity {
        let words = text.split_whitespace().count();
        if words == 0 {
            return Perplexity::EMPTY;
        }
        Perplexity { value: (words as f64 / 10.0).exp(), tokens: words }
    }
}

/// Perplexity from caller-supplied language models, one per layer.
#[derive(Clone)]
pub struct ModelBackedScorer {
    text_model: Arc<dyn LanguageModel>,
    expr_model: Arc<dyn LanguageModel>,
}

impl ModelBackedScorer {
    /// Use the same model for both layers.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { text_model: model.clone(), expr_model: model }
    }

    pub fn with_expression_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.expr_model = model;
        self
    }

    pub fn perplexity(&self, text: &str, layer: Layer) -> Result<Perplexity> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Perplexity::EMPTY);
        }
        let model = match layer {
            Layer::Text => &self.text_model,
            Layer::Expression => &self.expr_model,
        };
        let (loss, tokens) = model.mean_token_loss(text)?;
        if !loss.is_finite() {
            return Err(Error::Scoring(format!("language model returned non-finite loss {loss}")));
        }
        Ok(Perplexity { value: loss.exp(), tokens })
    }
}

impl std::fmt::Debug for ModelBackedScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBackedScorer").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum Backend {
    ModelBacked(ModelBackedScorer),
    Heuristic(HeuristicScorer),
}

/// The configured scorer: one backend plus the expression bonus.
#[derive(Debug, Clone)]
pub struct SpecificityScorer {
    backend: Backend,
    expr_structural_weight: f64,
    cache: Arc<ComplexityCache>,
}

impl SpecificityScorer {
    pub fn heuristic() -> Self {
        Self {
            backend: Backend::Heuristic(HeuristicScorer),
            expr_structural_weight: 0.25,
            cache: Arc::new(ComplexityCache::default()),
        }
    }

    pub fn model_backed(scorer: ModelBackedScorer) -> Self {
        Self { backend: Backend::ModelBacked(scorer), ..Self::heuristic() }
    }

    /// Build the scorer `config.mode` names. `Model` mode without a model is
    /// a configuration error; there is no silent downgrade.
    pub fn from_config(config: &ScoringConfig, model: Option<Arc<dyn LanguageModel>>) -> Result<Self> {
        let backend = match (config.mode, model) {
            (ScoringMode::Model, Some(model)) => Backend::ModelBacked(ModelBackedScorer::new(model)),
            (ScoringMode::Model, None) => {
                return Err(Error::InvalidConfig(
                    "scoring.mode is \"model\" but no language model was supplied".into(),
                ));
            }
            (ScoringMode::Heuristic, _) => Backend::Heuristic(HeuristicScorer),
        };
        debug!(mode = ?config.mode, cache_capacity = config.cache_capacity, "configured specificity scorer");
        Ok(Self {
            backend,
            expr_structural_weight: config.expr_structural_weight,
            cache: Arc::new(ComplexityCache::new(config.cache_capacity)),
        })
    }

    pub fn with_structural_weight(mut self, weight: f64) -> Self {
        self.expr_structural_weight = weight;
        self
    }

    /// Share an existing cache (e.g. across scorers for the same corpus).
    pub fn with_cache(mut self, cache: Arc<ComplexityCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ComplexityCache {
        &self.cache
    }

    pub fn is_model_backed(&self) -> bool {
        matches!(self.backend, Backend::ModelBacked(_))
    }

    pub fn perplexity(&self, text: &str, layer: Layer) -> Result<Perplexity> {
        let base = match &self.backend {
            Backend::ModelBacked(scorer) => scorer.perplexity(text, layer)?,
            Backend::Heuristic(scorer) => scorer.perplexity(text),
        };
        match layer {
            Layer::Text => Ok(base),
            Layer::Expression => {
                let bonus = 1.0 + self.expr_structural_weight * self.cache.get_or_compute(text);
                Ok(Perplexity { value: base.value * bonus, tokens: base.tokens })
            }
        }
    }
}

impl ScoringProvider for SpecificityScorer {
    fn score(&self, text: &str, layer: Layer) -> Result<f64> {
        Ok(self.perplexity(text, layer)?.value)
    }
}
