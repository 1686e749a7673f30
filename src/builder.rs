//! # Graph Builder
//!
//! Documents in, populated and pruned [`DualGraph`] out.
//!
//! ```text
//! doc ─► Chunker ─► chunks ─► text provider ─► text_{d}_{c}
//!                     │                             ▲
//!                     └─► ExpressionExtractor        │ ANCHOR_OCCURS_IN (1.0)
//!                           └─► expr provider ─► expr_{d}_{c}_{i}
//!
//! then: add_nodes(text ++ expr) → anchor edges → KNN per layer → prune
//! ```
//!
//! Embedding failures abort the build. Scoring failures only cost the node
//! its score.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{BuilderConfig, GraphConfig, SymGraphConfig};
use crate::graph::{DualGraph, PruneReport};
use crate::model::*;
use crate::providers::{
    Chunker, EmbeddingProvider, ExpressionExtractor, LanguageModel, LatexExpressionExtractor,
    ScoringProvider, SentenceChunker, SpecificityScorer,
};
use crate::{Error, Result};

/// Counters from one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub documents: usize,
    /// Blank documents or documents that produced no chunks.
    pub skipped_documents: usize,
    pub text_nodes: usize,
    pub expr_nodes: usize,
    pub anchor_edges: usize,
    /// Similarity edges added before pruning.
    pub text_sim_edges: usize,
    pub expr_sim_edges: usize,
    /// Nodes whose scorer failed.
    pub unscored_nodes: usize,
    pub prune: Option<PruneReport>,
}

/// Assembles a [`DualGraph`] from raw documents through pluggable providers.
pub struct GraphBuilder {
    text_encoder: Arc<dyn EmbeddingProvider>,
    expr_encoder: Arc<dyn EmbeddingProvider>,
    scorer: Option<Arc<dyn ScoringProvider>>,
    chunker: Box<dyn Chunker>,
    extractor: Box<dyn ExpressionExtractor>,
    graph_config: GraphConfig,
    builder_config: BuilderConfig,
}

impl GraphBuilder {
    /// Default chunker, extractor and settings; no scoring.
    pub fn new(text_encoder: Arc<dyn EmbeddingProvider>, expr_encoder: Arc<dyn EmbeddingProvider>) -> Self {
        let builder_config = BuilderConfig::default();
        Self {
            text_encoder,
            expr_encoder,
            scorer: None,
            chunker: Box::new(SentenceChunker::new(builder_config.max_chunk_tokens)),
            extractor: Box::new(LatexExpressionExtractor::new()),
            graph_config: GraphConfig::default(),
            builder_config,
        }
    }

    /// Wire everything from a validated configuration. A scorer is built
    /// when `scoring.enabled`; `model` is only consulted in model mode.
    pub fn from_config(
        config: &SymGraphConfig,
        text_encoder: Arc<dyn EmbeddingProvider>,
        expr_encoder: Arc<dyn EmbeddingProvider>,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> Result<Self> {
        config.validate()?;
        let scorer: Option<Arc<dyn ScoringProvider>> = if config.scoring.enabled {
            Some(Arc::new(SpecificityScorer::from_config(&config.scoring, model)?))
        } else {
            None
        };
        Ok(Self {
            scorer,
            chunker: Box::new(SentenceChunker::new(config.builder.max_chunk_tokens)),
            graph_config: config.graph.clone(),
            builder_config: config.builder.clone(),
            ..Self::new(text_encoder, expr_encoder)
        })
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ScoringProvider>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn without_scorer(mut self) -> Self {
        self.scorer = None;
        self
    }

    pub fn with_chunker(mut self, chunker: impl Chunker + 'static) -> Self {
        self.chunker = Box::new(chunker);
        self
    }

    pub fn with_extractor(mut self, extractor: impl ExpressionExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_graph_config(mut self, config: GraphConfig) -> Self {
        self.graph_config = config;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.builder_config.batch_size = batch_size.max(1);
        self
    }

    pub fn graph_config(&self) -> &GraphConfig {
        &self.graph_config
    }

    pub fn build<I, S>(&self, documents: I) -> Result<DualGraph>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.build_with_report(documents).map(|(graph, _)| graph)
    }

    pub fn build_with_report<I, S>(&self, documents: I) -> Result<(DualGraph, BuildReport)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.graph_config.validate()?;
        let (text_dim, expr_dim) = (self.text_encoder.dimension(), self.expr_encoder.dimension());
        if text_dim != expr_dim {
            return Err(Error::InvalidConfig(format!(
                "text provider {} emits {text_dim} dimensions but expression provider {} emits {expr_dim}",
                self.text_encoder.model_name(),
                self.expr_encoder.model_name(),
            )));
        }

        let mut report = BuildReport::default();
        let mut text_nodes: Vec<Node> = Vec::new();
        let mut expr_nodes: Vec<Node> = Vec::new();
        let mut anchors: Vec<(String, String)> = Vec::new();

        for (doc_idx, doc) in documents.into_iter().enumerate() {
            report.documents += 1;
            let doc = doc.as_ref();
            let chunks = if doc.trim().is_empty() { Vec::new() } else { self.chunker.chunk(doc) };
            if chunks.is_empty() {
                debug!(doc_idx, "skipping document with no chunks");
                report.skipped_documents += 1;
                continue;
            }

            let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let vectors = self.embed(self.text_encoder.as_ref(), &chunk_refs)?;

            let mut doc_exprs: Vec<(usize, usize, String)> = Vec::new();
            for (chunk_idx, (chunk, embedding)) in chunks.iter().zip(vectors).enumerate() {
                let id = format!("text_{doc_idx}_{chunk_idx}");
                let mut node = Node::text(id, embedding)
                    .with_metadata(META_DOC_IDX, doc_idx)
                    .with_metadata(META_CHUNK_IDX, chunk_idx)
                    .with_metadata(META_TEXT, chunk.as_str());
                node.score = self.score(&node.id, chunk, Layer::Text, &mut report);
                text_nodes.push(node);

                doc_exprs.extend(
                    self.extractor
                        .extract(chunk)
                        .into_iter()
                        .enumerate()
                        .map(|(expr_idx, expr)| (chunk_idx, expr_idx, expr)),
                );
            }

            if doc_exprs.is_empty() {
                continue;
            }
            let expr_refs: Vec<&str> = doc_exprs.iter().map(|(_, _, e)| e.as_str()).collect();
            let vectors = self.embed(self.expr_encoder.as_ref(), &expr_refs)?;
            for ((chunk_idx, expr_idx, expr), embedding) in doc_exprs.into_iter().zip(vectors) {
                let anchor = format!("text_{doc_idx}_{chunk_idx}");
                let id = format!("expr_{doc_idx}_{chunk_idx}_{expr_idx}");
                let score = self.score(&id, &expr, Layer::Expression, &mut report);
                let mut node = Node::expression(id.clone(), embedding)
                    .with_metadata(META_DOC_IDX, doc_idx)
                    .with_metadata(META_CHUNK_IDX, chunk_idx)
                    .with_metadata(META_TEXT, expr)
                    .with_metadata(META_ANCHOR, anchor.as_str());
                node.score = score;
                expr_nodes.push(node);
                anchors.push((id, anchor));
            }
        }

        report.text_nodes = text_nodes.len();
        report.expr_nodes = expr_nodes.len();

        let mut graph = DualGraph::new(self.graph_config.clone());
        graph.add_nodes(text_nodes.into_iter().chain(expr_nodes))?;
        for (expr_id, text_id) in &anchors {
            graph.add_edge(expr_id, text_id, EdgeType::AnchorOccursIn, 1.0)?;
        }
        report.anchor_edges = anchors.len();

        let k = self.graph_config.knn_k;
        report.text_sim_edges = graph.build_knn_edges(Layer::Text, k, EdgeType::TextSim)?;
        report.expr_sim_edges =
            graph.build_knn_edges(Layer::Expression, k, self.graph_config.expr_edge_type)?;
        report.prune = Some(graph.percentile_prune(self.graph_config.percentile)?);

        info!(
            documents = report.documents,
            skipped = report.skipped_documents,
            text_nodes = report.text_nodes,
            expr_nodes = report.expr_nodes,
            edges = graph.edge_count(),
            "built graph"
        );
        Ok((graph, report))
    }

    fn embed(&self, provider: &dyn EmbeddingProvider, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let vectors = provider
            .encode(inputs, self.builder_config.batch_size)
            .map_err(|e| match e {
                Error::Embedding(_) => e,
                other => Error::Embedding(format!("{}: {other}", provider.model_name())),
            })?;
        if vectors.len() != inputs.len() {
            return Err(Error::Embedding(format!(
                "{} returned {} vectors for {} inputs",
                provider.model_name(),
                vectors.len(),
                inputs.len()
            )));
        }
        Ok(vectors)
    }

    fn score(&self, id: &str, text: &str, layer: Layer, report: &mut BuildReport) -> Option<f64> {
        let scorer = self.scorer.as_ref()?;
        match scorer.score(text, layer) {
            Ok(score) => Some(score),
            Err(e) => {
                warn!(node = id, %layer, error = %e, "scoring failed, leaving node unscored");
                report.unscored_nodes += 1;
                None
            }
        }
    }
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("text_encoder", &self.text_encoder.model_name())
            .field("expr_encoder", &self.expr_encoder.model_name())
            .field("scoring", &self.scorer.is_some())
            .field("graph_config", &self.graph_config)
            .field("builder_config", &self.builder_config)
            .finish()
    }
}
