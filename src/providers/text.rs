//! Default chunking and expression extraction.

use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};
use super::{Chunker, ExpressionExtractor};

/// `$…$`, `\[…\]` and `\(…\)` spans.
pub const DEFAULT_EXPRESSION_PATTERN: &str = r"(\$[^$]+\$|\\\[[^\]]+\\\]|\\\([^)]*\\\))";

static DEFAULT_EXPRESSION_REGEX: OnceLock<Regex> = OnceLock::new();

fn default_expression_regex() -> &'static Regex {
    DEFAULT_EXPRESSION_REGEX.get_or_init(|| {
        Regex::new(DEFAULT_EXPRESSION_PATTERN).expect("expression regex must compile")
    })
}

// ============================================================================
// Expression extraction
// ============================================================================

/// Regex-driven extractor for inline LaTeX-style math.
#[derive(Debug, Clone)]
pub struct LatexExpressionExtractor {
    pattern: Regex,
}

impl LatexExpressionExtractor {
    pub fn new() -> Self {
        Self { pattern: default_expression_regex().clone() }
    }

    /// Use a custom pattern. Each whole match becomes one expression.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::InvalidConfig(format!("expression pattern: {e}")))?;
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for LatexExpressionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionExtractor for LatexExpressionExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

// ============================================================================
// Chunking
// ============================================================================

/// Sentence-merging chunker.
///
/// A sentence ends at a whitespace-delimited token ending in `.`, `!` or
/// `?`. Sentences are appended to the current chunk until the next one would
/// push it past `max_tokens` words; a single sentence longer than the budget
/// becomes its own chunk. Whitespace inside a chunk is normalized to single
/// spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceChunker {
    pub max_tokens: usize,
}

impl SentenceChunker {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens: max_tokens.max(1) }
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(128)
    }
}

fn sentences(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for token in text.split_whitespace() {
        current.push(token);
        if token.ends_with(['.', '!', '?']) {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for sentence in sentences(text) {
            if !current.is_empty() && current.len() + sentence.len() > self.max_tokens {
                chunks.push(current.join(" "));
                current.clear();
            }
            current.extend(sentence);
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }
}
