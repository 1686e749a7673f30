//! Node in the dual-layer graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{MetadataMap, Value};
use super::metadata::META_TEXT;
use crate::Error;

/// Opaque arena handle. Only meaningful inside the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub u32);

impl NodeHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Modality partition of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    /// Natural-language text chunks.
    #[serde(rename = "text")]
    Text,
    /// Symbolic expressions extracted from text chunks.
    #[serde(rename = "expr", alias = "expression")]
    Expression,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Text, Layer::Expression];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Text => "text",
            Layer::Expression => "expr",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Layer::Text),
            "expr" | "expression" => Ok(Layer::Expression),
            other => Err(Error::UnknownLayer(other.to_string())),
        }
    }
}

/// A node in the dual-layer graph.
///
/// Nodes are immutable once registered with a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub layer: Layer,
    pub embedding: Vec<f32>,
    /// Perplexity / specificity. Absent when no scorer ran.
    pub score: Option<f64>,
    #[serde(serialize_with = "super::metadata::serialize_sorted")]
    pub metadata: MetadataMap,
}

impl Node {
    pub fn new(id: impl Into<String>, layer: Layer, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            layer,
            embedding,
            score: None,
            metadata: MetadataMap::new(),
        }
    }

    pub fn text(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self::new(id, Layer::Text, embedding)
    }

    pub fn expression(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self::new(id, Layer::Expression, embedding)
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Source text recorded at ingestion, if any.
    pub fn source_text(&self) -> Option<&str> {
        self.get(META_TEXT).and_then(Value::as_str)
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
