//! Typed, weighted, directed edge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::NodeHandle;
use crate::Error;

/// Relationship kind. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeType {
    /// Text chunk is similar to another text chunk.
    #[serde(rename = "TEXT_SIM")]
    TextSim,
    /// Expression is syntactically similar to another expression.
    #[serde(rename = "EXPR_SYN")]
    ExprSyn,
    /// Expression is functionally related to another expression.
    #[serde(rename = "EXPR_FUN")]
    ExprFun,
    /// Expression occurs in a text chunk. Structural, never pruned.
    #[serde(rename = "ANCHOR_OCCURS_IN")]
    AnchorOccursIn,
}

impl EdgeType {
    pub const ALL: [EdgeType; 4] = [
        EdgeType::TextSim,
        EdgeType::ExprSyn,
        EdgeType::ExprFun,
        EdgeType::AnchorOccursIn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::TextSim => "TEXT_SIM",
            EdgeType::ExprSyn => "EXPR_SYN",
            EdgeType::ExprFun => "EXPR_FUN",
            EdgeType::AnchorOccursIn => "ANCHOR_OCCURS_IN",
        }
    }

    /// Anchor edges are exempt from percentile pruning.
    pub fn is_structural(self) -> bool {
        matches!(self, EdgeType::AnchorOccursIn)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnsupportedEdgeType(s.to_string()))
    }
}

/// Clamp a raw weight into `[0, 1]`. NaN collapses to 0.
#[inline]
pub fn normalize_weight(weight: f64) -> f64 {
    if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) }
}

/// An edge as stored in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: NodeHandle,
    pub target: NodeHandle,
    pub edge_type: EdgeType,
    /// Always within `[0, 1]`.
    pub weight: f64,
}

impl Edge {
    pub fn new(source: NodeHandle, target: NodeHandle, edge_type: EdgeType, weight: f64) -> Self {
        Self {
            source,
            target,
            edge_type,
            weight: normalize_weight(weight),
        }
    }
}

/// An edge resolved to node ids, for export and inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeView<'g> {
    pub source: &'g str,
    pub target: &'g str,
    pub edge_type: EdgeType,
    pub weight: f64,
}
