//! Snapshot export / import.
//!
//! A snapshot is the full graph as plain data:
//!
//! ```text
//! {
//!   "created_at": "2026-01-01T00:00:00Z",      (optional)
//!   "max_nodes": 1000000,                       (optional)
//!   "nodes": { "<id>": { "layer", "embedding", "score", "metadata" }, ... },
//!   "edges": [ { "source", "target", "type", "weight" }, ... ]
//! }
//! ```
//!
//! Node order inside `nodes` is the registry order and survives a round
//! trip. Import replays node inserts, then edge inserts, through the same
//! validated paths as a fresh build, so a tampered snapshot fails with the
//! usual `DuplicateNode` / `UnknownNode` / `UnsupportedEdgeType` errors.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::model::*;
use crate::Result;
use super::DualGraph;

/// One node record. The id is the key in [`GraphSnapshot::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub layer: Layer,
    pub embedding: Vec<f32>,
    #[serde(default, alias = "perplexity")]
    pub score: Option<f64>,
    #[serde(default, serialize_with = "crate::model::metadata::serialize_sorted")]
    pub metadata: MetadataMap,
}

/// One edge record. The type is kept as its wire name so that unknown types
/// surface as `UnsupportedEdgeType` on import rather than as a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", alias = "edge_type")]
    pub edge_type: String,
    pub weight: f64,
}

/// Full serializable image of a [`DualGraph`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<usize>,
    #[serde(default, with = "ordered_nodes")]
    pub nodes: Vec<(String, SnapshotNode)>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

impl DualGraph {
    /// Capture every node and edge.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .map(|n| {
                (
                    n.id.clone(),
                    SnapshotNode {
                        layer: n.layer,
                        embedding: n.embedding.clone(),
                        score: n.score,
                        metadata: n.metadata.clone(),
                    },
                )
            })
            .collect();
        let edges = self
            .edges()
            .map(|e| SnapshotEdge {
                source: e.source.to_string(),
                target: e.target.to_string(),
                edge_type: e.edge_type.as_str().to_string(),
                weight: e.weight,
            })
            .collect();
        GraphSnapshot {
            created_at: Some(Utc::now()),
            max_nodes: Some(self.config().max_nodes),
            nodes,
            edges,
        }
    }

    /// Rebuild a graph with default settings (and the snapshot's node cap,
    /// when recorded).
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut config = GraphConfig::default();
        if let Some(max_nodes) = snapshot.max_nodes {
            config.max_nodes = max_nodes;
        }
        Self::from_snapshot_with(snapshot, config)
    }

    /// Rebuild a graph under an explicit configuration.
    pub fn from_snapshot_with(snapshot: GraphSnapshot, config: GraphConfig) -> Result<Self> {
        let mut graph = DualGraph::new(config);
        let nodes = snapshot.nodes.into_iter().map(|(id, n)| Node {
            id,
            layer: n.layer,
            embedding: n.embedding,
            score: n.score,
            metadata: n.metadata,
        });
        graph.add_nodes(nodes)?;
        for edge in &snapshot.edges {
            graph.add_edge_named(&edge.source, &edge.target, &edge.edge_type, edge.weight)?;
        }
        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "restored graph from snapshot");
        Ok(graph)
    }

    // ========================================================================
    // JSON persistence
    // ========================================================================

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_snapshot())?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    /// Stream the snapshot as JSON into any writer.
    pub fn write_json(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(&mut *writer, &self.to_snapshot())?;
        writer.flush()?;
        Ok(())
    }

    /// Write the snapshot to `path`, creating parent directories.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        info!(path = %path.display(), nodes = self.node_count(), edges = self.edge_count(), "saved graph");
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let snapshot: GraphSnapshot = serde_json::from_reader(reader)?;
        let graph = Self::from_snapshot(snapshot)?;
        info!(path = %path.display(), nodes = graph.node_count(), edges = graph.edge_count(), "loaded graph");
        Ok(graph)
    }
}

/// `nodes` is a JSON object on the wire but an ordered list in memory.
mod ordered_nodes {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::SnapshotNode;

    pub fn serialize<S: Serializer>(
        nodes: &[(String, SnapshotNode)],
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(nodes.len()))?;
        for (id, node) in nodes {
            map.serialize_entry(id, node)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<(String, SnapshotNode)>, D::Error> {
        struct NodesVisitor;

        impl<'de> Visitor<'de> for NodesVisitor {
            type Value = Vec<(String, SnapshotNode)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of node id to node record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut nodes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, node)) = access.next_entry::<String, SnapshotNode>()? {
                    nodes.push((id, node));
                }
                Ok(nodes)
            }
        }

        deserializer.deserialize_map(NodesVisitor)
    }
}
