//! # Dual-Layer Graph Model
//!
//! Plain DTOs shared by the store, the walk sampler, the builder and
//! retrieval.
//!
//! Design rule: this module is pure data: no I/O, no state, no providers.

pub mod node;
pub mod edge;
pub mod value;
pub mod metadata;

pub use node::{Node, NodeHandle, Layer};
pub use edge::{Edge, EdgeType, EdgeView, normalize_weight};
pub use value::Value;
pub use metadata::{MetadataMap, metadata, META_TEXT, META_ANCHOR, META_DOC_IDX, META_CHUNK_IDX};
