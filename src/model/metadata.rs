//! MetadataMap: the free-form key-value store on nodes.

use serde::Serializer;

use super::Value;

/// A map of metadata keys to values.
pub type MetadataMap = hashbrown::HashMap<String, Value>;

/// Key holding the source text of a node.
pub const META_TEXT: &str = "text";
/// Key holding the id of the text chunk an expression was extracted from.
pub const META_ANCHOR: &str = "anchor";
/// Key holding the index of the source document.
pub const META_DOC_IDX: &str = "doc_idx";
/// Key holding the index of the chunk inside its document.
pub const META_CHUNK_IDX: &str = "chunk_idx";

/// Build a metadata map from (key, value) pairs.
pub fn metadata<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> MetadataMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Serialize a metadata map with keys in sorted order, so snapshot files are
/// byte-reproducible.
pub(crate) fn serialize_sorted<S: Serializer>(map: &MetadataMap, serializer: S) -> Result<S::Ok, S::Error> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    serializer.collect_map(entries)
}
