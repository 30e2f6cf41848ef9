use chrono::{DateTime, Utc};
use parentkb_core::ChunkMetadata;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Bumped whenever the on-disk layout or id scheme changes.
pub const SCHEMA_VERSION: u32 = 1;

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance (`1 - cosine`). [`VectorIndex::query`](crate::VectorIndex::query)
    /// always sets it.
    pub distance: Option<f32>,
}

/// Identifies what produced the vectors in a collection.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStamp {
    pub schema_version: u32,
    pub embedding_model: String,
    pub dimensions: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexStamp {
    pub fn current(embedding_model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            embedding_model: embedding_model.into(),
            dimensions,
            built_at: Utc::now(),
        }
    }

    /// Same schema, model and dimensionality. `built_at` is ignored.
    pub fn matches(&self, other: &IndexStamp) -> bool {
        self.schema_version == other.schema_version
            && self.embedding_model == other.embedding_model
            && self.dimensions == other.dimensions
    }
}

/// Per-source record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub chunks: usize,
}

/// `"{source}_chunk_{h}"`, where `h` is the first 16 hex digits of
/// SHA-256 over source, page and chunk index.
pub fn record_id(metadata: &ChunkMetadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(metadata.source.as_bytes());
    hasher.update([0x1f]);
    match metadata.page {
        Some(page) => hasher.update(page.to_le_bytes()),
        None => hasher.update(b"-"),
    }
    hasher.update([0x1f]);
    hasher.update(metadata.chunk_index.to_le_bytes());
    let digest = hasher.finalize();

    let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("{}_chunk_{}", metadata.source, hex)
}

pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom <= f32::EPSILON {
        Some(0.0)
    } else {
        Some(dot / denom)
    }
}
