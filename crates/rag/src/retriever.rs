use parentkb_core::RetrievalResult;
use parentkb_ingest::EmbeddingGenerator;
use parentkb_storage::{IndexHit, VectorIndex};
use tracing::debug;

use crate::error::PipelineError;

/// Read-only view over the pipeline's embedder and index.
pub struct Retriever<'a> {
    embeddings: &'a EmbeddingGenerator,
    index: &'a VectorIndex,
}

impl<'a> Retriever<'a> {
    pub fn new(embeddings: &'a EmbeddingGenerator, index: &'a VectorIndex) -> Self {
        Self { embeddings, index }
    }

    /// Best-first context for `query`. No matches is `Ok(vec![])`.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, PipelineError> {
        let vector = self.embeddings.embed_query(query).await?;
        let hits = self.index.query(&vector, top_k).await?;
        debug!(top_k, returned = hits.len(), "retrieved context");
        Ok(hits.into_iter().map(to_result).collect())
    }
}

fn to_result(hit: IndexHit) -> RetrievalResult {
    RetrievalResult {
        score: score_from_distance(hit.distance),
        text: hit.text,
        source: hit.metadata.source,
        page: hit.metadata.page,
    }
}

/// `1 - distance`, clamped to [0, 1]. A missing distance scores 0.
pub fn score_from_distance(distance: Option<f32>) -> f32 {
    distance.map_or(0.0, |d| (1.0 - d).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parentkb_core::ChunkMetadata;

    #[test]
    fn score_conversion() {
        assert_eq!(score_from_distance(None), 0.0);
        assert!((score_from_distance(Some(0.25)) - 0.75).abs() < 1e-6);
        assert_eq!(score_from_distance(Some(0.0)), 1.0);
        // Opposite vectors have distance 2.
        assert_eq!(score_from_distance(Some(2.0)), 0.0);
        assert_eq!(score_from_distance(Some(-1e-7)), 1.0);
    }

    #[test]
    fn hit_maps_to_result() {
        let hit = IndexHit {
            id: "a.pdf_chunk_0123456789abcdef".into(),
            text: "speech delay symptoms".into(),
            metadata: ChunkMetadata {
                source: "a.pdf".into(),
                page: Some(4),
                chunk_index: 0,
                total_chunks: 1,
            },
            distance: Some(0.1),
        };
        let result = to_result(hit);
        assert_eq!(result.source, "a.pdf");
        assert_eq!(result.page, Some(4));
        assert!((result.score - 0.9).abs() < 1e-6);
    }
}
