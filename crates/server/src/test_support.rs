//! Offline state for router tests: a real PDF directory, a hashing
//! embedder and a canned LLM.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use parentkb_ingest::{ChunkConfig, Embedder, EmbeddingError, EmbeddingGenerator, PdfCollection};
use parentkb_llm::{LlmError, LlmProvider, Message};
use parentkb_rag::{AnswerSettings, QaService, RagPipeline};
use parentkb_storage::VectorIndex;

use crate::state::AppState;

pub const DIMS: usize = 32;

struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0; DIMS];
                for (i, b) in t.bytes().enumerate() {
                    v[(b as usize + i) % DIMS] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model(&self) -> &str {
        "fake-embed"
    }
}

struct CannedLlm;

#[async_trait]
impl LlmProvider for CannedLlm {
    async fn complete(
        &self,
        _messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        Ok("Practice a little every day.".to_string())
    }
}

pub struct TestState {
    pub state: Arc<AppState>,
    _dir: TempDir,
}

pub async fn test_state() -> TestState {
    let dir = TempDir::new().unwrap();
    let pdfs_dir = dir.path().join("pdfs");

    let source = Arc::new(PdfCollection::new(&pdfs_dir).unwrap());
    let index = VectorIndex::open(&dir.path().join("index"), "test_kb")
        .await
        .unwrap();
    let pipeline = RagPipeline::new(
        source,
        EmbeddingGenerator::new(Arc::new(FakeEmbedder), 8, 16),
        index,
        ChunkConfig {
            chunk_size: 200,
            overlap: 40,
        },
    );
    let qa = QaService::new(
        Arc::new(pipeline),
        Arc::new(CannedLlm),
        AnswerSettings::default(),
    );

    TestState {
        state: Arc::new(AppState {
            qa,
            pdfs: PdfCollection::new(&pdfs_dir).unwrap(),
        }),
        _dir: dir,
    }
}
