//! In-process fakes so pipeline tests run without a network.
#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parentkb_core::PageText;
use parentkb_ingest::embedding::{PASSAGE_PREFIX, QUERY_PREFIX};
use parentkb_ingest::{ChunkConfig, CollectionError, DocumentSource, Embedder, EmbeddingError, EmbeddingGenerator};
use parentkb_llm::{LlmError, LlmProvider, Message};
use parentkb_rag::RagPipeline;
use parentkb_storage::VectorIndex;

pub const DIMS: usize = 512;

/// Deterministic bag-of-words embedder: each lowercase alphanumeric token
/// adds 1.0 to a hashed bucket.
pub struct HashEmbedder {
    model: String,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl HashEmbedder {
    pub fn new(model: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn vector(text: &str) -> Vec<f32> {
        let text = text
            .strip_prefix(PASSAGE_PREFIX)
            .or_else(|| text.strip_prefix(QUERY_PREFIX))
            .unwrap_or(text);
        let mut v = vec![0.0; DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % DIMS as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Api("503: model loading".into()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// File name -> page texts, editable between pipeline calls.
#[derive(Default)]
pub struct MemorySource {
    files: Mutex<BTreeMap<String, Vec<String>>>,
}

impl MemorySource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, name: &str, pages: &[&str]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), pages.iter().map(|p| p.to_string()).collect());
    }

    pub fn remove(&self, name: &str) {
        self.files.lock().unwrap().remove(name);
    }

    fn pages_of(name: &str, pages: &[String]) -> Vec<PageText> {
        pages
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| PageText::new(text.clone(), name, Some(i as u32 + 1)))
            .collect()
    }
}

impl DocumentSource for MemorySource {
    fn load_all(&self) -> Result<Vec<PageText>, CollectionError> {
        let files = self.files.lock().unwrap();
        Ok(files
            .iter()
            .flat_map(|(name, pages)| Self::pages_of(name, pages))
            .collect())
    }

    fn load_one(&self, name: &str) -> Result<Vec<PageText>, CollectionError> {
        let files = self.files.lock().unwrap();
        Ok(files
            .get(name)
            .map(|pages| Self::pages_of(name, pages))
            .unwrap_or_default())
    }
}

/// Returns a fixed reply, or fails, and records every prompt it saw.
pub struct ScriptedLlm {
    reply: Result<String, u16>,
    pub prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_user_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .and_then(|m| m.last())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(messages);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(LlmError::ApiError {
                status: *status,
                body: "rate limited".to_string(),
            }),
        }
    }
}

pub async fn pipeline(
    dir: &Path,
    source: Arc<MemorySource>,
    embedder: Arc<HashEmbedder>,
) -> RagPipeline {
    let index = VectorIndex::open(dir, "test_kb").await.unwrap();
    let embeddings = EmbeddingGenerator::new(embedder, 16, 0);
    RagPipeline::new(
        source,
        embeddings,
        index,
        ChunkConfig {
            chunk_size: 200,
            overlap: 40,
        },
    )
}
