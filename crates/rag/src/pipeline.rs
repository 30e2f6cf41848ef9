//! Keeps the vector index consistent with the PDF collection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parentkb_core::{Config, PageText, RetrievalResult};
use parentkb_ingest::{
    chunk_documents, ChunkConfig, CollectionError, DocumentSource, EmbeddingGenerator, PdfCollection,
};
use parentkb_storage::{IndexStamp, VectorIndex};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::retriever::Retriever;

/// Outcome of [`RagPipeline::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// The persisted index was trusted and nothing was embedded.
    pub skipped: bool,
    /// Pages loaded (0 when skipped).
    pub pages: usize,
    /// Records now in the index.
    pub chunks: usize,
}

pub struct RagPipeline {
    source: Arc<dyn DocumentSource>,
    embeddings: EmbeddingGenerator,
    index: VectorIndex,
    chunking: ChunkConfig,
    initialized: AtomicBool,
    /// Serializes every index mutation.
    writer: Mutex<()>,
}

impl RagPipeline {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        embeddings: EmbeddingGenerator,
        index: VectorIndex,
        chunking: ChunkConfig,
    ) -> Self {
        Self {
            source,
            embeddings,
            index,
            chunking,
            initialized: AtomicBool::new(false),
            writer: Mutex::new(()),
        }
    }

    /// Wire the PDF directory, configured embedder and on-disk index together.
    pub async fn open(config: &Config) -> Result<Self, PipelineError> {
        let collection = PdfCollection::new(&config.storage.pdfs_dir)?;
        let embeddings = EmbeddingGenerator::from_config(&config.embedding)?;
        let index = VectorIndex::open(&config.storage.index_dir, &config.rag.collection).await?;
        Ok(Self::new(
            Arc::new(collection),
            embeddings,
            index,
            ChunkConfig::from(&config.rag),
        ))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn embeddings(&self) -> &EmbeddingGenerator {
        &self.embeddings
    }

    pub fn retriever(&self) -> Retriever<'_> {
        Retriever::new(&self.embeddings, &self.index)
    }

    fn active_stamp(&self) -> IndexStamp {
        IndexStamp::current(self.embeddings.model_id(), self.embeddings.dimensions())
    }

    /// Build the index from every PDF, unless it already holds records stamped
    /// by the active embedding model and `force_reload` is false.
    pub async fn initialize(&self, force_reload: bool) -> Result<IndexReport, PipelineError> {
        let _guard = self.writer.lock().await;
        let active = self.active_stamp();

        if !force_reload {
            let count = self.index.count().await?;
            if count > 0 {
                match self.index.stamp().await? {
                    Some(stored) if stored.matches(&active) => {
                        info!(records = count, "vector index already populated, skipping rebuild");
                        self.initialized.store(true, Ordering::Release);
                        return Ok(IndexReport {
                            skipped: true,
                            pages: 0,
                            chunks: count,
                        });
                    }
                    Some(stored) => warn!(
                        stored_model = %stored.embedding_model,
                        stored_dimensions = stored.dimensions,
                        stored_schema = stored.schema_version,
                        active_model = %active.embedding_model,
                        active_dimensions = active.dimensions,
                        "index stamp does not match, rebuilding"
                    ),
                    None => warn!(records = count, "index has no stamp, rebuilding"),
                }
            }
        }

        let pages = self.load_pages(|source| source.load_all()).await?;
        if pages.is_empty() {
            warn!("no documents found in the PDF collection");
        }
        let chunks = chunk_documents(&pages, &self.chunking);
        let (texts, metadatas): (Vec<_>, Vec<_>) =
            chunks.into_iter().map(|c| (c.text, c.metadata)).unzip();
        info!(pages = pages.len(), chunks = texts.len(), "embedding knowledge base");

        // Embed before clearing so a failing backend leaves the old index usable.
        let vectors = self.embeddings.embed_passages(&texts).await?;

        self.index.delete_all().await?;
        let written = self.index.insert(&texts, &vectors, &metadatas).await?;
        self.index.write_stamp(&active).await?;
        self.initialized.store(true, Ordering::Release);

        info!(pages = pages.len(), records = written, "knowledge base indexed");
        Ok(IndexReport {
            skipped: false,
            pages: pages.len(),
            chunks: written,
        })
    }

    /// Context for `query`, initializing the index on first use.
    pub async fn retrieve_context(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, PipelineError> {
        if !self.is_initialized() {
            self.initialize(false).await?;
        }
        self.retriever().retrieve(query, top_k).await
    }

    /// (Re)index one file: replaces any records it already has.
    /// Returns the number of records written.
    pub async fn add_single_pdf(&self, filename: &str) -> Result<usize, PipelineError> {
        let _guard = self.writer.lock().await;

        let active = self.active_stamp();
        let stamp = self.index.stamp().await?;
        if let Some(stored) = &stamp {
            if !stored.matches(&active) {
                return Err(PipelineError::StaleIndex {
                    stored: format!("{} ({} dims)", stored.embedding_model, stored.dimensions),
                    active: format!("{} ({} dims)", active.embedding_model, active.dimensions),
                });
            }
        }

        let name = filename.to_string();
        let pages = self.load_pages(move |source| source.load_one(&name)).await?;
        if pages.is_empty() {
            info!(file = filename, "no extractable text, nothing to index");
            return Ok(0);
        }

        let chunks = chunk_documents(&pages, &self.chunking);
        let (texts, metadatas): (Vec<_>, Vec<_>) =
            chunks.into_iter().map(|c| (c.text, c.metadata)).unzip();
        let vectors = self.embeddings.embed_passages(&texts).await?;

        let removed = self.index.delete_by_source(filename).await?;
        let written = self.index.insert(&texts, &vectors, &metadatas).await?;
        if stamp.is_none() {
            self.index.write_stamp(&active).await?;
        }

        info!(file = filename, removed, records = written, "indexed PDF");
        Ok(written)
    }

    /// Drop every record of one file. Returns how many were removed.
    pub async fn remove_single_pdf(&self, filename: &str) -> Result<u64, PipelineError> {
        let _guard = self.writer.lock().await;
        let removed = self.index.delete_by_source(filename).await?;
        info!(file = filename, removed, "removed PDF from index");
        Ok(removed)
    }

    async fn load_pages<F>(&self, load: F) -> Result<Vec<PageText>, PipelineError>
    where
        F: FnOnce(&dyn DocumentSource) -> Result<Vec<PageText>, CollectionError> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let pages = tokio::task::spawn_blocking(move || load(source.as_ref())).await??;
        Ok(pages)
    }
}
