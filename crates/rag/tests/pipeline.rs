mod common;

use std::sync::Arc;

use common::{pipeline, HashEmbedder, MemorySource, DIMS};
use parentkb_core::ChunkMetadata;
use parentkb_ingest::EmbeddingGenerator;
use parentkb_rag::{PipelineError, Retriever};
use parentkb_storage::{IndexError, VectorIndex};

const QUESTION: &str = "what are signs of speech delay";

fn two_docs() -> Arc<MemorySource> {
    let source = MemorySource::new();
    source.put("a.pdf", &["speech delay symptoms"]);
    source.put("b.pdf", &["unrelated text"]);
    source
}

#[tokio::test]
async fn relevant_document_ranks_first() {
    let tmp = tempfile::tempdir().unwrap();
    let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("hash")).await;

    let report = rag.initialize(false).await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.pages, 2);
    assert_eq!(report.chunks, 2);

    let results = rag.retrieve_context(QUESTION, 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, "a.pdf");
    assert_eq!(results[0].page, Some(1));
    assert!(results[0].score > 0.0 && results[0].score <= 1.0);
}

#[tokio::test]
async fn exact_text_scores_near_one() {
    let tmp = tempfile::tempdir().unwrap();
    let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("hash")).await;
    rag.initialize(false).await.unwrap();

    let results = rag.retrieve_context("speech delay symptoms", 2).await.unwrap();
    assert_eq!(results[0].source, "a.pdf");
    assert!(results[0].score > 0.999, "score was {}", results[0].score);
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn removing_a_source_leaves_the_rest() {
    let tmp = tempfile::tempdir().unwrap();
    let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("hash")).await;
    rag.initialize(false).await.unwrap();

    assert_eq!(rag.remove_single_pdf("a.pdf").await.unwrap(), 1);
    assert_eq!(rag.index().count().await.unwrap(), 1);

    let results = rag.retrieve_context(QUESTION, 5).await.unwrap();
    assert!(results.iter().all(|r| r.source == "b.pdf"));

    // Removing again is a no-op.
    assert_eq!(rag.remove_single_pdf("a.pdf").await.unwrap(), 0);
}

#[tokio::test]
async fn adding_the_same_pdf_twice_does_not_duplicate() {
    let tmp = tempfile::tempdir().unwrap();
    let source = two_docs();
    source.put("c.pdf", &["Model the sound slowly.", "Praise every attempt."]);
    let rag = pipeline(tmp.path(), source, HashEmbedder::new("hash")).await;

    let first = rag.add_single_pdf("c.pdf").await.unwrap();
    let after_first = rag.index().count_by_source("c.pdf").await.unwrap();
    let second = rag.add_single_pdf("c.pdf").await.unwrap();
    let after_second = rag.index().count_by_source("c.pdf").await.unwrap();

    assert_eq!(first, 2);
    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
    assert!(rag.index().stamp().await.unwrap().is_some());
}

#[tokio::test]
async fn re_upload_replaces_shrunk_document() {
    let tmp = tempfile::tempdir().unwrap();
    let source = MemorySource::new();
    source.put("guide.pdf", &["page one", "page two", "page three"]);
    let rag = pipeline(tmp.path(), source.clone(), HashEmbedder::new("hash")).await;

    rag.add_single_pdf("guide.pdf").await.unwrap();
    assert_eq!(rag.index().count_by_source("guide.pdf").await.unwrap(), 3);

    source.put("guide.pdf", &["only page"]);
    rag.add_single_pdf("guide.pdf").await.unwrap();
    assert_eq!(rag.index().count_by_source("guide.pdf").await.unwrap(), 1);
}

#[tokio::test]
async fn adding_missing_or_empty_file_is_noop() {
    let tmp = tempfile::tempdir().unwrap();
    let source = two_docs();
    source.put("blank.pdf", &["   ", ""]);
    let embedder = HashEmbedder::new("hash");
    let rag = pipeline(tmp.path(), source, embedder.clone()).await;

    assert_eq!(rag.add_single_pdf("ghost.pdf").await.unwrap(), 0);
    assert_eq!(rag.add_single_pdf("blank.pdf").await.unwrap(), 0);
    assert_eq!(rag.index().count().await.unwrap(), 0);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn persisted_index_is_trusted_on_restart() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("hash")).await;
        rag.initialize(false).await.unwrap();
        rag.index().close().await;
    }

    let embedder = HashEmbedder::new("hash");
    let rag = pipeline(tmp.path(), MemorySource::new(), embedder.clone()).await;
    assert!(!rag.is_initialized());

    let report = rag.initialize(false).await.unwrap();
    assert!(report.skipped);
    assert_eq!(report.chunks, 2);
    assert!(rag.is_initialized());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn model_change_forces_rebuild() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("old-model")).await;
        rag.initialize(false).await.unwrap();
        rag.index().close().await;
    }

    let source = MemorySource::new();
    source.put("new.pdf", &["fresh content"]);
    let rag = pipeline(tmp.path(), source, HashEmbedder::new("new-model")).await;

    let report = rag.initialize(false).await.unwrap();
    assert!(!report.skipped);
    assert_eq!(rag.index().count().await.unwrap(), 1);
    assert_eq!(
        rag.index().stamp().await.unwrap().unwrap().embedding_model,
        "new-model"
    );
}

#[tokio::test]
async fn incremental_add_refuses_stale_index() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("old-model")).await;
        rag.initialize(false).await.unwrap();
        rag.index().close().await;
    }

    let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("new-model")).await;
    let err = rag.add_single_pdf("a.pdf").await.unwrap_err();
    assert!(matches!(err, PipelineError::StaleIndex { .. }));
}

#[tokio::test]
async fn force_reload_with_no_documents_clears_index() {
    let tmp = tempfile::tempdir().unwrap();
    let source = two_docs();
    let rag = pipeline(tmp.path(), source.clone(), HashEmbedder::new("hash")).await;
    rag.initialize(false).await.unwrap();

    source.remove("a.pdf");
    source.remove("b.pdf");
    let report = rag.initialize(true).await.unwrap();
    assert_eq!(report.pages, 0);
    assert_eq!(report.chunks, 0);
    assert_eq!(rag.index().count().await.unwrap(), 0);
    assert!(rag.is_initialized());
    assert!(rag.retrieve_context(QUESTION, 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn embedding_failure_keeps_previous_index() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = HashEmbedder::new("hash");
    let rag = pipeline(tmp.path(), two_docs(), embedder.clone()).await;
    rag.initialize(false).await.unwrap();

    embedder.set_failing(true);
    let err = rag.initialize(true).await.unwrap_err();
    assert!(matches!(err, PipelineError::Embedding(_)));
    assert_eq!(rag.index().count().await.unwrap(), 2);
}

#[tokio::test]
async fn first_query_initializes_lazily() {
    let tmp = tempfile::tempdir().unwrap();
    let rag = pipeline(tmp.path(), two_docs(), HashEmbedder::new("hash")).await;
    assert!(!rag.is_initialized());

    let results = rag.retrieve_context(QUESTION, 1).await.unwrap();
    assert!(rag.is_initialized());
    assert_eq!(results[0].source, "a.pdf");
}

#[tokio::test]
async fn concurrent_writers_are_serialized() {
    let tmp = tempfile::tempdir().unwrap();
    let source = two_docs();
    source.put("c.pdf", &["turn taking games"]);
    let rag = Arc::new(pipeline(tmp.path(), source, HashEmbedder::new("hash")).await);

    let (reload, add, remove) = tokio::join!(
        rag.initialize(true),
        rag.add_single_pdf("c.pdf"),
        rag.remove_single_pdf("b.pdf"),
    );
    reload.unwrap();
    add.unwrap();
    remove.unwrap();

    // Whatever order the lock granted, c.pdf has exactly one record.
    assert_eq!(rag.index().count_by_source("c.pdf").await.unwrap(), 1);
    assert_eq!(rag.index().count_by_source("a.pdf").await.unwrap(), 1);
}

#[tokio::test]
async fn index_of_other_dimension_is_an_error_not_empty_context() {
    let tmp = tempfile::tempdir().unwrap();
    let index = VectorIndex::open(tmp.path(), "test_kb").await.unwrap();
    index
        .insert(
            &["speech delay symptoms".to_string()],
            &[vec![1.0, 0.0, 0.0]],
            &[ChunkMetadata {
                source: "a.pdf".into(),
                page: Some(1),
                chunk_index: 0,
                total_chunks: 1,
            }],
        )
        .await
        .unwrap();

    let embeddings = EmbeddingGenerator::new(HashEmbedder::new("hash"), 16, 0);
    let err = Retriever::new(&embeddings, &index)
        .retrieve(QUESTION, 5)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Index(IndexError::DimensionMismatch { expected: 3, actual: DIMS })
    ));
}

#[tokio::test]
async fn late_add_after_file_is_gone_does_not_resurrect_records() {
    let tmp = tempfile::tempdir().unwrap();
    let source = two_docs();
    let rag = pipeline(tmp.path(), source.clone(), HashEmbedder::new("hash")).await;
    rag.initialize(false).await.unwrap();

    // Delete order used by the HTTP layer: file first, then its records.
    source.remove("a.pdf");
    rag.remove_single_pdf("a.pdf").await.unwrap();
    // An upload's background indexing task that was still queued.
    assert_eq!(rag.add_single_pdf("a.pdf").await.unwrap(), 0);

    assert_eq!(rag.index().count_by_source("a.pdf").await.unwrap(), 0);
    assert_eq!(rag.index().count().await.unwrap(), 1);
}
