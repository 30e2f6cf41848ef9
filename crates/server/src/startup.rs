//! Server startup: build the QA service and shared state.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use parentkb_core::Config;
use parentkb_ingest::PdfCollection;
use parentkb_llm::{create_provider, LlmProvider};
use parentkb_rag::{AnswerSettings, QaService, RagPipeline};

use crate::state::AppState;

/// Provider, embedder and index. Fails if the embedding model does not answer.
pub async fn build_qa_service(config: &Config) -> anyhow::Result<QaService> {
    let provider: Arc<dyn LlmProvider> = Arc::from(
        create_provider(&config.llm).context("failed to configure LLM provider")?,
    );
    info!("LLM provider ready (provider: {}, model: {})", config.llm.provider, config.llm.model);

    let pipeline = RagPipeline::open(config)
        .await
        .context("failed to open knowledge base")?;
    info!(
        "Vector index at {} (collection: {})",
        pipeline.index().path().display(),
        pipeline.index().collection()
    );
    pipeline
        .embeddings()
        .probe()
        .await
        .context("embedding model is not available")?;

    Ok(QaService::new(
        Arc::new(pipeline),
        provider,
        AnswerSettings::from_config(config),
    ))
}

pub async fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let qa = build_qa_service(config).await?;

    // A failure here is retried lazily by the first question.
    match qa.pipeline().initialize(false).await {
        Ok(report) if report.skipped => {
            info!("Knowledge base loaded from disk ({} chunks)", report.chunks)
        }
        Ok(report) => info!(
            "Knowledge base built: {} pages, {} chunks",
            report.pages, report.chunks
        ),
        Err(e) => warn!("Knowledge base initialization failed: {} (will retry on first question)", e),
    }

    let pdfs = PdfCollection::new(&config.storage.pdfs_dir)
        .with_context(|| format!("cannot open {}", config.storage.pdfs_dir.display()))?;

    Ok(Arc::new(AppState { qa, pdfs }))
}
