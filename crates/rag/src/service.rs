//! Question answering: retrieval, prompt, generation.

use std::sync::Arc;

use parentkb_core::{Config, RetrievalResult};
use parentkb_llm::prompt::generation_error_message;
use parentkb_llm::{build_prompt, detect_language, system_prompt, Language, LlmProvider};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::pipeline::{IndexReport, RagPipeline};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AnswerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.rag.top_k,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            temperature: 0.7,
            max_tokens: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub language: Language,
    /// The answer is the localized apology because generation failed.
    pub fallback: bool,
    /// Context the prompt was built from.
    pub context: Vec<RetrievalResult>,
}

pub struct QaService {
    pipeline: Arc<RagPipeline>,
    llm: Arc<dyn LlmProvider>,
    settings: AnswerSettings,
}

impl QaService {
    pub fn new(pipeline: Arc<RagPipeline>, llm: Arc<dyn LlmProvider>, settings: AnswerSettings) -> Self {
        Self {
            pipeline,
            llm,
            settings,
        }
    }

    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Retrieval failures are errors. Generation failures become an apology
    /// in the question's language.
    pub async fn answer_question(&self, question: &str) -> Result<Answer, PipelineError> {
        let language = detect_language(question);
        let context = self
            .pipeline
            .retrieve_context(question, self.settings.top_k)
            .await?;

        let prompt = build_prompt(question, &context);
        let result = self
            .llm
            .generate(
                &prompt,
                system_prompt(),
                self.settings.temperature,
                self.settings.max_tokens,
            )
            .await;

        match result {
            Ok(answer) => {
                info!(?language, context = context.len(), "answered question");
                Ok(Answer {
                    answer,
                    language,
                    fallback: false,
                    context,
                })
            }
            Err(e) => {
                warn!(error = %e, ?language, "generation failed, returning apology");
                Ok(Answer {
                    answer: generation_error_message(language, &e.to_string()),
                    language,
                    fallback: true,
                    context,
                })
            }
        }
    }

    pub async fn reload_knowledge_base(&self) -> Result<IndexReport, PipelineError> {
        self.pipeline.initialize(true).await
    }

    pub async fn add_single_pdf(&self, filename: &str) -> Result<usize, PipelineError> {
        self.pipeline.add_single_pdf(filename).await
    }

    pub async fn remove_single_pdf(&self, filename: &str) -> Result<u64, PipelineError> {
        self.pipeline.remove_single_pdf(filename).await
    }
}
