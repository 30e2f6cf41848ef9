mod common;

use std::sync::Arc;

use common::{pipeline, HashEmbedder, MemorySource, ScriptedLlm};
use parentkb_llm::{Language, Role, NO_CONTEXT_MARKER};
use parentkb_rag::{AnswerSettings, QaService};

async fn service(
    dir: &std::path::Path,
    source: Arc<MemorySource>,
    llm: Arc<ScriptedLlm>,
) -> QaService {
    let rag = pipeline(dir, source, HashEmbedder::new("hash")).await;
    QaService::new(
        Arc::new(rag),
        llm,
        AnswerSettings {
            top_k: 2,
            ..AnswerSettings::default()
        },
    )
}

fn docs() -> Arc<MemorySource> {
    let source = MemorySource::new();
    source.put("a.pdf", &["speech delay symptoms include few words by age two"]);
    source.put("b.pdf", &["unrelated text"]);
    source
}

#[tokio::test]
async fn answer_uses_retrieved_context() {
    let tmp = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::replying("  Talk with your child every day.  ");
    let qa = service(tmp.path(), docs(), llm.clone()).await;

    let answer = qa.answer_question("what are signs of speech delay").await.unwrap();
    assert_eq!(answer.answer, "Talk with your child every day.");
    assert!(!answer.fallback);
    assert_eq!(answer.language, Language::English);
    assert_eq!(answer.context[0].source, "a.pdf");

    let messages = llm.prompts.lock().unwrap().last().cloned().unwrap();
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);
    assert!(messages[1].content.contains("[Context 1 - Source: a.pdf, Page 1]"));
}

#[tokio::test]
async fn empty_knowledge_base_uses_marker() {
    let tmp = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::replying("General guidance.");
    let qa = service(tmp.path(), MemorySource::new(), llm.clone()).await;

    let answer = qa.answer_question("How can I help with lisping?").await.unwrap();
    assert!(!answer.fallback);
    assert!(answer.context.is_empty());
    assert!(llm.last_user_prompt().contains(NO_CONTEXT_MARKER));
}

#[tokio::test]
async fn generation_failure_becomes_english_apology() {
    let tmp = tempfile::tempdir().unwrap();
    let qa = service(tmp.path(), docs(), ScriptedLlm::failing(429)).await;

    let answer = qa.answer_question("what are signs of speech delay").await.unwrap();
    assert!(answer.fallback);
    assert!(answer.answer.starts_with("I apologize"));
    assert!(answer.answer.contains("429"));
}

#[tokio::test]
async fn generation_failure_becomes_sinhala_apology() {
    let tmp = tempfile::tempdir().unwrap();
    let qa = service(tmp.path(), docs(), ScriptedLlm::failing(500)).await;

    let answer = qa.answer_question("මගේ දරුවා කතා කරන්නේ නැහැ").await.unwrap();
    assert!(answer.fallback);
    assert_eq!(answer.language, Language::Sinhala);
    assert!(answer.answer.starts_with("කණගාටුයි"));
}

#[tokio::test]
async fn reload_and_incremental_delegate_to_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let source = docs();
    let qa = service(tmp.path(), source.clone(), ScriptedLlm::replying("ok")).await;

    let report = qa.reload_knowledge_base().await.unwrap();
    assert_eq!(report.chunks, 2);

    source.put("c.pdf", &["new guide"]);
    assert_eq!(qa.add_single_pdf("c.pdf").await.unwrap(), 1);
    assert_eq!(qa.remove_single_pdf("b.pdf").await.unwrap(), 1);
    assert_eq!(qa.pipeline().index().count().await.unwrap(), 2);
}
