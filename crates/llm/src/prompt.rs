//! Parent-facing prompt construction with Sinhala/English branching.

use parentkb_core::RetrievalResult;
use serde::Serialize;

/// Language of a parent's question. Decides the reply language and the
/// wording of the disclosure warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Sinhala,
    English,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::Sinhala => "Sinhala",
            Language::English => "English",
        }
    }

    fn response_style(&self) -> &'static str {
        match self {
            Language::Sinhala => "සරල සිංහල",
            Language::English => "simple English",
        }
    }
}

fn is_sinhala(c: char) -> bool {
    ('\u{0D80}'..='\u{0DFF}').contains(&c)
}

/// Sinhala if any character falls in the Sinhala block, otherwise English.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(is_sinhala) {
        Language::Sinhala
    } else {
        Language::English
    }
}

pub fn general_knowledge_warning(language: Language) -> &'static str {
    match language {
        Language::Sinhala => "මෙම පිළිතුර සම්පූර්ණ වශයෙන් වෛද්‍ය උපදෙස් ලෙස සලකන්න එපා.",
        Language::English => {
            "This answer is not from the PDF sources and should not be considered medical advice."
        }
    }
}

/// Localized apology used as the answer when generation fails.
pub fn generation_error_message(language: Language, error: &str) -> String {
    match language {
        Language::Sinhala => format!(
            "කණගාටුයි, නමුත් ඔබේ ප්‍රශ්නය සැකසීමේදී දෝෂයක් ඇති විය. කරුණාකර පසුව නැවත උත්සාහ කරන්න. දෝෂය: {error}"
        ),
        Language::English => format!(
            "I apologize, but I encountered an error while processing your question. Please try again later. Error: {error}"
        ),
    }
}

pub const NO_CONTEXT_MARKER: &str = "[No relevant context found in the knowledge base]";

const PERSONA: &str = "You are a helpful and supportive AI assistant for parents whose children are undergoing speech therapy. Your role is to provide clear, simple, and encouraging guidance about phonological issues, speech therapy, and child speech development.";

const SINHALA_STYLE: &str = "\
- CRITICAL FOR SINHALA: Use VERY SIMPLE, everyday Sinhala that is easy to understand:
  * Use common, everyday words that parents use in daily conversation
  * Avoid complex, formal, or academic Sinhala words
  * Use short, clear sentences
  * Break down complex ideas into simple explanations
  * Use simple vocabulary that anyone can understand
  * Write as if explaining to a friend, not in a formal or medical way";

const FOCUS_AREAS: &str = "\
FOCUS AREAS:
- Phonological issues
- Speech therapy techniques
- Child speech development guidance
- Parent support and encouragement";

const SINHALA_RESPONSE_RULES: &str = "\
CRITICAL FOR SINHALA RESPONSES:
- Use VERY SIMPLE Sinhala with everyday words
- Write in a conversational, friendly tone (like talking to a friend)
- Use short sentences
- Avoid formal or academic Sinhala
- Use simple words that parents use in daily life
- Explain things step by step in easy-to-understand language
- If you need to explain a concept, use simple examples or comparisons";

/// `[Context i - Source: s, Page p]` blocks, or the no-context marker.
fn render_context(context: &[RetrievalResult]) -> String {
    if context.is_empty() {
        return format!("\n\n{NO_CONTEXT_MARKER}");
    }

    let mut out = String::new();
    for (i, item) in context.iter().enumerate() {
        let mut tag = format!("Source: {}", item.source);
        if let Some(page) = item.page {
            tag.push_str(&format!(", Page {page}"));
        }
        out.push_str(&format!("\n\n[Context {} - {}]\n{}", i + 1, tag, item.text));
    }
    out
}

fn grounded_strategy(warning: &str) -> String {
    format!(
        "ANSWER STRATEGY:
1. PRIMARY: Use the information from the PDF context above as your main source.
2. SUPPLEMENT: If the PDF context doesn't fully answer the question, you may supplement with general knowledge about speech therapy, but you MUST clearly indicate what comes from the PDFs vs. general knowledge.
3. ACCURACY: Prioritize accuracy from PDFs, but you don't need a 100% exact match - use your understanding to provide helpful answers.
4. GENERAL KNOWLEDGE WARNING: If you use any general knowledge (not from PDFs), you MUST include this warning at the end of your response: \"{warning}\"
5. If the question is completely unrelated to the PDF context, you may use general knowledge, but you MUST include the warning message."
    )
}

fn ungrounded_strategy(warning: &str) -> String {
    format!(
        "ANSWER STRATEGY:
1. Since no relevant context was found in the PDFs, you may use general knowledge about speech therapy, phonological issues, and child speech development.
2. You MUST include this warning at the end of your response: \"{warning}\"
3. Still provide helpful, accurate information in simple language, but make it clear this is general guidance only."
    )
}

/// Render the user prompt for `question` with the retrieved `context`.
pub fn build_prompt(question: &str, context: &[RetrievalResult]) -> String {
    let language = detect_language(question);
    let warning = general_knowledge_warning(language);
    let strategy = if context.is_empty() {
        ungrounded_strategy(warning)
    } else {
        grounded_strategy(warning)
    };
    let context_text = render_context(context);

    format!(
        "{PERSONA}

LANGUAGE REQUIREMENTS:
- The user's question is in {language_name}
- You MUST respond in {style} (simple Sinhala if question is in Sinhala, simple English if question is in English)
{SINHALA_STYLE}
- Use simple, parent-friendly language - avoid medical jargon in any language
- Be supportive, calm, and encouraging

{strategy}

{FOCUS_AREAS}

Context from knowledge base (PDFs):{context_text}

Parent's Question: {question}

Please provide a helpful, clear, and supportive answer.

{SINHALA_RESPONSE_RULES}

Prioritize information from the PDFs, but supplement with general knowledge when needed to fully answer the question.

CRITICAL: If you use ANY general knowledge (information not found in the PDF context above), you MUST end your response with this warning: \"{warning}\"
",
        language_name = language.name(),
        style = language.response_style(),
    )
}

/// Fixed persona and obligations, independent of the question.
pub fn system_prompt() -> &'static str {
    "You are a helpful and supportive AI assistant for parents whose children are undergoing speech therapy. Your role is to provide clear, simple, and encouraging guidance about phonological issues, speech therapy, and child speech development.

Key principles:
- Respond in the same language as the user's question (Sinhala or English)
- CRITICAL FOR SINHALA: Use VERY SIMPLE, everyday Sinhala:
  * Use common words from daily conversation
  * Avoid formal, academic, or complex Sinhala
  * Write in a friendly, conversational tone
  * Use short, clear sentences
  * Explain complex ideas simply
- Use simple, parent-friendly language - avoid medical jargon in any language
- Be supportive, calm, and encouraging
- Focus on phonological issues, speech therapy, and child speech development
- Use PDF materials as primary source, supplement with general knowledge when needed
- Maintain high accuracy from PDFs, but provide helpful answers even without 100% exact match
- CRITICAL: If using general knowledge, you MUST include the warning message that it's not from PDF sources and should not be considered medical advice"
}
