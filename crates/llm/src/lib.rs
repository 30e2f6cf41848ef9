pub mod prompt;
pub mod provider;
pub mod providers;

pub use prompt::{
    build_prompt, detect_language, general_knowledge_warning, generation_error_message, system_prompt,
    Language, NO_CONTEXT_MARKER,
};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
