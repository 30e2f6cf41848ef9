pub mod error;
pub mod pipeline;
pub mod retriever;
pub mod service;

pub use error::PipelineError;
pub use pipeline::{IndexReport, RagPipeline};
pub use retriever::{score_from_distance, Retriever};
pub use service::{Answer, AnswerSettings, QaService};
