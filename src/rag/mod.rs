pub mod chunker;
pub mod engine;

pub use engine::{IngestFailure, IngestReport, KnowledgeEngine, QueryMode};
