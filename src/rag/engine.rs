use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::backend::ModelBackend;
use crate::config::Config;
use crate::loaders::{self, pdf, ScanError};
use crate::rag::chunker::TextChunker;
use crate::storage::{ChunkHit, ChunkRecord, VectorStore};

/// Retrieval mode selector. The names travel verbatim from the UI and CLI
/// into the engine, which owns their retrieval semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Hybrid,
    Local,
    Global,
    Naive,
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryMode::Hybrid => write!(f, "hybrid"),
            QueryMode::Local => write!(f, "local"),
            QueryMode::Global => write!(f, "global"),
            QueryMode::Naive => write!(f, "naive"),
        }
    }
}

impl std::str::FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" => Ok(QueryMode::Hybrid),
            "local" => Ok(QueryMode::Local),
            "global" => Ok(QueryMode::Global),
            "naive" => Ok(QueryMode::Naive),
            _ => Err(format!("Unknown query mode: {}", s)),
        }
    }
}

impl QueryMode {
    /// How many chunks of context feed the answer.
    fn context_limit(&self) -> usize {
        match self {
            QueryMode::Naive => 5,
            QueryMode::Local => 4,
            QueryMode::Global => 10,
            QueryMode::Hybrid => 8,
        }
    }

    fn synthesis_instruction(&self) -> Option<&'static str> {
        match self {
            QueryMode::Naive => None,
            QueryMode::Local => {
                Some("Ground the answer in the specific passages most relevant to the question.")
            }
            QueryMode::Global => {
                Some("Synthesize across all provided passages to capture corpus-wide themes.")
            }
            QueryMode::Hybrid => Some(
                "Ground the answer in the most relevant passages while also \
                 drawing on themes across all provided passages.",
            ),
        }
    }
}

/// Outcome of one best-effort ingestion batch. Each document is an
/// independent unit; a failure on one never aborts the rest.
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<IngestFailure>,
}

#[derive(Debug, Serialize)]
pub struct IngestFailure {
    pub name: String,
    pub error: String,
}

const SYSTEM_PROMPT: &str = r#"You are a helpful assistant that answers questions based on the provided context.
Use the context to provide accurate and relevant answers.
If the context doesn't contain enough information to answer the question, say so."#;

/// The knowledge base: chunking, embedding, chunk persistence and
/// retrieval-augmented answering, driven through a `ModelBackend`.
pub struct KnowledgeEngine {
    backend: Arc<dyn ModelBackend>,
    store: VectorStore,
    chunker: TextChunker,
    config: Config,
}

impl KnowledgeEngine {
    /// Opens the chunk index under the working directory. The embedding
    /// dimension is probed with a test call so the index matches whatever
    /// model the embeddings endpoint is actually serving.
    pub async fn connect(config: &Config, backend: Arc<dyn ModelBackend>) -> Result<Self> {
        let probe = backend.embed(&["dimension probe".to_string()]).await?;
        let dimensions = probe
            .first()
            .map(|v| v.len())
            .filter(|&d| d > 0)
            .ok_or_else(|| anyhow::anyhow!("embeddings endpoint returned an empty vector"))?;

        tracing::info!("Detected embedding dimension: {}", dimensions);

        std::fs::create_dir_all(&config.storage.working_dir)?;
        let index_path = config.storage.working_dir.join("index");

        let store = VectorStore::new(&index_path, "chunks", dimensions).await?;

        Ok(Self {
            backend,
            store,
            chunker: TextChunker::new(config.app.chunk_size, config.app.chunk_overlap),
            config: config.clone(),
        })
    }

    /// Chunks, embeds and persists one document's text. Returns the number
    /// of chunks indexed.
    pub async fn insert(&self, source: &str, text: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.backend.embed(&texts).await?;

        if embeddings.len() != chunks.len() {
            anyhow::bail!(
                "embeddings endpoint returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            );
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkRecord {
                id: uuid::Uuid::new_v4().to_string(),
                source: source.to_string(),
                content: chunk.content.clone(),
                chunk_index: chunk.index as i64,
                created_at: created_at.clone(),
                embedding,
            })
            .collect();

        let count = records.len();
        self.store.insert(records).await?;
        Ok(count)
    }

    /// Best-effort batch over the PDF documents in `dir`, in discovery
    /// order. Documents with no extractable text are skipped with a
    /// warning; extraction and insertion failures are logged and do not
    /// abort the batch.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport, ScanError> {
        let entries = loaders::scan_directory(&self.config, dir)?;

        let mut report = IngestReport::default();

        for entry in entries {
            let is_pdf = entry
                .path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if !is_pdf {
                continue;
            }

            tracing::info!("Processing: {}", entry.name);

            let text = match pdf::extract_text(&entry.path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Error processing {}: {}", entry.name, e);
                    report.failed.push(IngestFailure {
                        name: entry.name,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if text.trim().is_empty() {
                tracing::warn!("No content extracted from {}", entry.name);
                report.skipped.push(entry.name);
                continue;
            }

            match self.insert(&entry.name, &text).await {
                Ok(chunks) => {
                    tracing::info!("Processed {}: {} chunks", entry.name, chunks);
                    report.processed.push(entry.name);
                }
                Err(e) => {
                    tracing::error!("Error processing {}: {}", entry.name, e);
                    report.failed.push(IngestFailure {
                        name: entry.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn search(&self, question: &str, limit: usize) -> Result<Vec<ChunkHit>> {
        let query_embedding = self
            .backend
            .embed(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embeddings endpoint returned no vector"))?;

        self.store.search(&query_embedding, limit).await
    }

    /// Retrieval-augmented answer. With nothing indexed yet the question
    /// goes straight to the completions endpoint.
    pub async fn query(&self, question: &str, mode: QueryMode) -> Result<String> {
        let results = self.search(question, mode.context_limit()).await?;

        if results.is_empty() {
            return self.backend.generate(question, None, &[]).await;
        }

        let context = results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[Context {} - {}]:\n{}\n", i + 1, r.source, r.content))
            .collect::<Vec<_>>()
            .join("\n---\n");

        let system_prompt = match mode.synthesis_instruction() {
            Some(instruction) => format!("{}\n{}", SYSTEM_PROMPT, instruction),
            None => SYSTEM_PROMPT.to_string(),
        };

        let user_prompt = format!(
            "Context:\n{}\n\nQuestion: {}\n\nPlease answer the question using the context provided.",
            context, question
        );

        self.backend
            .generate(&user_prompt, Some(&system_prompt), &[])
            .await
    }

    /// Query surface for the dashboard and CLI: always yields a
    /// displayable string, never a fault.
    pub async fn answer(&self, question: &str, mode: QueryMode) -> String {
        match self.query(question, mode).await {
            Ok(answer) => answer,
            Err(e) => format!("Error processing query: {}", e),
        }
    }

    pub async fn chunk_count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub async fn sources(&self) -> Result<Vec<String>> {
        self.store.list_sources().await
    }
}
