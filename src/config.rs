use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub supported_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub working_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "ragdesk".to_string(),
            chunk_size: 1200,
            chunk_overlap: 100,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            model: "context-labs/meta-llama-Llama-3.2-3B-Instruct-FP16".to_string(),
            max_tokens: 1000,
            temperature: 0.1,
            top_p: 1.0,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8001,
            model: "jinaai/jina-embeddings-v4-vllm-retrieval".to_string(),
            dimensions: 768,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("./data"),
            docs_dir: PathBuf::from("./docs_source"),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            supported_extensions: [".pdf", ".txt", ".docx", ".xlsx", ".csv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Built-in defaults, overridable by a `config.toml` in the working
    /// directory.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = PathBuf::from("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn llm_endpoint(&self) -> String {
        format!("http://{}:{}/v1", self.llm.host, self.llm.port)
    }

    pub fn embedding_endpoint(&self) -> String {
        format!("http://{}:{}/v1", self.embedding.host, self.embedding.port)
    }

    /// Creates the working, document-source and log directories.
    /// Idempotent; filesystem errors propagate.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.storage.working_dir)?;
        std::fs::create_dir_all(&self.storage.docs_dir)?;
        std::fs::create_dir_all(&self.storage.log_dir)?;
        Ok(())
    }

    pub fn is_supported_file(&self, path: &Path) -> bool {
        let lowered = path.to_string_lossy().to_lowercase();
        self.supported_extensions
            .iter()
            .any(|ext| lowered.ends_with(ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_file_matches_case_insensitively() {
        let config = Config::default();
        assert!(config.is_supported_file(Path::new("report.pdf")));
        assert!(config.is_supported_file(Path::new("REPORT.PDF")));
        assert!(config.is_supported_file(Path::new("notes/Deep.Dive.Txt")));
        assert!(!config.is_supported_file(Path::new("archive.tar.gz")));
        assert!(!config.is_supported_file(Path::new("")));
    }

    #[test]
    fn endpoints_are_derived_from_host_and_port() {
        let config = Config::default();
        assert_eq!(config.llm_endpoint(), "http://localhost:8000/v1");
        assert_eq!(config.embedding_endpoint(), "http://localhost:8001/v1");
    }

    #[test]
    fn ensure_directories_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.working_dir = tmp.path().join("data");
        config.storage.docs_dir = tmp.path().join("docs");
        config.storage.log_dir = tmp.path().join("logs");

        config.ensure_directories().unwrap();
        config.ensure_directories().unwrap();

        assert!(config.storage.working_dir.is_dir());
        assert!(config.storage.docs_dir.is_dir());
        assert!(config.storage.log_dir.is_dir());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str("[llm]\nport = 9000\n").unwrap();
        assert_eq!(config.llm.port, 9000);
        assert_eq!(config.llm.host, "localhost");
        assert_eq!(config.embedding.port, 8001);
        assert_eq!(config.app.chunk_size, 1200);
    }
}
