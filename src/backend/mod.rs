pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::{probe_endpoint, HttpBackend};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// The two capabilities the knowledge engine needs from the model-serving
/// endpoints. One implementation speaks the OpenAI-compatible HTTP
/// protocol; tests substitute an in-memory fake.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generate text for a prompt, with an optional system prompt and
    /// prior conversation turns.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        history: &[Message],
    ) -> Result<String>;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic in-memory backend. Embeddings hash the input text so
    /// identical texts land on identical vectors; generation echoes the
    /// prompt so assertions can look for grounded context.
    pub struct FakeBackend {
        pub dimensions: usize,
        pub fail_generation: bool,
        pub generate_calls: AtomicUsize,
    }

    impl FakeBackend {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                fail_generation: false,
                generate_calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(dimensions: usize) -> Self {
            Self {
                fail_generation: true,
                ..Self::new(dimensions)
            }
        }

        fn embed_one(&self, text: &str) -> Vec<f32> {
            let mut vector = vec![0.0f32; self.dimensions];
            for (i, byte) in text.bytes().enumerate() {
                vector[i % self.dimensions] += byte as f32 / 255.0;
            }
            let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in &mut vector {
                    *x /= norm;
                }
            }
            vector
        }
    }

    #[async_trait]
    impl ModelBackend for FakeBackend {
        async fn generate(
            &self,
            prompt: &str,
            system_prompt: Option<&str>,
            _history: &[Message],
        ) -> Result<String> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_generation {
                anyhow::bail!("model endpoint unavailable");
            }
            Ok(format!(
                "[fake answer; system={}] {}",
                system_prompt.is_some(),
                prompt.chars().take(200).collect::<String>()
            ))
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| self.embed_one(t)).collect())
        }
    }
}
