use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::{Message, ModelBackend};
use crate::config::Config;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the two OpenAI-compatible model-serving endpoints: chat
/// completions on one, embeddings on the other.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    llm_base: String,
    llm_model: String,
    embed_base: String,
    embed_model: String,
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
    n: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            llm_base: config.llm_endpoint(),
            llm_model: config.llm.model.clone(),
            embed_base: config.embedding_endpoint(),
            embed_model: config.embedding.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            top_p: config.llm.top_p,
        }
    }

    pub async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest {
            model: self.llm_model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            n: 1,
        };

        let url = format!("{}/chat/completions", self.llm_base);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let error = response.text().await?;
            anyhow::bail!("completions endpoint error: {}", error);
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("completions endpoint returned no choices"))
    }
}

#[async_trait]
impl ModelBackend for HttpBackend {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        history: &[Message],
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(system) = system_prompt {
            messages.push(Message::system(system));
        }
        messages.extend_from_slice(history);
        messages.push(Message::user(prompt));

        self.chat(messages).await
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: self.embed_model.clone(),
            input: texts.to_vec(),
        };

        let url = format!("{}/embeddings", self.embed_base);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let error = response.text().await?;
            anyhow::bail!("embeddings endpoint error: {}", error);
        }

        let embeddings: EmbeddingsResponse = response.json().await?;

        Ok(embeddings.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Health probe against a model-serving endpoint's model-listing route.
/// True only on HTTP 200; network errors, timeouts and non-200 statuses
/// all map to "unreachable". Never returns an error, no retries.
pub async fn probe_endpoint(client: &Client, base_url: &str) -> bool {
    let url = format!("{}/models", base_url);

    match client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    #[tokio::test]
    async fn probe_reports_online_for_200() {
        let base = serve(Router::new().route(
            "/v1/models",
            get(|| async { axum::Json(serde_json::json!({ "data": [] })) }),
        ))
        .await;

        assert!(probe_endpoint(&Client::new(), &base).await);
    }

    #[tokio::test]
    async fn probe_reports_offline_for_server_error() {
        let base = serve(Router::new().route(
            "/v1/models",
            get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        assert!(!probe_endpoint(&Client::new(), &base).await);
    }

    #[tokio::test]
    async fn probe_reports_offline_for_closed_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = format!("http://{}/v1", addr);
        assert!(!probe_endpoint(&Client::new(), &base).await);
    }

    #[tokio::test]
    async fn probe_reports_offline_for_missing_route() {
        let base = serve(Router::new()).await;
        assert!(!probe_endpoint(&Client::new(), &base).await);
    }
}
