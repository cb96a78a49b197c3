use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

/// Maximum bytes of query text sent to the embedding API.
/// MiniLM-class models stop attending after 256 word pieces, so anything past
/// this is noise on the wire.
const MAX_EMBED_CHARS: usize = 3_000;

/// Turns query text into a vector comparable with the index contents.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of the vectors `embed` returns.
    fn dimension(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Provider {
    Ollama,
    OpenAi,
}

/// Embeddings over HTTP, either Ollama or an OpenAI-compatible server.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
    provider: Provider,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: EmbeddingConfig) -> Result<Self> {
        let provider = match config.provider.as_str() {
            "ollama" => Provider::Ollama,
            "openai" => Provider::OpenAi,
            other => anyhow::bail!("Unknown embedding provider: {other}"),
        };
        if config.dimension == 0 {
            anyhow::bail!("Embedding dimension must be greater than zero");
        }
        Ok(Self {
            client,
            config,
            provider,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = truncate_for_embedding(text).to_string();
        let embedding = match self.provider {
            Provider::Ollama => embed_ollama(&self.client, &self.config, input).await?,
            Provider::OpenAi => embed_openai(&self.client, &self.config, input).await?,
        };
        if embedding.len() != self.config.dimension {
            anyhow::bail!(
                "Embedding model {} returned {} dimensions, expected {}",
                self.config.model,
                embedding.len(),
                self.config.dimension
            );
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    text: String,
) -> Result<Vec<f32>> {
    let url = format!("{}/api/embed", config.base_url);

    let req = OllamaEmbedRequest {
        model: config.model.clone(),
        input: vec![text],
        truncate: true,
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama embed API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama embed API returned {status}: {body}");
    }

    let body: OllamaEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse Ollama embed response")?;

    body.embeddings
        .into_iter()
        .next()
        .context("No embedding returned")
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    text: String,
) -> Result<Vec<f32>> {
    let url = format!("{}/v1/embeddings", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiEmbedRequest {
        model: config.model.clone(),
        input: vec![text],
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI embed API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI embed API returned {status}: {body}");
    }

    let body: OpenAiEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse OpenAI embed response")?;

    body.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .context("No embedding returned")
}
