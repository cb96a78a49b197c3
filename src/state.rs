use anyhow::Context;
use std::sync::Arc;

use crate::config::Config;
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::llm::gemini::GeminiChat;
use crate::rag::{PromptTemplate, RagChain};
use crate::search::pinecone::PineconeIndex;
use crate::search::retriever::Retriever;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<RagChain>,
    pub expose_error_details: bool,
}

impl AppState {
    pub fn new(chain: RagChain, expose_error_details: bool) -> Self {
        Self {
            chain: Arc::new(chain),
            expose_error_details,
        }
    }
}

/// Wire up the retrieval chain. Any failure here is fatal: the caller must
/// not start serving.
pub async fn bootstrap(config: &Config) -> anyhow::Result<AppState> {
    if config.pinecone.api_key.is_none() {
        anyhow::bail!("PINECONE_API_KEY is not set");
    }
    if config.gemini.api_key.is_none() {
        anyhow::bail!("GEMINI_API_KEY is not set");
    }
    tracing::info!("API keys loaded");

    let http_client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(120))
        .build()?;

    let embedder = HttpEmbedder::new(http_client.clone(), config.embedding.clone())
        .context("Failed to build embeddings client")?;
    tracing::info!(
        "Embeddings: {} ({}, {} dims)",
        config.embedding.model,
        config.embedding.provider,
        embedder.dimension()
    );

    tracing::info!("Connecting to Pinecone index: {}", config.pinecone.index_name);
    let index = PineconeIndex::connect(http_client.clone(), &config.pinecone)
        .await
        .context("Failed to connect to vector index")?;
    tracing::info!(
        "Pinecone index {} ready at {} ({} dims)",
        index.name(),
        index.host(),
        index.dimension()
    );

    if index.dimension() != embedder.dimension() {
        anyhow::bail!(
            "Index '{}' stores {}-dimensional vectors but the embedding model produces {}",
            index.name(),
            index.dimension(),
            embedder.dimension()
        );
    }

    let retriever = Retriever::new(Arc::new(embedder), Arc::new(index), config.top_k);
    let llm = GeminiChat::new(http_client, &config.gemini)?;
    let chain = RagChain::new(retriever, PromptTemplate::default(), Arc::new(llm));

    tracing::info!(
        "RAG chain ready (top_k={}, model={})",
        config.top_k,
        config.gemini.model
    );

    Ok(AppState::new(chain, config.expose_error_details))
}
