use anyhow::{Context, Result};
use std::sync::Arc;

use crate::llm::embeddings::Embedder;
use crate::models::Document;
use crate::search::pinecone::VectorIndex;

/// Top-k similarity retriever: embed the query, then ask the index for its
/// nearest neighbours.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, k: usize) -> Self {
        Self {
            embedder,
            index,
            k: k.max(1),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let mut docs = self
            .index
            .query(&embedding, self.k)
            .await
            .context("Vector search failed")?;

        docs.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        docs.truncate(self.k);
        Ok(docs)
    }
}
