use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PineconeConfig;
use crate::models::Document;

const API_VERSION: &str = "2024-07";

/// Metadata key holding the chunk text, as written at indexing time.
const TEXT_KEY: &str = "text";

/// Nearest-neighbour search over stored documents.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` documents closest to `vector`, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Document>>;
}

/// A pre-existing Pinecone serverless or pod index.
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    name: String,
    host: String,
    namespace: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
    dimension: usize,
    status: Option<IndexStatus>,
}

#[derive(Deserialize)]
struct IndexStatus {
    ready: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PineconeIndex {
    /// Resolve an existing index by name. Fails if the key is rejected, the
    /// index does not exist, or it is not ready to serve queries.
    pub async fn connect(client: reqwest::Client, config: &PineconeConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("PINECONE_API_KEY is not set")?;
        let url = format!("{}/indexes/{}", config.control_url, config.index_name);

        let resp = client
            .get(&url)
            .header("Api-Key", &api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .context("Failed to call Pinecone describe_index API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Pinecone index '{}' unavailable ({status}): {body}",
                config.index_name
            );
        }

        let described: DescribeIndexResponse = resp
            .json()
            .await
            .context("Failed to parse Pinecone describe_index response")?;

        if let Some(status) = described.status {
            if !status.ready {
                anyhow::bail!("Pinecone index '{}' is not ready", config.index_name);
            }
        }

        Ok(Self {
            client,
            api_key,
            name: config.index_name.clone(),
            host: normalize_host(&described.host),
            namespace: config.namespace.clone(),
            dimension: described.dimension,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Document>> {
        let req = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: &self.namespace,
        };

        let resp = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&req)
            .send()
            .await
            .context("Failed to call Pinecone query API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone query returned {status}: {body}");
        }

        let body: QueryResponse = resp
            .json()
            .await
            .context("Failed to parse Pinecone query response")?;

        Ok(into_documents(body))
    }
}

/// The control plane reports a bare hostname; local emulators may report a
/// full URL.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn into_documents(resp: QueryResponse) -> Vec<Document> {
    resp.matches
        .into_iter()
        .filter_map(|m| {
            let text = m
                .metadata
                .as_ref()
                .and_then(|meta| meta.get(TEXT_KEY))
                .and_then(|v| v.as_str())?
                .to_string();
            Some(Document {
                id: m.id,
                text,
                score: m.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_host() {
        assert_eq!(
            normalize_host("medical-ai-chatbot-abc.svc.aped-4627-b74a.pinecone.io"),
            "https://medical-ai-chatbot-abc.svc.aped-4627-b74a.pinecone.io"
        );
    }

    #[test]
    fn test_normalize_full_url() {
        assert_eq!(normalize_host("http://localhost:5081/"), "http://localhost:5081");
    }

    #[test]
    fn test_matches_become_documents() {
        let body = r#"{
            "matches": [
                {"id": "a", "score": 0.91, "metadata": {"text": "Diabetes mellitus is...", "source": "book.pdf"}},
                {"id": "b", "score": 0.85, "metadata": {"text": "Insulin regulates..."}}
            ],
            "namespace": ""
        }"#;
        let docs = into_documents(serde_json::from_str(body).unwrap());
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].text, "Diabetes mellitus is...");
        assert!((docs[1].score - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_matches_without_text_skipped() {
        let body = r#"{"matches": [
            {"id": "a", "score": 0.9},
            {"id": "b", "score": 0.8, "metadata": {"page": 3}},
            {"id": "c", "score": 0.7, "metadata": {"text": "kept"}}
        ]}"#;
        let docs = into_documents(serde_json::from_str(body).unwrap());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "c");
    }

    #[test]
    fn test_empty_response() {
        let docs = into_documents(serde_json::from_str("{}").unwrap());
        assert!(docs.is_empty());
    }

    #[test]
    fn test_query_request_wire_format() {
        let req = QueryRequest {
            vector: &[0.5, 0.25],
            top_k: 3,
            include_metadata: true,
            include_values: false,
            namespace: "",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["topK"], 3);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["vector"], serde_json::json!([0.5, 0.25]));
    }

    #[test]
    fn test_describe_response_parses() {
        let body = r#"{"name":"medical-ai-chatbot","dimension":384,"metric":"cosine",
            "host":"medical-ai-chatbot-x.svc.pinecone.io",
            "status":{"ready":true,"state":"Ready"}}"#;
        let parsed: DescribeIndexResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.dimension, 384);
        assert!(parsed.status.unwrap().ready);
    }
}
