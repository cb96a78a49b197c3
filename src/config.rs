use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Pinecone index configuration
    pub pinecone: PineconeConfig,
    /// Gemini chat model configuration
    pub gemini: GeminiConfig,
    /// Embeddings provider configuration
    pub embedding: EmbeddingConfig,
    /// Number of documents the retriever hands to the prompt
    pub top_k: usize,
    /// Include upstream error text in 500 responses
    pub expose_error_details: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    /// Required. Sent as the `Api-Key` header.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Name of the pre-existing index to attach to
    pub index_name: String,
    /// Control-plane URL used to resolve the index host
    pub control_url: String,
    /// Namespace queried inside the index ("" is the default namespace)
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Required. Sent as the `x-goog-api-key` header.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the embeddings API
    pub base_url: String,
    pub model: String,
    /// API key (only needed for cloud providers)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Embedding vector dimension, must match the index
    pub dimension: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            pinecone: PineconeConfig::default(),
            gemini: GeminiConfig::default(),
            embedding: EmbeddingConfig::default(),
            top_k: 3,
            expose_error_details: true,
        }
    }
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: "medical-ai-chatbot".to_string(),
            control_url: "https://api.pinecone.io".to_string(),
            namespace: String::new(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-pro".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        // all-minilm is sentence-transformers/all-MiniLM-L6-v2 as packaged by Ollama
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            api_key: None,
            dimension: 384,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Unparseable numeric
    /// and boolean values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("CHATBOT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(val) = lookup("CHATBOT_TOP_K") {
            if let Ok(v) = val.parse::<usize>() {
                if v > 0 {
                    config.top_k = v;
                }
            }
        }
        if let Some(val) = lookup("CHATBOT_EXPOSE_ERROR_DETAILS") {
            if let Some(v) = parse_bool(&val) {
                config.expose_error_details = v;
            }
        }

        // Pinecone
        if let Some(key) = lookup("PINECONE_API_KEY") {
            config.pinecone.api_key = non_empty(key);
        }
        if let Some(name) = lookup("PINECONE_INDEX_NAME") {
            config.pinecone.index_name = name;
        }
        if let Some(url) = lookup("PINECONE_CONTROL_URL") {
            config.pinecone.control_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ns) = lookup("PINECONE_NAMESPACE") {
            config.pinecone.namespace = ns;
        }

        // Gemini
        if let Some(key) = lookup("GEMINI_API_KEY") {
            config.gemini.api_key = non_empty(key);
        }
        if let Some(url) = lookup("GEMINI_BASE_URL") {
            config.gemini.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            config.gemini.model = model;
        }

        // Embeddings
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Some(url) = lookup("EMBEDDING_BASE_URL") {
            config.embedding.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(key) = lookup("EMBEDDING_API_KEY") {
            config.embedding.api_key = non_empty(key);
        }
        if let Some(dim) = lookup("EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.embedding.dimension = d;
            }
        }

        config
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
