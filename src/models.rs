use serde::{Deserialize, Serialize};

/// A chunk of reference text returned by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// A single chat turn (system, user or assistant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Result of one retrieval-then-generation run.
#[derive(Debug, Clone, Serialize)]
pub struct RagOutput {
    pub input: String,
    pub context: Vec<Document>,
    pub answer: String,
}

/// Body of `/get`, decoded from JSON or a form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    pub message: Option<String>,
}

/// Every `/get` response, success or failure, has this shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AskResponse {
    pub answer: String,
}
