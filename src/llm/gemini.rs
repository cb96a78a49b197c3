use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::models::ChatMessage;

/// A hosted chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation and return the model's reply text.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    fn model(&self) -> &str;
}

/// Google Gemini via the Generative Language `generateContent` API.
pub struct GeminiChat {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiChat {
    pub fn new(client: reqwest::Client, config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("GEMINI_API_KEY is not set")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// System turns go to `systemInstruction`; assistant turns use Gemini's
/// `model` role.
fn build_request(messages: &[ChatMessage]) -> GenerateRequest {
    let system: Vec<Part> = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| Part {
            text: m.content.clone(),
        })
        .collect();

    let contents = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| Content {
            role: Some(if m.role == "assistant" { "model" } else { "user" }.to_string()),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    GenerateRequest {
        system_instruction: (!system.is_empty()).then(|| Content {
            role: None,
            parts: system,
        }),
        contents,
    }
}

fn extract_answer(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        anyhow::bail!("Gemini blocked the prompt: {reason}");
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .context("Gemini returned no candidates")?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        anyhow::bail!("Gemini returned no text (finish reason: {reason})");
    }
    Ok(text)
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let req = build_request(messages);

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .context("Failed to call Gemini generateContent API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API returned {status}: {body}");
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        extract_answer(body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
