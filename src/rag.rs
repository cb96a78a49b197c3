use anyhow::{Context, Result};
use std::sync::Arc;

use crate::llm::gemini::ChatModel;
use crate::models::{ChatMessage, Document, RagOutput};
use crate::search::retriever::Retriever;

/// Instruction given to the model ahead of every question. `{context}` is
/// replaced by the retrieved documents.
pub const SYSTEM_PROMPT: &str = "You are a medical assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\n{context}";

const CONTEXT_SLOT: &str = "{context}";
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// A system message with a `{context}` slot followed by the user's input.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    /// Stuff every document into the context slot and append the user turn.
    pub fn render(&self, docs: &[Document], input: &str) -> Vec<ChatMessage> {
        let context = docs
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);

        vec![
            ChatMessage::system(self.system.replace(CONTEXT_SLOT, &context)),
            ChatMessage::user(input),
        ]
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT)
    }
}

/// Retrieval followed by answer generation. Built once at startup and shared
/// read-only between requests.
pub struct RagChain {
    retriever: Retriever,
    prompt: PromptTemplate,
    llm: Arc<dyn ChatModel>,
}

impl RagChain {
    pub fn new(retriever: Retriever, prompt: PromptTemplate, llm: Arc<dyn ChatModel>) -> Self {
        Self {
            retriever,
            prompt,
            llm,
        }
    }

    pub async fn invoke(&self, input: &str) -> Result<RagOutput> {
        let context = self.retriever.retrieve(input).await?;
        tracing::debug!("Retrieved {} documents", context.len());

        let messages = self.prompt.render(&context, input);
        let answer = self
            .llm
            .generate(&messages)
            .await
            .with_context(|| format!("{} failed to generate an answer", self.llm.model()))?;

        Ok(RagOutput {
            input: input.to_string(),
            context,
            answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::embeddings::Embedder;
    use crate::search::pinecone::VectorIndex;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn doc(id: &str, text: &str, score: f32) -> Document {
        Document {
            id: id.into(),
            text: text.into(),
            score,
        }
    }

    #[test]
    fn test_render_stuffs_documents() {
        let template = PromptTemplate::new("Context:\n{context}");
        let msgs = template.render(
            &[doc("1", "first", 0.9), doc("2", "second", 0.8)],
            "What is diabetes?",
        );
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[0].content, "Context:\nfirst\n\nsecond");
        assert_eq!(msgs[1], ChatMessage::user("What is diabetes?"));
    }

    #[test]
    fn test_render_without_documents() {
        let msgs = PromptTemplate::default().render(&[], "hi");
        assert!(msgs[0].content.ends_with("concise.\n\n"));
        assert!(!msgs[0].content.contains(CONTEXT_SLOT));
    }

    #[test]
    fn test_user_input_is_not_templated() {
        let msgs = PromptTemplate::default().render(&[doc("1", "ctx", 1.0)], "{context}");
        assert_eq!(msgs[1].content, "{context}");
    }

    #[test]
    fn test_default_prompt_is_medical() {
        assert!(SYSTEM_PROMPT.contains("medical assistant"));
        assert!(SYSTEM_PROMPT.contains(CONTEXT_SLOT));
    }

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct StubIndex;

    #[async_trait]
    impl VectorIndex for StubIndex {
        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<Document>> {
            Ok(vec![doc("p12", "Diabetes is a chronic condition.", 0.88)])
        }
    }

    #[derive(Default)]
    struct RecordingModel {
        seen: Mutex<Vec<ChatMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
            *self.seen.lock() = messages.to_vec();
            if self.fail {
                anyhow::bail!("429 Too Many Requests");
            }
            Ok("Diabetes is a metabolic disorder.".into())
        }

        fn model(&self) -> &str {
            "stub-model"
        }
    }

    fn chain(model: Arc<RecordingModel>) -> RagChain {
        let retriever = Retriever::new(Arc::new(StubEmbedder), Arc::new(StubIndex), 3);
        RagChain::new(retriever, PromptTemplate::default(), model)
    }

    #[tokio::test]
    async fn test_invoke_passes_context_to_model() {
        let model = Arc::new(RecordingModel::default());
        let out = chain(model.clone()).invoke("What is diabetes?").await.unwrap();

        assert_eq!(out.answer, "Diabetes is a metabolic disorder.");
        assert_eq!(out.input, "What is diabetes?");
        assert_eq!(out.context.len(), 1);

        let seen = model.seen.lock();
        assert!(seen[0].content.contains("Diabetes is a chronic condition."));
        assert_eq!(seen[1].content, "What is diabetes?");
    }

    #[tokio::test]
    async fn test_invoke_wraps_model_error() {
        let model = Arc::new(RecordingModel {
            fail: true,
            ..Default::default()
        });
        let err = chain(model).invoke("q").await.unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("stub-model failed to generate an answer"));
        assert!(text.contains("429 Too Many Requests"));
    }
}
