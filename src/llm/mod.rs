pub mod embeddings;
pub mod gemini;
