//! # medical-chatbot
//!
//! A small web service answering medical questions with retrieval-augmented
//! generation over a hosted Pinecone index and Google Gemini.
//!
//! ## Architecture
//!
//! ```text
//!   POST /get {"message"}
//!          │
//!          ▼
//!   ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐
//!   │  Embeddings  │ ─▶ │   Pinecone   │ ─▶ │  Prompt (top 3   │
//!   │ (all-MiniLM) │    │  query top-k │    │  docs stuffed)   │
//!   └──────────────┘    └──────────────┘    └────────┬─────────┘
//!                                                    ▼
//!                                           ┌──────────────────┐
//!                                           │ Gemini 2.5 Pro   │
//!                                           └────────┬─────────┘
//!                                                    ▼
//!                                            {"answer": "..."}
//! ```
//!
//! The chain is wired once by [`state::bootstrap`] and shared read-only by
//! every request. A failed bootstrap stops the process before it listens.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration: secrets, index name, models
//! - [`models`] - Shared data types: `Document`, `ChatMessage`, request/response bodies
//! - [`llm::embeddings`] - Query embeddings via Ollama or OpenAI-compatible APIs
//! - [`llm::gemini`] - Gemini `generateContent` chat client
//! - [`search::pinecone`] - Pinecone index resolution and similarity query
//! - [`search::retriever`] - Top-k similarity retriever
//! - [`rag`] - Prompt template and the retrieval-then-generation chain
//! - [`api`] - Axum router and handlers
//! - [`state`] - Startup wiring and shared application state

pub mod api;
pub mod config;
pub mod llm;
pub mod models;
pub mod rag;
pub mod search;
pub mod state;
