pub mod pinecone;
pub mod retriever;
