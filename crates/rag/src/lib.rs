//! Retrieval for Rulegate.
//!
//! Provides the retrieval collaborator of the ask pipeline:
//! - `Retriever` trait returning scored, deduplicated passages
//! - `VertexRagClient` backed by the Vertex AI RAG Engine
//! - Corpus naming for response metadata

pub mod corpus;
pub mod retriever;
pub mod vertex;

pub use corpus::corpus_name;
pub use retriever::{dedup_by_text, Retriever};
pub use vertex::VertexRagClient;
