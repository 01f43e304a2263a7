//! Retrieval-augmented answering backend for the textbook chatbot.
//!
//! - `rag`: chunking, ingestion and the answer pipeline
//! - `embedding`, `llm`, `vector`: capability gateways to remote services
//! - `history`: chat history persistence used by the request layer
//! - `server`: the HTTP request layer

pub mod core;
pub mod embedding;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod vector;
