//! Code Snippet MCP - a code knowledge base backed by Qdrant
//!
//! Library modules for the MCP server and the Qdrant conformance harness

pub mod config;
pub mod embeddings;
pub mod harness;
pub mod logging;
pub mod monitoring;
pub mod notes;
pub mod quality;
pub mod records;
pub mod retry;
pub mod tools;
pub mod vector_store;
