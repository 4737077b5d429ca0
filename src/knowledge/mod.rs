//! Knowledge Tool
//!
//! Similarity search over past plant-disease advice. Embedding and nearest
//! neighbour lookup happen inside the external vector store; this module only
//! exposes search/insert and formats hits as prompt context.

pub mod astra;

pub use astra::AstraKnowledgeStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::AppResult;

pub const NOT_CONFIGURED_CONTEXT: &str = "Knowledge base is not configured.";
pub const NO_MATCHES_CONTEXT: &str = "No relevant treatments found in the knowledge base.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub content: String,
    #[serde(default)]
    pub query: Option<String>,
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn similarity_search(&self, query: &str, k: usize) -> AppResult<Vec<KnowledgeRecord>>;

    async fn store(&self, query: &str, content: &str) -> AppResult<()>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stand-in used when no vector store credentials are configured
pub struct DisabledKnowledgeStore;

#[async_trait]
impl KnowledgeStore for DisabledKnowledgeStore {
    async fn similarity_search(&self, _query: &str, _k: usize) -> AppResult<Vec<KnowledgeRecord>> {
        Ok(Vec::new())
    }

    async fn store(&self, _query: &str, _content: &str) -> AppResult<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Render search hits as a prompt context block
pub fn format_context(records: &[KnowledgeRecord], enabled: bool) -> String {
    if !enabled {
        return NOT_CONFIGURED_CONTEXT.to_string();
    }
    if records.is_empty() {
        return NO_MATCHES_CONTEXT.to_string();
    }
    records
        .iter()
        .map(|r| r.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}
