// Astra DB Data API client
// Collections are expected to use server-side vectorize, so documents carry
// `$vectorize` text instead of precomputed embeddings.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{KnowledgeRecord, KnowledgeStore};
use crate::config::KnowledgeConfig;
use crate::types::{AppError, AppResult};

const API_PATH: &str = "api/json/v1";

#[derive(Deserialize)]
struct DataApiResponse {
    #[serde(default)]
    data: Option<FindData>,
    #[serde(default)]
    errors: Option<Vec<DataApiError>>,
}

#[derive(Deserialize)]
struct FindData {
    #[serde(default)]
    documents: Vec<Value>,
}

#[derive(Deserialize)]
struct DataApiError {
    message: String,
}

pub struct AstraKnowledgeStore {
    client: Client,
    collection_url: String,
    token: String,
}

impl AstraKnowledgeStore {
    /// Returns `None` when endpoint or token is missing
    pub fn from_config(config: &KnowledgeConfig) -> Option<Self> {
        let endpoint = config.api_endpoint.as_ref()?;
        let token = config.token.as_ref()?;
        Some(Self::new(endpoint, token, &config.keyspace, &config.collection))
    }

    pub fn new(endpoint: &str, token: &str, keyspace: &str, collection: &str) -> Self {
        Self {
            client: Client::new(),
            collection_url: format!(
                "{}/{}/{}/{}",
                endpoint.trim_end_matches('/'),
                API_PATH,
                keyspace,
                collection
            ),
            token: token.to_string(),
        }
    }

    async fn command(&self, body: Value) -> AppResult<DataApiResponse> {
        let response = self
            .client
            .post(&self.collection_url)
            .header("Token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Knowledge(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Knowledge(format!("Data API returned {}: {}", status, text)));
        }

        let parsed: DataApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Knowledge(format!("invalid Data API response: {}", e)))?;

        if let Some(errors) = parsed.errors.as_ref().filter(|e| !e.is_empty()) {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppError::Knowledge(message));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl KnowledgeStore for AstraKnowledgeStore {
    async fn similarity_search(&self, query: &str, k: usize) -> AppResult<Vec<KnowledgeRecord>> {
        debug!(query = %query, k, "Knowledge similarity search");

        let body = json!({
            "find": {
                "sort": { "$vectorize": query },
                "projection": { "content": 1, "query": 1 },
                "options": { "limit": k }
            }
        });
        let response = self.command(body).await?;

        let records: Vec<KnowledgeRecord> = response
            .data
            .map(|d| d.documents)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|doc| serde_json::from_value(doc).ok())
            .collect();

        info!(query = %query, hits = records.len(), "Knowledge search complete");
        Ok(records)
    }

    async fn store(&self, query: &str, content: &str) -> AppResult<()> {
        let body = json!({
            "insertOne": {
                "document": {
                    "content": content,
                    "query": query,
                    "$vectorize": content
                }
            }
        });
        self.command(body).await?;
        info!(query = %query, content_len = content.len(), "Stored response in knowledge base");
        Ok(())
    }
}
