// AgriGPT - plant disease diagnosis with weather-aware treatment advice

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod classifier;
pub mod knowledge;  // Similarity search over past advice (Astra DB)
pub mod weather;
pub mod llm;
pub mod storage;
pub mod report;
pub mod routes;
pub mod middleware;
pub mod utils;

use std::sync::Arc;

use tracing::{info, warn};

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

use agents::{DiagnosisPipeline, StageRunner, StageSettings};
use classifier::RemoteClassifier;
use knowledge::{AstraKnowledgeStore, DisabledKnowledgeStore, KnowledgeStore};
use llm::{LLMProviderConfig, LLM};
use storage::ReportStore;
use types::{AppError, AppResult};
use weather::WeatherClient;

/// Wire the external services described by `config` into shared state
pub async fn build_state(config: Config) -> AppResult<AppState> {
    let api_key = config
        .llm
        .active_api_key()
        .ok_or_else(|| AppError::Internal(format!("No API key for provider {}", config.llm.provider)))?;
    let llm = LLM::new(LLMProviderConfig {
        name: config.llm.provider.clone(),
        api_key,
    })?;

    let knowledge: Arc<dyn KnowledgeStore> = match AstraKnowledgeStore::from_config(&config.knowledge) {
        Some(store) => Arc::new(store),
        None => {
            warn!("Astra DB credentials are missing. Similarity search will not work.");
            Arc::new(DisabledKnowledgeStore)
        }
    };

    let weather = WeatherClient::new(&config.weather)?;
    if config.weather.api_key.is_none() {
        warn!("Weather API key not found. Weather information will not be available.");
    }

    let reports = ReportStore::new(&config.storage.reports_dir);
    reports.load_existing().await?;

    let runner = StageRunner::new(Arc::new(llm), knowledge.clone(), StageSettings::from(&config));
    let pipeline = DiagnosisPipeline::new(
        Arc::new(RemoteClassifier::new(&config.classifier)?),
        Arc::new(weather),
        knowledge,
        runner,
        reports,
    );

    info!(provider = %config.llm.provider, model = %config.llm.model, "Diagnosis pipeline ready");

    Ok(AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    })
}

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
