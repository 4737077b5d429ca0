use axum::{extract::State, routing::get, Json, Router};
use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        llm_provider: state.config.llm.provider.clone(),
        weather: state.pipeline.weather_enabled(),
        knowledge_base: state.pipeline.knowledge_enabled(),
    };

    Json(response)
}
