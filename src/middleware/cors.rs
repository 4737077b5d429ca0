// CORS configuration from ALLOWED_ORIGINS

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// `*` allows any origin; unparsable origins are skipped
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn preflight(origins: &[String], origin: &str) -> Option<HeaderValue> {
        let app = Router::new()
            .route("/api/health", get(|| async { "ok" }))
            .layer(cors_layer(origins));
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/health")
                    .header("origin", origin)
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response.headers().get("access-control-allow-origin").cloned()
    }

    #[tokio::test]
    async fn test_listed_origin_allowed() {
        let origins = vec!["http://localhost:8501".to_string()];
        assert_eq!(
            preflight(&origins, "http://localhost:8501").await.unwrap(),
            "http://localhost:8501"
        );
        assert!(preflight(&origins, "http://evil.example").await.is_none());
    }

    #[tokio::test]
    async fn test_wildcard_origin() {
        let origins = vec!["*".to_string()];
        assert_eq!(preflight(&origins, "http://anywhere.example").await.unwrap(), "*");
    }
}
