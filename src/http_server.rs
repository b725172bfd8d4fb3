/// HTTP Server Module
///
/// Provides HTTP endpoints for checking bot status, reading the last analysis
/// report and forcing a cycle.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::bot::{CycleOutcome, TrendsBot};

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<TrendsBot>,
    pub admin_secret: Option<String>,
}

/// Create and configure the HTTP server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_endpoint))
        .route("/report", get(report_endpoint))
        .route("/force-post", post(force_post_endpoint))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "crypto_trends_bot",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn status_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.bot.status().await;
    Json(serde_json::json!(status))
}

/// Last analysis report, `null` before the first completed analysis
async fn report_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let report = state.bot.analysis_report().await;
    Json(serde_json::json!(report))
}

/// Force a cycle endpoint
async fn force_post_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, StatusCode> {
    // Check authentication if admin_secret is set
    if let Some(secret) = &state.admin_secret {
        let token = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if token != secret.as_str() {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    log::info!("Cycle triggered via HTTP endpoint");

    let body = match state.bot.force_post().await {
        Ok(CycleOutcome::Published(post)) => serde_json::json!({
            "status": "published",
            "id": post.id,
            "text": post.text
        }),
        Ok(CycleOutcome::NoTopics) => serde_json::json!({ "status": "no_topics" }),
        Ok(CycleOutcome::CapReached) => serde_json::json!({ "status": "daily_cap_reached" }),
        Err(e) => {
            log::error!("Forced cycle failed: {}", e);
            serde_json::json!({
                "status": "error",
                "error": e.to_string()
            })
        }
    };

    Ok(Json(body))
}

/// Start the HTTP server
pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind HTTP server")?;

    log::info!("HTTP server listening on port {}", port);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::error::BotResult;
    use crate::generation::tests::FakeGenerator;
    use crate::trends::tests::FakeSearch;
    use crate::twitter::{PostingApi, PublishedPost};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct EchoPosting;

    #[async_trait]
    impl PostingApi for EchoPosting {
        async fn post_tweet(&self, text: &str) -> BotResult<PublishedPost> {
            Ok(PublishedPost {
                id: "99".into(),
                text: text.into(),
            })
        }
    }

    fn state(admin_secret: Option<&str>) -> AppState {
        let bot = TrendsBot::new(
            test_config(),
            Arc::new(FakeSearch {
                calls: Mutex::new(Vec::new()),
                failing: Vec::new(),
            }),
            Arc::new(EchoPosting),
            Arc::new(FakeGenerator::replying("gm")),
        );
        AppState {
            bot: Arc::new(bot),
            admin_secret: admin_secret.map(str::to_string),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = create_router(state(None))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn report_is_null_before_first_cycle() {
        let response = create_router(state(None))
            .oneshot(Request::builder().uri("/report").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await.is_null());
    }

    #[tokio::test]
    async fn force_post_requires_secret() {
        let app = create_router(state(Some("s3cret")));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/force-post")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/force-post")
                    .header("Authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "published");
        assert_eq!(body["id"], "99");
    }

    #[tokio::test]
    async fn status_after_forced_cycle() {
        let state = state(None);
        state.bot.force_post().await.unwrap();

        let response = create_router(state)
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["post_count"], 1);
        assert_eq!(body["max_posts_per_day"], 2);
        assert_eq!(body["is_running"], false);
    }
}
