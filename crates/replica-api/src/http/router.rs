//! Axum router configuration with middleware.
//!
//! Routes:
//! - `GET /`               liveness message
//! - `GET /health`         status and version
//! - `GET /files/tree`     artifact file list
//! - `GET /files/content`  artifact file content
//! - `GET /ws/clone`       observer WebSocket
//! - `/preview/...`        read-only static mount of the output directory,
//!                         with directory listings
//!
//! Middleware: CORS (from `[server].cors_origins`), request tracing.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{MethodRouter, get};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let listing: MethodRouter = get(handlers::preview::directory_listing).with_state(state.clone());
    let preview = ServeDir::new(state.store.root())
        .append_index_html_on_directories(true)
        .fallback(listing);
    let prefix = state.config.output.preview_mount();
    tracing::info!(prefix = %prefix, root = %state.store.root().display(), "preview mount enabled");

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/files/tree", get(handlers::files::file_tree))
        .route("/files/content", get(handlers::files::file_content))
        .route("/ws/clone", get(handlers::clone_ws::clone_ws_handler))
        .nest_service(&prefix, preview)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(%origin, error = %err, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Normalize the preview prefix to `/name` form.
/// GET / - Liveness message.
async fn root() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "message": "Backend is running" }))
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_core::artifact::ArtifactStore;
    use replica_types::config::ReplicaConfig;
    use secrecy::SecretString;
    use serde_json::Value;
    use tempfile::TempDir;

    async fn spawn_app(tmp: &TempDir) -> (String, AppState) {
        let mut config = ReplicaConfig::default();
        config.output.dir = tmp.path().join("cloned_project").display().to_string();
        let state = AppState::init(config, Some(SecretString::from("test-key"))).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    #[tokio::test]
    async fn root_and_health() {
        let tmp = TempDir::new().unwrap();
        let (base, _state) = spawn_app(&tmp).await;

        let body: Value = reqwest::get(format!("{base}/")).await.unwrap().json().await.unwrap();
        assert_eq!(body["message"], "Backend is running");

        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn file_tree_and_content() {
        let tmp = TempDir::new().unwrap();
        let (base, state) = spawn_app(&tmp).await;

        let body: Value = reqwest::get(format!("{base}/files/tree"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["tree"], serde_json::json!([]));

        state.store.reset().await.unwrap();
        state.store.write_document("<h1>Hi</h1>").await.unwrap();
        state.store.write_asset("0123456789.png", b"png").await.unwrap();

        let body: Value = reqwest::get(format!("{base}/files/tree"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            body["tree"],
            serde_json::json!(["assets/0123456789.png", "index.html"])
        );

        let body: Value = reqwest::get(format!("{base}/files/content?path=index.html"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["content"], "<h1>Hi</h1>");
    }

    #[tokio::test]
    async fn file_content_errors() {
        let tmp = TempDir::new().unwrap();
        let (base, state) = spawn_app(&tmp).await;
        state.store.reset().await.unwrap();

        let missing = reqwest::get(format!("{base}/files/content?path=nope.html"))
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
        let body: Value = missing.json().await.unwrap();
        assert_eq!(body["errors"][0]["code"], "FILE_NOT_FOUND");

        let directory = reqwest::get(format!("{base}/files/content?path=assets"))
            .await
            .unwrap();
        assert_eq!(directory.status(), reqwest::StatusCode::NOT_FOUND);

        let escape = reqwest::get(format!("{base}/files/content?path=..%2Fsecret.txt"))
            .await
            .unwrap();
        assert_eq!(escape.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn preview_serves_output_directory() {
        let tmp = TempDir::new().unwrap();
        let (base, state) = spawn_app(&tmp).await;
        state.store.reset().await.unwrap();
        state.store.write_document("<p>preview</p>").await.unwrap();

        let page = reqwest::get(format!("{base}/preview/index.html")).await.unwrap();
        assert!(page.status().is_success());
        assert_eq!(page.text().await.unwrap(), "<p>preview</p>");

        let index = reqwest::get(format!("{base}/preview/")).await.unwrap();
        assert!(index.status().is_success());
        assert_eq!(index.text().await.unwrap(), "<p>preview</p>");
    }

    #[tokio::test]
    async fn preview_lists_directories_without_index() {
        let tmp = TempDir::new().unwrap();
        let (base, state) = spawn_app(&tmp).await;
        state.store.reset().await.unwrap();
        state.store.write_asset("0123456789.png", b"png").await.unwrap();

        let root = reqwest::get(format!("{base}/preview/")).await.unwrap();
        assert!(root.status().is_success());
        let body = root.text().await.unwrap();
        assert!(body.contains("Index of"));
        assert!(body.contains(r#"<a href="assets/">"#));

        let assets = reqwest::get(format!("{base}/preview/assets/")).await.unwrap();
        assert!(assets.status().is_success());
        assert!(assets.text().await.unwrap().contains(r#"<a href="0123456789.png">"#));

        let asset = reqwest::get(format!("{base}/preview/assets/0123456789.png")).await.unwrap();
        assert_eq!(asset.bytes().await.unwrap().as_ref(), b"png");

        let missing = reqwest::get(format!("{base}/preview/nope/")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
