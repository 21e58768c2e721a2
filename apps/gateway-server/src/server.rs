//! HTTP Server implementation

use anyhow::{Context, Result};
use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use gateway_api::build_router;

use crate::app::AppState;
use crate::cli::Args;

pub struct Server {
    args: Args,
    state: AppState,
}

impl Server {
    pub fn new(args: Args, state: AppState) -> Result<Self> {
        Ok(Self { args, state })
    }

    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.args.port));

        // Build HTTP router
        let app = self.build_http_router();

        info!("HTTP server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind HTTP server")?;

        axum::serve(listener, app.into_make_service())
            .await
            .context("HTTP server error")?;

        Ok(())
    }

    fn build_http_router(&self) -> Router {
        // `/chat` and the pipeline's own `/health` come from gateway-api;
        // this binary only adds the process-level root route.
        let gateway_router = build_router(self.state.api_state.clone());

        Router::new()
            .route("/", get(root))
            .merge(gateway_router)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}

// Route handlers

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "LLM Safety Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_root_handler() {
        let response = root().await;
        assert_eq!(response.0["service"], "LLM Safety Gateway");
    }
}
