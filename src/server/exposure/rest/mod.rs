//! REST exposure
//!
//! Consumes an [`AppHost`] and produces the Axum `Router` serving health
//! checks and every model route under the REST root.

use crate::server::host::AppHost;
use crate::server::router::{build_model_routes, route_not_found};
use anyhow::Result;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Returns a router with:
    /// - Health check routes
    /// - Model routes under the REST root
    /// - A JSON 404 fallback
    pub fn build_router(host: Arc<AppHost>) -> Result<Router> {
        let model_routes = build_model_routes(&host).with_state(host);

        let app = Self::health_routes()
            .merge(model_routes)
            .fallback(route_not_found)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        Ok(app)
    }

    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "jobtrack-api"
        }))
    }
}
