//! HTTP API Layer
//!
//! This crate provides the REST API for the billing core using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Reconciliation and read endpoints over the store port
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Reconciliation taxonomy mapped to HTTP statuses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(store, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_billing::BillingStore;

use crate::config::ApiConfig;
use crate::handlers::{billing, health};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BillingStore>,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(store: Arc<dyn BillingStore>, config: ApiConfig) -> Router {
    let state = AppState { store, config };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let invoice_routes = Router::new()
        .route("/:id", get(billing::get_invoice))
        .route("/:id/payments", get(billing::list_payments))
        .route("/:id/reconcile", post(billing::reconcile_invoice));

    let member_routes = Router::new().route("/:id/credit", get(billing::get_credit_account));

    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .nest("/members", member_routes);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
