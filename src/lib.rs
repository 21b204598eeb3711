//! Venue Reservation API Library
//!
//! Reservation requests for shared venues: availability checks, the
//! approval lifecycle, per-venue slot bookkeeping and notification mail.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    /// Items per page, capped by configuration
    pub limit: Option<u64>,
}

fn default_page() -> u64 {
    1
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    let reservations = Router::new()
        .route(
            "/reservations",
            get(handlers::reservations::list_reservations)
                .post(handlers::reservations::create_reservation),
        )
        .route(
            "/reservations/pending",
            get(handlers::reservations::pending_reservations),
        )
        .route(
            "/reservations/by-reference/:reference",
            get(handlers::reservations::get_reservation_by_reference),
        )
        .route(
            "/reservations/:id",
            get(handlers::reservations::get_reservation),
        )
        .route(
            "/reservations/:id/transition",
            post(handlers::reservations::transition_reservation),
        )
        .route(
            "/reservations/:id/approve",
            post(handlers::reservations::approve_reservation),
        )
        .route(
            "/reservations/:id/disapprove",
            post(handlers::reservations::disapprove_reservation),
        )
        .route(
            "/reservations/:id/cancel",
            post(handlers::reservations::cancel_reservation),
        );

    let venues = Router::new()
        .route(
            "/venues",
            get(handlers::venues::list_venues).post(handlers::venues::create_venue),
        )
        .route("/venues/:id", get(handlers::venues::get_venue))
        .route(
            "/venues/:id/schedule",
            get(handlers::venues::venue_schedule),
        )
        .route(
            "/venues/:id/availability",
            get(handlers::venues::venue_availability),
        );

    let catalog = Router::new()
        .route(
            "/departments",
            get(handlers::catalog::list_departments).post(handlers::catalog::create_department),
        )
        .route(
            "/facilities",
            get(handlers::catalog::list_facilities).post(handlers::catalog::create_facility),
        );

    Router::new()
        .merge(reservations)
        .merge(venues)
        .merge(catalog)
}

/// Application router with health check, Swagger UI, tracing and request ids.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .route("/health", get(handlers::health::health_check))
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(middleware::from_fn(crate::tracing::request_id_middleware))
        .with_state(state)
}
