use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::common::{paginate, CurrentUser},
    services::{
        availability::AvailabilityReport,
        catalog::{CreateVenueRequest, VenueFilter, VenueResponse, VenueSchedule},
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Candidate start, RFC 3339
    pub from: DateTime<Utc>,
    /// Candidate end, RFC 3339
    pub to: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VenueListQuery {
    /// Only venues of this approval group
    pub group: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/venues",
    summary = "List venues",
    params(ListQuery, VenueListQuery),
    responses(
        (status = 200, description = "Venues retrieved", body = ApiResponse<PaginatedResponse<VenueResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "venues"
)]
pub async fn list_venues(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<VenueListQuery>,
) -> ApiResult<PaginatedResponse<VenueResponse>> {
    let limit = state.config.page_limit(query.limit);
    let page = query.page.max(1);
    let (venues, total) = state
        .services
        .catalog
        .list_venues(
            VenueFilter {
                group: filter.group,
                include_inactive: filter.include_inactive,
            },
            page,
            limit,
        )
        .await?;

    let items = venues.into_iter().map(VenueResponse::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/v1/venues",
    summary = "Create venue",
    request_body = CreateVenueRequest,
    responses(
        (status = 201, description = "Venue created", body = ApiResponse<VenueResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing identity", body = crate::errors::ErrorResponse),
    ),
    tag = "venues"
)]
pub async fn create_venue(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreateVenueRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let venue = state.services.catalog.create_venue(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(VenueResponse::from(venue))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/venues/{id}",
    summary = "Get venue",
    params(("id" = Uuid, Path, description = "Venue ID")),
    responses(
        (status = 200, description = "Venue found", body = ApiResponse<VenueResponse>),
        (status = 404, description = "Venue not found", body = crate::errors::ErrorResponse),
    ),
    tag = "venues"
)]
pub async fn get_venue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<VenueResponse> {
    let venue = state.services.catalog.get_venue(id).await?;
    Ok(Json(ApiResponse::success(venue.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/venues/{id}/schedule",
    summary = "Reserved intervals of a venue",
    params(("id" = Uuid, Path, description = "Venue ID")),
    responses(
        (status = 200, description = "Current schedule", body = ApiResponse<VenueSchedule>),
        (status = 404, description = "Venue not found", body = crate::errors::ErrorResponse),
    ),
    tag = "venues"
)]
pub async fn venue_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<VenueSchedule> {
    let schedule = state.services.catalog.venue_schedule(id).await?;
    Ok(Json(ApiResponse::success(schedule)))
}

#[utoipa::path(
    get,
    path = "/api/v1/venues/{id}/availability",
    summary = "Check venue availability",
    description = "An interval touching an existing reservation counts as a conflict",
    params(("id" = Uuid, Path, description = "Venue ID"), AvailabilityQuery),
    responses(
        (status = 200, description = "Availability result", body = ApiResponse<AvailabilityReport>),
        (status = 400, description = "Invalid interval", body = crate::errors::ErrorResponse),
        (status = 404, description = "Venue not found", body = crate::errors::ErrorResponse),
    ),
    tag = "venues"
)]
pub async fn venue_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<AvailabilityReport> {
    let report = state
        .services
        .reservations
        .check_availability(id, query.from, query.to)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
