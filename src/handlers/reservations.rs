use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::reservation_request::ReservationEvent,
    errors::ServiceError,
    handlers::common::{paginate, CurrentUser},
    services::reservations::{
        CreateReservationCommand, CreatedReservation, ReservationDetails, ReservationFilter,
        ReservationResponse, TransitionCommand, TransitionOutcome,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub event: ReservationEvent,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    summary = "Create reservation request",
    description = "Submit a venue reservation. Self-service venues are approved immediately.",
    request_body = CreateReservationCommand,
    responses(
        (status = 201, description = "Request created", body = ApiResponse<CreatedReservation>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing identity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Venue or department not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Interval already reserved", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut command): Json<CreateReservationCommand>,
) -> Result<impl IntoResponse, ServiceError> {
    if command.requester_email.trim().is_empty() {
        command.requester_email = user.email.clone();
    }
    if command.requester_name.trim().is_empty() {
        command.requester_name = user.display_name().to_string();
    }

    let created = state.services.reservations.create_request(command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    summary = "List reservation requests",
    description = "Search requests, newest first",
    params(ListQuery, ReservationFilter),
    responses(
        (status = 200, description = "Requests retrieved", body = ApiResponse<PaginatedResponse<ReservationResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ReservationFilter>,
) -> ApiResult<PaginatedResponse<ReservationResponse>> {
    let limit = state.config.page_limit(query.limit);
    let page = query.page.max(1);
    let (items, total) = state
        .services
        .reservations
        .list_requests(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/pending",
    summary = "Approval queue",
    description = "Requests waiting for approval, oldest first",
    params(ListQuery),
    responses(
        (status = 200, description = "Pending requests", body = ApiResponse<PaginatedResponse<ReservationResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn pending_reservations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<ReservationResponse>> {
    let limit = state.config.page_limit(query.limit);
    let page = query.page.max(1);
    let (items, total) = state
        .services
        .reservations
        .pending_for_approval(page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    summary = "Get reservation request",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request with facilities, participants and attachments", body = ApiResponse<ReservationDetails>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReservationDetails> {
    let details = state.services.reservations.get_request_details(id).await?;
    Ok(Json(ApiResponse::success(details)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/by-reference/{reference}",
    summary = "Get reservation by reference number",
    params(("reference" = String, Path, description = "Reference number, e.g. RR-202401-0001")),
    responses(
        (status = 200, description = "Request found", body = ApiResponse<ReservationDetails>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn get_reservation_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<ReservationDetails> {
    let details = state
        .services
        .reservations
        .get_request_by_reference(&reference)
        .await?;
    Ok(Json(ApiResponse::success(details)))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/transition",
    summary = "Apply a lifecycle event",
    description = "Approve, disapprove or cancel a request",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<TransitionOutcome>),
        (status = 401, description = "Missing identity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed, slot taken, or concurrent change", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn transition_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<TransitionOutcome> {
    apply(&state, id, user, request.event, request.reason).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/approve",
    summary = "Approve a pending request",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request approved", body = ApiResponse<TransitionOutcome>),
        (status = 409, description = "Not pending, or the interval is taken", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn approve_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    body: Option<Json<ReasonRequest>>,
) -> ApiResult<TransitionOutcome> {
    apply(&state, id, user, ReservationEvent::Approve, reason(body)).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/disapprove",
    summary = "Disapprove a pending request",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body(content = ReasonRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Request disapproved", body = ApiResponse<TransitionOutcome>),
        (status = 409, description = "Request is not pending", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn disapprove_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    body: Option<Json<ReasonRequest>>,
) -> ApiResult<TransitionOutcome> {
    apply(&state, id, user, ReservationEvent::Disapprove, reason(body)).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/cancel",
    summary = "Cancel a pending or approved request",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body(content = ReasonRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Request cancelled", body = ApiResponse<TransitionOutcome>),
        (status = 409, description = "Request is already closed", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    body: Option<Json<ReasonRequest>>,
) -> ApiResult<TransitionOutcome> {
    apply(&state, id, user, ReservationEvent::Cancel, reason(body)).await
}

fn reason(body: Option<Json<ReasonRequest>>) -> Option<String> {
    body.and_then(|Json(body)| body.reason)
}

async fn apply(
    state: &AppState,
    id: Uuid,
    user: CurrentUser,
    event: ReservationEvent,
    reason: Option<String>,
) -> ApiResult<TransitionOutcome> {
    let outcome = state
        .services
        .reservations
        .transition(
            id,
            TransitionCommand {
                event,
                reason,
                actor: user.email,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}
