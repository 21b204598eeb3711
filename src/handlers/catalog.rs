use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::{
    errors::ServiceError,
    handlers::common::CurrentUser,
    services::catalog::{
        CreateDepartmentRequest, CreateFacilityRequest, DepartmentResponse, FacilityResponse,
    },
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/departments",
    summary = "List departments",
    responses(
        (status = 200, description = "Departments retrieved", body = ApiResponse<Vec<DepartmentResponse>>),
    ),
    tag = "catalog"
)]
pub async fn list_departments(State(state): State<AppState>) -> ApiResult<Vec<DepartmentResponse>> {
    let departments = state.services.catalog.list_departments().await?;
    Ok(Json(ApiResponse::success(
        departments.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/departments",
    summary = "Create department",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = ApiResponse<DepartmentResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing identity", body = crate::errors::ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn create_department(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreateDepartmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let department = state.services.catalog.create_department(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DepartmentResponse::from(department))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/facilities",
    summary = "List active facilities",
    responses(
        (status = 200, description = "Facilities retrieved", body = ApiResponse<Vec<FacilityResponse>>),
    ),
    tag = "catalog"
)]
pub async fn list_facilities(State(state): State<AppState>) -> ApiResult<Vec<FacilityResponse>> {
    let facilities = state.services.catalog.list_facilities().await?;
    Ok(Json(ApiResponse::success(
        facilities.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/facilities",
    summary = "Create facility",
    request_body = CreateFacilityRequest,
    responses(
        (status = 201, description = "Facility created", body = ApiResponse<FacilityResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing identity", body = crate::errors::ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn create_facility(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreateFacilityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let facility = state.services.catalog.create_facility(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FacilityResponse::from(facility))),
    ))
}
