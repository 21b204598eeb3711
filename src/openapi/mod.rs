use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Venue Reservation API",
        version = "1.0.0",
        description = r#"
# Venue Reservation API

Request, approve and track venue reservations.

## Lifecycle

A request starts as `Pending for Approval`, or `Approved` when the venue is
self-service. Pending requests can be approved, disapproved or cancelled;
approved requests can be cancelled. Any other move is rejected with `409`.

An interval that touches an existing reservation at a boundary counts as a
conflict.

## Identity

Mutating endpoints read the caller from the `x-user-email` and
`x-user-name` headers set by the fronting gateway.

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100).
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "reservations", description = "Reservation requests and their lifecycle"),
        (name = "venues", description = "Venues, schedules and availability"),
        (name = "catalog", description = "Departments and facilities"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Reservations
        crate::handlers::reservations::create_reservation,
        crate::handlers::reservations::list_reservations,
        crate::handlers::reservations::pending_reservations,
        crate::handlers::reservations::get_reservation,
        crate::handlers::reservations::get_reservation_by_reference,
        crate::handlers::reservations::transition_reservation,
        crate::handlers::reservations::approve_reservation,
        crate::handlers::reservations::disapprove_reservation,
        crate::handlers::reservations::cancel_reservation,

        // Venues
        crate::handlers::venues::list_venues,
        crate::handlers::venues::create_venue,
        crate::handlers::venues::get_venue,
        crate::handlers::venues::venue_schedule,
        crate::handlers::venues::venue_availability,

        // Catalog
        crate::handlers::catalog::list_departments,
        crate::handlers::catalog::create_department,
        crate::handlers::catalog::list_facilities,
        crate::handlers::catalog::create_facility,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::entities::reservation_request::ReservationStatus,
            crate::entities::reservation_request::ReservationEvent,
            crate::entities::reservation_participant::ParticipantType,
            crate::models::TimeSlot,

            crate::services::reservations::CreateReservationCommand,
            crate::services::reservations::FacilityItemInput,
            crate::services::reservations::ParticipantInput,
            crate::services::reservations::AttachmentInput,
            crate::services::reservations::CreatedReservation,
            crate::services::reservations::ReservationResponse,
            crate::services::reservations::ReservationDetails,
            crate::services::reservations::TransitionOutcome,
            crate::handlers::reservations::TransitionRequest,
            crate::handlers::reservations::ReasonRequest,

            crate::services::availability::AvailabilityReport,
            crate::services::catalog::CreateVenueRequest,
            crate::services::catalog::VenueResponse,
            crate::services::catalog::VenueSchedule,
            crate::services::catalog::CreateDepartmentRequest,
            crate::services::catalog::DepartmentResponse,
            crate::services::catalog::CreateFacilityRequest,
            crate::services::catalog::FacilityResponse,

            crate::handlers::health::HealthResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_lifecycle_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Venue Reservation API"));
        assert!(json.contains("/api/v1/reservations/{id}/approve"));
        assert!(json.contains("/api/v1/venues/{id}/availability"));
    }
}
