//! Reservation request lifecycle.
//!
//! Requests are created `Pending` (or `Approved` on self-service venues) and
//! only move through [`ReservationStatus::apply`]. Slot bookkeeping on the
//! venue list and outbound mail hang off each transition.

use chrono::{DateTime, Datelike, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{
        department, facility, reference_counter,
        reservation_attachment, reservation_facility_item,
        reservation_participant::{self, ParticipantType},
        reservation_request::{self, ReservationEvent, ReservationStatus},
        venue,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::TimeSlot,
    services::{
        availability::{AvailabilityChecker, AvailabilityReport},
        email_templates::{NotificationKind, ReservationEmailContext},
        notifications::Notifier,
        timeslots::TimeSlotStore,
    },
};

/// `RR-<year><month, 2 digits>-<running count + 1, 4 digits>`
///
/// `month0` is zero based, `running_count` is the counter stored on the most
/// recently created request.
pub fn format_reference_number(year: i32, month0: u32, running_count: i64) -> String {
    format!("RR-{}{:02}-{:04}", year, month0 + 1, running_count + 1)
}

/// Accepts stored labels ("Pending for Approval") and short names ("pending").
pub fn parse_status_filter(raw: &str) -> Result<ReservationStatus, ServiceError> {
    let raw = raw.trim();
    if let Ok(status) = raw.parse::<ReservationStatus>() {
        return Ok(status);
    }
    match raw.to_ascii_lowercase().as_str() {
        "pending" | "pending for approval" => Ok(ReservationStatus::Pending),
        "approved" => Ok(ReservationStatus::Approved),
        "disapproved" => Ok(ReservationStatus::Disapproved),
        "cancelled" | "canceled" => Ok(ReservationStatus::Cancelled),
        _ => Err(ServiceError::InvalidInput(format!(
            "Unknown reservation status '{}'",
            raw
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FacilityItemInput {
    pub facility_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub asset_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ParticipantInput {
    #[validate(length(min = 1, message = "Participant name is required"))]
    pub name: String,
    pub participant_type: ParticipantType,
    pub organization: Option<String>,
}

/// Metadata of a file already uploaded to external storage
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttachmentInput {
    #[validate(length(min = 1, message = "File name is required"))]
    pub file_name: String,
    pub content_type: Option<String>,
    #[validate(range(min = 0, message = "Size cannot be negative"))]
    pub size_bytes: i64,
    #[validate(url(message = "Storage URL is not valid"))]
    pub storage_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReservationCommand {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Requester name is required"))]
    pub requester_name: String,
    #[serde(default)]
    #[validate(email(message = "Requester e-mail is not valid"))]
    pub requester_email: String,
    pub department_id: Uuid,
    pub venue_id: Uuid,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub layout: Option<String>,
    pub remarks: Option<String>,
    #[serde(default)]
    #[validate]
    pub facilities: Vec<FacilityItemInput>,
    #[serde(default)]
    #[validate]
    pub participants: Vec<ParticipantInput>,
    #[serde(default)]
    #[validate]
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub event: ReservationEvent,
    pub reason: Option<String>,
    /// E-mail of the user acting on the request
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedReservation {
    pub id: Uuid,
    pub reference_number: String,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub reference_number: String,
    pub title: String,
    pub requester_name: String,
    pub requester_email: String,
    pub department_id: Uuid,
    pub venue_id: Uuid,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub layout: Option<String>,
    pub remarks: Option<String>,
    pub status: String,
    pub status_reason: Option<String>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub slot_held: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<reservation_request::Model> for ReservationResponse {
    fn from(model: reservation_request::Model) -> Self {
        Self {
            id: model.id,
            reference_number: model.reference_number,
            title: model.title,
            requester_name: model.requester_name,
            requester_email: model.requester_email,
            department_id: model.department_id,
            venue_id: model.venue_id,
            from_date: model.from_date,
            to_date: model.to_date,
            layout: model.layout,
            remarks: model.remarks,
            status: model.status,
            status_reason: model.status_reason,
            decided_by: model.decided_by,
            decided_at: model.decided_at,
            slot_held: model.slot_held,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FacilityItemResponse {
    pub facility_id: Uuid,
    pub quantity: i32,
    pub asset_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub name: String,
    pub participant_type: String,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub storage_url: String,
}

/// A request with its owned line items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub request: ReservationResponse,
    pub facilities: Vec<FacilityItemResponse>,
    pub participants: Vec<ParticipantResponse>,
    pub attachments: Vec<AttachmentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionOutcome {
    pub request: ReservationResponse,
    pub previous: ReservationStatus,
    pub status: ReservationStatus,
}

/// Search criteria for [`ReservationService::list_requests`]
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationFilter {
    /// Stored label or short name, e.g. `pending`
    pub status: Option<String>,
    pub venue_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub requester_email: Option<String>,
    /// Only requests ending at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Only requests starting at or before this instant
    pub to: Option<DateTime<Utc>>,
    /// Matches reference number or title
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReservationSettings {
    pub approval_group: String,
    pub self_service_sector: String,
    pub release_only_held_slots: bool,
    pub reference_number_retries: u32,
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self {
            approval_group: "CRSD".to_string(),
            self_service_sector: "FSS".to_string(),
            release_only_held_slots: false,
            reference_number_retries: 5,
        }
    }
}

impl From<&AppConfig> for ReservationSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            approval_group: config.approval_group.clone(),
            self_service_sector: config.self_service_sector.clone(),
            release_only_held_slots: config.release_only_held_slots,
            reference_number_retries: config.reference_number_retries,
        }
    }
}

/// Orchestrates creation and status transitions of reservation requests
#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DbPool>,
    slots: Arc<dyn TimeSlotStore>,
    checker: AvailabilityChecker,
    notifier: Notifier,
    event_sender: EventSender,
    settings: ReservationSettings,
}

impl ReservationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        slots: Arc<dyn TimeSlotStore>,
        notifier: Notifier,
        event_sender: EventSender,
        settings: ReservationSettings,
    ) -> Self {
        Self {
            db_pool,
            checker: AvailabilityChecker::new(slots.clone()),
            slots,
            notifier,
            event_sender,
            settings,
        }
    }

    /// Validates and stores a new request.
    #[instrument(skip(self, command), fields(venue_id = %command.venue_id, requester = %command.requester_email))]
    pub async fn create_request(
        &self,
        command: CreateReservationCommand,
    ) -> Result<CreatedReservation, ServiceError> {
        let command = normalize(command);
        command.validate()?;
        let slot = TimeSlot::new(command.from_date, command.to_date)?;

        let db = &*self.db_pool;
        let venue = venue::Entity::find_by_id(command.venue_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Venue {} not found", command.venue_id)))?;
        let department = department::Entity::find_by_id(command.department_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Department {} not found", command.department_id))
            })?;

        self.validate_booking_rules(&command, &venue, &department)
            .await?;

        if let Some(blocking) = self.checker.check_slot(venue.id, &slot).await? {
            return Err(ServiceError::SlotUnavailable(format!(
                "{} is already reserved for {}",
                venue.name, blocking
            )));
        }

        let self_service = venue.is_self_service(&self.settings.self_service_sector);
        let status = if self_service {
            ReservationStatus::Approved
        } else {
            ReservationStatus::Pending
        };

        if self_service {
            self.slots.add_slot(venue.id, &slot).await?;
        }

        let request_id = Uuid::new_v4();
        let created = match self
            .insert_with_reference(request_id, &command, status, self_service)
            .await
        {
            Ok(model) => model,
            Err(err) => {
                if self_service {
                    self.release_slot_quietly(venue.id, &slot).await;
                }
                return Err(err);
            }
        };

        counter!("reservations.created", 1, "status" => status.as_str());
        info!(
            request_id = %created.id,
            reference_number = %created.reference_number,
            status = %status,
            "Reservation request created"
        );

        self.event_sender
            .send_or_log(Event::ReservationCreated {
                request_id: created.id,
                reference_number: created.reference_number.clone(),
                venue_id: venue.id,
                status: status.as_str().to_string(),
            })
            .await;
        if self_service {
            self.event_sender
                .send_or_log(Event::SlotReserved {
                    venue_id: venue.id,
                    request_id: created.id,
                    slot: slot.format(),
                })
                .await;
        }

        let ctx = email_context(&created, &venue);
        if self_service {
            self.notifier
                .notify(
                    created.id,
                    NotificationKind::Approved,
                    vec![created.requester_email.clone()],
                    Vec::new(),
                    &ctx,
                )
                .await;
        } else {
            let approver = approver_for(&venue, &department);
            self.notifier
                .notify(
                    created.id,
                    NotificationKind::Submitted,
                    approver.into_iter().collect(),
                    vec![created.requester_email.clone()],
                    &ctx,
                )
                .await;
        }

        Ok(CreatedReservation {
            id: created.id,
            reference_number: created.reference_number,
            status,
        })
    }

    /// Applies `command.event` to the request and fires its side effects.
    #[instrument(skip(self, command), fields(event = %command.event, actor = %command.actor))]
    pub async fn transition(
        &self,
        request_id: Uuid,
        command: TransitionCommand,
    ) -> Result<TransitionOutcome, ServiceError> {
        let request = self.find_request(request_id).await?;
        let previous = request.status()?;
        let next = previous.apply(command.event)?;
        let slot = TimeSlot::new(request.from_date, request.to_date)?;

        let db = &*self.db_pool;
        let venue = venue::Entity::find_by_id(request.venue_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Venue {} not found", request.venue_id)))?;

        let updated = match command.event {
            ReservationEvent::Approve => {
                if let Some(blocking) = self.checker.check_slot(venue.id, &slot).await? {
                    return Err(ServiceError::SlotUnavailable(format!(
                        "{} is already reserved for {}",
                        venue.name, blocking
                    )));
                }
                self.slots.add_slot(venue.id, &slot).await?;

                match self
                    .write_status(&request, previous, next, &command, true)
                    .await
                {
                    Ok(updated) => updated,
                    Err(err) => {
                        self.release_slot_quietly(venue.id, &slot).await;
                        return Err(err);
                    }
                }
            }
            ReservationEvent::Disapprove | ReservationEvent::Cancel => {
                // `slot_held` is only cleared once the interval is really gone.
                let mut updated = self
                    .write_status(&request, previous, next, &command, request.slot_held)
                    .await?;

                if !self.settings.release_only_held_slots || request.slot_held {
                    let removed = self.slots.remove_slot(venue.id, &slot).await?;
                    self.event_sender
                        .send_or_log(Event::SlotReleased {
                            venue_id: venue.id,
                            request_id,
                            slot: slot.format(),
                            removed,
                        })
                        .await;
                    if updated.slot_held {
                        updated = self.clear_slot_held(updated).await?;
                    }
                } else {
                    debug!(request_id = %request_id, "Request held no slot, nothing to release");
                }
                updated
            }
        };

        if command.event == ReservationEvent::Approve {
            self.event_sender
                .send_or_log(Event::SlotReserved {
                    venue_id: venue.id,
                    request_id,
                    slot: slot.format(),
                })
                .await;
        }

        counter!("reservations.transitions", 1, "event" => command.event.to_string());
        info!(
            request_id = %request_id,
            from = %previous,
            to = %next,
            "Reservation status changed"
        );
        self.event_sender
            .send_or_log(Event::ReservationStatusChanged {
                request_id,
                old_status: previous.as_str().to_string(),
                new_status: next.as_str().to_string(),
                actor: command.actor.clone(),
                at: updated.decided_at.unwrap_or_else(Utc::now),
            })
            .await;

        self.notify_transition(&updated, &venue, command.event).await;

        Ok(TransitionOutcome {
            request: updated.into(),
            previous,
            status: next,
        })
    }

    pub async fn check_availability(
        &self,
        venue_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<AvailabilityReport, ServiceError> {
        self.checker.check(venue_id, from, to).await
    }

    pub async fn get_request(&self, request_id: Uuid) -> Result<ReservationResponse, ServiceError> {
        Ok(self.find_request(request_id).await?.into())
    }

    pub async fn get_request_details(
        &self,
        request_id: Uuid,
    ) -> Result<ReservationDetails, ServiceError> {
        let request = self.find_request(request_id).await?;
        self.details(request).await
    }

    pub async fn get_request_by_reference(
        &self,
        reference_number: &str,
    ) -> Result<ReservationDetails, ServiceError> {
        let request = reservation_request::Entity::find()
            .filter(reservation_request::Column::ReferenceNumber.eq(reference_number.trim()))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Reservation {} not found", reference_number))
            })?;
        self.details(request).await
    }

    /// Filtered, newest-first page of requests with the total match count.
    #[instrument(skip(self))]
    pub async fn list_requests(
        &self,
        filter: ReservationFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ReservationResponse>, u64), ServiceError> {
        let mut condition = Condition::all();

        if let Some(status) = filter.status.as_deref().filter(|s| !s.trim().is_empty()) {
            let status = parse_status_filter(status)?;
            condition = condition.add(reservation_request::Column::Status.eq(status.as_str()));
        }
        if let Some(venue_id) = filter.venue_id {
            condition = condition.add(reservation_request::Column::VenueId.eq(venue_id));
        }
        if let Some(department_id) = filter.department_id {
            condition = condition.add(reservation_request::Column::DepartmentId.eq(department_id));
        }
        if let Some(email) = filter.requester_email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            condition = condition.add(reservation_request::Column::RequesterEmail.eq(email.to_lowercase()));
        }
        if let Some(from) = filter.from {
            condition = condition.add(reservation_request::Column::ToDate.gte(from));
        }
        if let Some(to) = filter.to {
            condition = condition.add(reservation_request::Column::FromDate.lte(to));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(reservation_request::Column::ReferenceNumber.contains(term))
                    .add(reservation_request::Column::Title.contains(term)),
            );
        }

        let paginator = reservation_request::Entity::find()
            .filter(condition)
            .order_by_desc(reservation_request::Column::CreatedAt)
            .order_by_desc(reservation_request::Column::RunningCount)
            .paginate(&*self.db_pool, limit);

        let total = paginator.num_items().await?;
        let requests = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((requests.into_iter().map(Into::into).collect(), total))
    }

    /// Approval queue, oldest first.
    pub async fn pending_for_approval(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ReservationResponse>, u64), ServiceError> {
        let paginator = reservation_request::Entity::find()
            .filter(reservation_request::Column::Status.eq(ReservationStatus::Pending.as_str()))
            .order_by_asc(reservation_request::Column::CreatedAt)
            .order_by_asc(reservation_request::Column::RunningCount)
            .paginate(&*self.db_pool, limit);

        let total = paginator.num_items().await?;
        let requests = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((requests.into_iter().map(Into::into).collect(), total))
    }

    async fn find_request(&self, request_id: Uuid) -> Result<reservation_request::Model, ServiceError> {
        reservation_request::Entity::find_by_id(request_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Reservation {} not found", request_id)))
    }

    async fn details(
        &self,
        request: reservation_request::Model,
    ) -> Result<ReservationDetails, ServiceError> {
        let db = &*self.db_pool;
        let facilities = reservation_facility_item::Entity::find()
            .filter(reservation_facility_item::Column::RequestId.eq(request.id))
            .all(db)
            .await?;
        let participants = reservation_participant::Entity::find()
            .filter(reservation_participant::Column::RequestId.eq(request.id))
            .all(db)
            .await?;
        let attachments = reservation_attachment::Entity::find()
            .filter(reservation_attachment::Column::RequestId.eq(request.id))
            .order_by_asc(reservation_attachment::Column::UploadedAt)
            .all(db)
            .await?;

        Ok(ReservationDetails {
            request: request.into(),
            facilities: facilities
                .into_iter()
                .map(|item| FacilityItemResponse {
                    facility_id: item.facility_id,
                    quantity: item.quantity,
                    asset_number: item.asset_number,
                })
                .collect(),
            participants: participants
                .into_iter()
                .map(|p| ParticipantResponse {
                    name: p.name,
                    participant_type: p.participant_type,
                    organization: p.organization,
                })
                .collect(),
            attachments: attachments
                .into_iter()
                .map(|a| AttachmentResponse {
                    id: a.id,
                    file_name: a.file_name,
                    content_type: a.content_type,
                    size_bytes: a.size_bytes,
                    storage_url: a.storage_url,
                })
                .collect(),
        })
    }

    async fn validate_booking_rules(
        &self,
        command: &CreateReservationCommand,
        venue: &venue::Model,
        department: &department::Model,
    ) -> Result<(), ServiceError> {
        if !venue.active {
            return Err(ServiceError::ValidationError(format!(
                "{} is not accepting reservations",
                venue.name
            )));
        }

        if let Some(sector) = venue.exclusivity() {
            if !department.in_sector(sector) {
                return Err(ServiceError::ValidationError(format!(
                    "{} can only be reserved by {} departments",
                    venue.name, sector
                )));
            }
        }

        if venue.in_group(&self.settings.approval_group) {
            if command.layout.as_deref().map_or(true, |l| l.trim().is_empty()) {
                return Err(ServiceError::ValidationError(format!(
                    "A seating layout is required for {} venues",
                    self.settings.approval_group
                )));
            }
            if command.facilities.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "At least one facility is required for {} venues",
                    self.settings.approval_group
                )));
            }
        }

        if command.participants.iter().any(|p| p.name.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "Participant name is required".to_string(),
            ));
        }

        if command.facilities.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = command.facilities.iter().map(|f| f.facility_id).collect();
        let known: HashMap<Uuid, facility::Model> = facility::Entity::find()
            .filter(facility::Column::Id.is_in(ids))
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        for item in &command.facilities {
            let facility = known
                .get(&item.facility_id)
                .filter(|f| f.active)
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Unknown facility {}", item.facility_id))
                })?;
            let has_asset = item
                .asset_number
                .as_deref()
                .map_or(false, |a| !a.trim().is_empty());
            if facility.requires_asset_number && !has_asset {
                return Err(ServiceError::ValidationError(format!(
                    "{} requires an asset number",
                    facility.name
                )));
            }
        }

        Ok(())
    }

    /// Inserts the request under the next reference number. The counter is
    /// only lost to another session while its row is being created, which
    /// the unique index turns into a retry.
    async fn insert_with_reference(
        &self,
        request_id: Uuid,
        command: &CreateReservationCommand,
        status: ReservationStatus,
        slot_held: bool,
    ) -> Result<reservation_request::Model, ServiceError> {
        let attempts = self.settings.reference_number_retries.max(1);

        for attempt in 1..=attempts {
            match self
                .insert_request(request_id, command, status, slot_held)
                .await
            {
                Ok(model) => return Ok(model),
                Err(err) if is_unique_violation(&err) => {
                    counter!("reservations.reference_number.collisions", 1);
                    debug!(attempt, error = %err, "Reference counter taken by a concurrent request, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(request_id = %request_id, "Could not allocate a reference number");
        Err(ServiceError::ConcurrentModification(request_id))
    }

    async fn insert_request(
        &self,
        request_id: Uuid,
        command: &CreateReservationCommand,
        status: ReservationStatus,
        slot_held: bool,
    ) -> Result<reservation_request::Model, DbErr> {
        let txn = self.db_pool.begin().await?;
        let now = Utc::now();
        let running_count = next_running_count(&txn).await?;
        let reference_number = format_reference_number(now.year(), now.month0(), running_count - 1);

        let request = reservation_request::ActiveModel {
            id: Set(request_id),
            reference_number: Set(reference_number),
            running_count: Set(running_count),
            title: Set(command.title.clone()),
            requester_name: Set(command.requester_name.clone()),
            requester_email: Set(command.requester_email.clone()),
            department_id: Set(command.department_id),
            venue_id: Set(command.venue_id),
            from_date: Set(command.from_date),
            to_date: Set(command.to_date),
            layout: Set(command.layout.clone()),
            remarks: Set(command.remarks.clone()),
            status: Set(status.as_str().to_string()),
            status_reason: Set(None),
            decided_by: Set(None),
            decided_at: Set((status == ReservationStatus::Approved).then_some(now)),
            slot_held: Set(slot_held),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        for item in &command.facilities {
            reservation_facility_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                request_id: Set(request_id),
                facility_id: Set(item.facility_id),
                quantity: Set(item.quantity),
                asset_number: Set(item.asset_number.clone()),
            }
            .insert(&txn)
            .await?;
        }

        for participant in &command.participants {
            reservation_participant::ActiveModel {
                id: Set(Uuid::new_v4()),
                request_id: Set(request_id),
                name: Set(participant.name.trim().to_string()),
                participant_type: Set(participant.participant_type.to_string()),
                organization: Set(participant.organization.clone()),
            }
            .insert(&txn)
            .await?;
        }

        for attachment in &command.attachments {
            reservation_attachment::ActiveModel {
                id: Set(Uuid::new_v4()),
                request_id: Set(request_id),
                file_name: Set(attachment.file_name.clone()),
                content_type: Set(attachment.content_type.clone()),
                size_bytes: Set(attachment.size_bytes),
                storage_url: Set(attachment.storage_url.clone()),
                uploaded_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(request)
    }

    /// Writes the new status only if the row still carries `previous`.
    async fn write_status(
        &self,
        request: &reservation_request::Model,
        previous: ReservationStatus,
        next: ReservationStatus,
        command: &TransitionCommand,
        slot_held: bool,
    ) -> Result<reservation_request::Model, ServiceError> {
        let now = Utc::now();
        let reason = command
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let result = reservation_request::Entity::update_many()
            .col_expr(reservation_request::Column::Status, Expr::value(next.as_str()))
            .col_expr(reservation_request::Column::StatusReason, Expr::value(reason))
            .col_expr(
                reservation_request::Column::DecidedBy,
                Expr::value(Some(command.actor.clone())),
            )
            .col_expr(reservation_request::Column::DecidedAt, Expr::value(Some(now)))
            .col_expr(reservation_request::Column::SlotHeld, Expr::value(slot_held))
            .col_expr(reservation_request::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(reservation_request::Column::Id.eq(request.id))
            .filter(reservation_request::Column::Status.eq(previous.as_str()))
            .exec(&*self.db_pool)
            .await?;

        if result.rows_affected != 1 {
            warn!(
                request_id = %request.id,
                expected = %previous,
                "Request status changed by another session"
            );
            return Err(ServiceError::ConcurrentModification(request.id));
        }

        self.find_request(request.id).await
    }

    async fn clear_slot_held(
        &self,
        mut request: reservation_request::Model,
    ) -> Result<reservation_request::Model, ServiceError> {
        reservation_request::Entity::update_many()
            .col_expr(reservation_request::Column::SlotHeld, Expr::value(false))
            .filter(reservation_request::Column::Id.eq(request.id))
            .exec(&*self.db_pool)
            .await?;
        request.slot_held = false;
        Ok(request)
    }

    async fn release_slot_quietly(&self, venue_id: Uuid, slot: &TimeSlot) {
        if let Err(e) = self.slots.remove_slot(venue_id, slot).await {
            warn!(
                venue_id = %venue_id,
                slot = %slot,
                error = %e,
                "Could not release slot after a failed write"
            );
        }
    }

    async fn notify_transition(
        &self,
        request: &reservation_request::Model,
        venue: &venue::Model,
        event: ReservationEvent,
    ) {
        let kind = match event {
            ReservationEvent::Approve => NotificationKind::Approved,
            ReservationEvent::Disapprove => NotificationKind::Disapproved,
            ReservationEvent::Cancel => NotificationKind::Cancelled,
        };

        let cc = if event == ReservationEvent::Cancel {
            venue.approver_email.clone().into_iter().collect()
        } else {
            Vec::new()
        };

        self.notifier
            .notify(
                request.id,
                kind,
                vec![request.requester_email.clone()],
                cc,
                &email_context(request, venue),
            )
            .await;
    }
}

fn normalize(mut command: CreateReservationCommand) -> CreateReservationCommand {
    command.title = command.title.trim().to_string();
    command.requester_name = command.requester_name.trim().to_string();
    command.requester_email = command.requester_email.trim().to_lowercase();
    command.layout = command
        .layout
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    command
}

/// Bumps the request counter inside `txn`. The counter row stays locked
/// until the transaction ends, so concurrent creators queue behind it.
async fn next_running_count(txn: &DatabaseTransaction) -> Result<i64, DbErr> {
    reference_counter::Entity::update_many()
        .col_expr(
            reference_counter::Column::Value,
            Expr::col(reference_counter::Column::Value).add(1),
        )
        .filter(reference_counter::Column::Name.eq(reference_counter::RESERVATION_REQUESTS))
        .exec(txn)
        .await?;

    let counter = reference_counter::Entity::find_by_id(reference_counter::RESERVATION_REQUESTS.to_string())
        .one(txn)
        .await?;
    let stored = reservation_request::Entity::find()
        .order_by_desc(reservation_request::Column::RunningCount)
        .one(txn)
        .await?
        .map_or(0, |r| r.running_count);

    // Rows written around the counter push it forward instead of colliding.
    let next = counter.as_ref().map_or(0, |c| c.value).max(stored + 1);
    match counter {
        Some(c) if c.value == next => {}
        Some(_) => {
            reference_counter::Entity::update_many()
                .col_expr(reference_counter::Column::Value, Expr::value(next))
                .filter(reference_counter::Column::Name.eq(reference_counter::RESERVATION_REQUESTS))
                .exec(txn)
                .await?;
        }
        None => {
            reference_counter::ActiveModel {
                name: Set(reference_counter::RESERVATION_REQUESTS.to_string()),
                value: Set(next),
            }
            .insert(txn)
            .await?;
        }
    }

    Ok(next)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn approver_for(venue: &venue::Model, department: &department::Model) -> Option<String> {
    venue
        .approver_email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .or_else(|| department.approver_email.clone())
        .filter(|e| !e.trim().is_empty())
}

fn email_context(
    request: &reservation_request::Model,
    venue: &venue::Model,
) -> ReservationEmailContext {
    ReservationEmailContext {
        reference_number: request.reference_number.clone(),
        title: request.title.clone(),
        venue_name: venue.name.clone(),
        requester_name: request.requester_name.clone(),
        requester_email: request.requester_email.clone(),
        from: request.from_date,
        to: request.to_date,
        status: request.status.clone(),
        reason: request.status_reason.clone(),
        decided_by: request.decided_by.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2024, 0, 0, "RR-202401-0001")]
    #[case(2024, 11, 41, "RR-202412-0042")]
    #[case(2025, 5, 9998, "RR-202506-9999")]
    #[case(2025, 5, 12344, "RR-202506-12345")]
    fn reference_numbers(
        #[case] year: i32,
        #[case] month0: u32,
        #[case] count: i64,
        #[case] expected: &str,
    ) {
        assert_eq!(format_reference_number(year, month0, count), expected);
    }

    #[rstest]
    #[case("Pending for Approval", ReservationStatus::Pending)]
    #[case("pending", ReservationStatus::Pending)]
    #[case("APPROVED", ReservationStatus::Approved)]
    #[case("canceled", ReservationStatus::Cancelled)]
    fn status_filters(#[case] raw: &str, #[case] expected: ReservationStatus) {
        assert_eq!(parse_status_filter(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_status_filter_is_invalid_input() {
        assert!(matches!(
            parse_status_filter("archived"),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn command_is_trimmed_before_validation() {
        let command = normalize(CreateReservationCommand {
            title: "  Kickoff ".into(),
            requester_name: " Ana ".into(),
            requester_email: " Ana@Example.com ".into(),
            department_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            from_date: Utc::now(),
            to_date: Utc::now(),
            layout: Some("   ".into()),
            remarks: None,
            facilities: vec![],
            participants: vec![],
            attachments: vec![],
        });
        assert_eq!(command.title, "Kickoff");
        assert_eq!(command.requester_email, "ana@example.com");
        assert_eq!(command.layout, None);
    }

    #[test]
    fn blank_title_fails_validation() {
        let command = normalize(CreateReservationCommand {
            title: "   ".into(),
            requester_name: "Ana".into(),
            requester_email: "ana@example.com".into(),
            department_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            from_date: Utc::now(),
            to_date: Utc::now(),
            layout: None,
            remarks: None,
            facilities: vec![FacilityItemInput {
                facility_id: Uuid::new_v4(),
                quantity: 0,
                asset_number: None,
            }],
            participants: vec![],
            attachments: vec![],
        });
        let errors = command.validate().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("facilities"));
    }
}
