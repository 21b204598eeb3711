#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use venue_reservation_api::{
    build_router,
    config::AppConfig,
    db::{self, DbPool},
    entities::{
        department, facility,
        reservation_request::{self, ReservationStatus},
        venue,
    },
    errors::ServiceError,
    events::{self, Event},
    handlers::{common::USER_EMAIL_HEADER, common::USER_NAME_HEADER, AppServices},
    models::TimeSlot,
    services::{
        catalog::{CreateDepartmentRequest, CreateFacilityRequest, CreateVenueRequest},
        notifications::{EmailMessage, Mailer},
        reservations::{CreateReservationCommand, FacilityItemInput},
        timeslots::{SeaOrmTimeSlotStore, TimeSlotStore},
    },
    AppState,
};

pub const REQUESTER: &str = "requester@example.com";
pub const APPROVER: &str = "approver@example.com";

/// Captures outgoing mail; optionally fails every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "relay unreachable".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Work done against the database right after the next successful `add_slot`,
/// standing in for another session acting in that window.
pub enum AfterAdd {
    CancelRequest(Uuid),
    Execute(String),
}

/// Database-backed slot store that counts mutating calls.
pub struct CountingSlotStore {
    inner: SeaOrmTimeSlotStore,
    db: Arc<DbPool>,
    adds: AtomicUsize,
    removes: AtomicUsize,
    after_add: Mutex<Option<AfterAdd>>,
    fail_removes: AtomicBool,
}

impl CountingSlotStore {
    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn after_next_add(&self, action: AfterAdd) {
        *self.after_add.lock().unwrap() = Some(action);
    }

    pub fn set_failing_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    async fn run_after_add(&self) {
        let action = self.after_add.lock().unwrap().take();
        match action {
            Some(AfterAdd::CancelRequest(id)) => {
                reservation_request::Entity::update_many()
                    .col_expr(
                        reservation_request::Column::Status,
                        Expr::value(ReservationStatus::Cancelled.as_str()),
                    )
                    .filter(reservation_request::Column::Id.eq(id))
                    .exec(&*self.db)
                    .await
                    .expect("cancel request from the side");
            }
            Some(AfterAdd::Execute(sql)) => {
                self.db
                    .execute_unprepared(&sql)
                    .await
                    .expect("run statement from the side");
            }
            None => {}
        }
    }
}

#[async_trait]
impl TimeSlotStore for CountingSlotStore {
    async fn slots(&self, venue_id: Uuid) -> Result<Vec<TimeSlot>, ServiceError> {
        self.inner.slots(venue_id).await
    }

    async fn add_slot(&self, venue_id: Uuid, slot: &TimeSlot) -> Result<(), ServiceError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.inner.add_slot(venue_id, slot).await?;
        self.run_after_add().await;
        Ok(())
    }

    async fn remove_slot(&self, venue_id: Uuid, slot: &TimeSlot) -> Result<bool, ServiceError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(ServiceError::DatabaseError(DbErr::Custom(
                "venue row locked".to_string(),
            )));
        }
        self.inner.remove_slot(venue_id, slot).await
    }
}

/// Helper harness backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub slots: Arc<CountingSlotStore>,
    events: Arc<Mutex<Vec<Event>>>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_sender, mut event_rx) = events::channel(256);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let event_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                sink.lock().unwrap().push(event);
            }
        });

        let mailer = Arc::new(RecordingMailer::default());
        let slots = Arc::new(CountingSlotStore {
            inner: SeaOrmTimeSlotStore::new(db_arc.clone(), cfg.slot_write_retries),
            db: db_arc.clone(),
            adds: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            after_add: Mutex::new(None),
            fail_removes: AtomicBool::new(false),
        });

        let services = AppServices::with_parts(
            db_arc.clone(),
            event_sender.clone(),
            &cfg,
            slots.clone(),
            mailer.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            router: build_router(state.clone()),
            state,
            mailer,
            slots,
            events,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    pub async fn seed_department(&self, sector: &str) -> department::Model {
        self.services()
            .catalog
            .create_department(CreateDepartmentRequest {
                name: format!("{} Department", sector),
                sector: sector.to_string(),
                approver_email: Some(APPROVER.to_string()),
            })
            .await
            .expect("seed department")
    }

    pub async fn seed_venue(
        &self,
        group: &str,
        exclusive_to: Option<&str>,
        self_service: bool,
    ) -> venue::Model {
        self.services()
            .catalog
            .create_venue(CreateVenueRequest {
                name: format!("{} Hall {}", group, &Uuid::new_v4().to_string()[..8]),
                venue_group: group.to_string(),
                exclusive_to: exclusive_to.map(str::to_string),
                self_service,
                capacity: Some("Theater 100".to_string()),
                facilities_available: None,
                approver_email: Some(APPROVER.to_string()),
            })
            .await
            .expect("seed venue")
    }

    pub async fn seed_facility(&self, name: &str, requires_asset_number: bool) -> facility::Model {
        self.services()
            .catalog
            .create_facility(CreateFacilityRequest {
                name: name.to_string(),
                description: None,
                requires_asset_number,
            })
            .await
            .expect("seed facility")
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Polls the collected events until one matches or a second passes.
    pub async fn wait_for_event(&self, predicate: impl Fn(&Event) -> bool) -> Option<Event> {
        for _ in 0..50 {
            if let Some(found) = self.events().into_iter().find(|e| predicate(e)) {
                return Some(found);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }

    /// Sends a request through the full router, optionally as `user`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        user: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(email) = user {
            builder = builder
                .header(USER_EMAIL_HEADER, email)
                .header(USER_NAME_HEADER, "Test User");
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response body is json")
}

pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub fn slot(from: &str, to: &str) -> TimeSlot {
    TimeSlot::new(at(from), at(to)).expect("valid slot")
}

/// A request for `venue` on behalf of `department` covering `[from, to]`.
pub fn command(
    venue: &venue::Model,
    department: &department::Model,
    from: &str,
    to: &str,
) -> CreateReservationCommand {
    CreateReservationCommand {
        title: "Quarterly planning".to_string(),
        requester_name: "Rita Requester".to_string(),
        requester_email: REQUESTER.to_string(),
        department_id: department.id,
        venue_id: venue.id,
        from_date: at(from),
        to_date: at(to),
        layout: Some("Theater".to_string()),
        remarks: None,
        facilities: Vec::new(),
        participants: Vec::new(),
        attachments: Vec::new(),
    }
}

pub fn facility_item(facility: &facility::Model, asset_number: Option<&str>) -> FacilityItemInput {
    FacilityItemInput {
        facility_id: facility.id,
        quantity: 1,
        asset_number: asset_number.map(str::to_string),
    }
}
