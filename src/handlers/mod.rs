pub mod catalog;
pub mod common;
pub mod health;
pub mod reservations;
pub mod venues;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    services::{
        catalog::CatalogService,
        notifications::{mailer_from_config, Mailer, Notifier},
        reservations::{ReservationService, ReservationSettings},
        timeslots::{SeaOrmTimeSlotStore, TimeSlotStore},
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub reservations: Arc<ReservationService>,
    pub catalog: Arc<CatalogService>,
}

impl AppServices {
    /// Wires services against the database, picking the mailer from config.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let mailer = mailer_from_config(config)?;
        let slots: Arc<dyn TimeSlotStore> = Arc::new(SeaOrmTimeSlotStore::new(
            db_pool.clone(),
            config.slot_write_retries,
        ));
        Ok(Self::with_parts(db_pool, event_sender, config, slots, mailer))
    }

    /// Wires services over explicit slot store and mailer implementations.
    pub fn with_parts(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        config: &AppConfig,
        slots: Arc<dyn TimeSlotStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let notifier =
            Notifier::new(mailer, config.mail_from.clone()).with_events(event_sender.clone());

        let reservations = Arc::new(ReservationService::new(
            db_pool.clone(),
            slots.clone(),
            notifier,
            event_sender,
            ReservationSettings::from(config),
        ));
        let catalog = Arc::new(CatalogService::new(db_pool, slots));

        Self {
            reservations,
            catalog,
        }
    }
}
