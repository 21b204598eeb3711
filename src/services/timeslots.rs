//! Per-venue reserved interval list.
//!
//! The list lives on the venue row. Every write is a full read-then-write,
//! guarded by the venue `version` column so two sessions can never silently
//! overwrite each other's entries.

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::entities::venue;
use crate::errors::ServiceError;
use crate::models::timeslot::{decode_entries, encode_entries, slots_from_entries};
use crate::models::TimeSlot;
use crate::services::availability::first_conflict;

/// Storage seam for a venue's reserved intervals
#[async_trait]
pub trait TimeSlotStore: Send + Sync {
    /// Current reserved intervals, malformed entries skipped
    async fn slots(&self, venue_id: Uuid) -> Result<Vec<TimeSlot>, ServiceError>;

    /// Appends the interval and persists the list. Fails with
    /// `SlotUnavailable` if the list it would overwrite already conflicts.
    async fn add_slot(&self, venue_id: Uuid, slot: &TimeSlot) -> Result<(), ServiceError>;

    /// Removes the first matching entry; `false` when nothing matched.
    async fn remove_slot(&self, venue_id: Uuid, slot: &TimeSlot) -> Result<bool, ServiceError>;
}

/// Snapshot of the list together with the version it was read at
struct VenueSlots {
    version: i32,
    entries: Vec<String>,
}

pub struct SeaOrmTimeSlotStore {
    db: Arc<DatabaseConnection>,
    max_retries: u32,
}

impl SeaOrmTimeSlotStore {
    pub fn new(db: Arc<DatabaseConnection>, max_retries: u32) -> Self {
        Self {
            db,
            max_retries: max_retries.max(1),
        }
    }

    async fn load(&self, venue_id: Uuid) -> Result<VenueSlots, ServiceError> {
        let venue = venue::Entity::find_by_id(venue_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Venue {} not found", venue_id)))?;

        Ok(VenueSlots {
            version: venue.version,
            entries: decode_entries(venue.timeslots.as_deref())?,
        })
    }

    /// Writes `entries` only if the row is still at `expected_version`.
    async fn compare_and_set(
        &self,
        venue_id: Uuid,
        expected_version: i32,
        entries: &[String],
    ) -> Result<bool, ServiceError> {
        let encoded = encode_entries(entries)?;
        let result = venue::Entity::update_many()
            .col_expr(venue::Column::Timeslots, Expr::value(Some(encoded)))
            .col_expr(venue::Column::Version, Expr::value(expected_version + 1))
            .col_expr(venue::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(venue::Column::Id.eq(venue_id))
            .filter(venue::Column::Version.eq(expected_version))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    fn lost_race(&self, venue_id: Uuid, attempt: u32) {
        counter!("reservations.timeslots.version_conflicts", 1);
        debug!(
            venue_id = %venue_id,
            attempt,
            max_retries = self.max_retries,
            "Venue timeslot list changed underneath us, retrying"
        );
    }
}

#[async_trait]
impl TimeSlotStore for SeaOrmTimeSlotStore {
    async fn slots(&self, venue_id: Uuid) -> Result<Vec<TimeSlot>, ServiceError> {
        let snapshot = self.load(venue_id).await?;
        Ok(slots_from_entries(&snapshot.entries))
    }

    #[instrument(skip(self, slot), fields(slot = %slot))]
    async fn add_slot(&self, venue_id: Uuid, slot: &TimeSlot) -> Result<(), ServiceError> {
        for attempt in 1..=self.max_retries {
            let mut snapshot = self.load(venue_id).await?;

            let existing = slots_from_entries(&snapshot.entries);
            if let Some(blocking) = first_conflict(&existing, slot) {
                return Err(ServiceError::SlotUnavailable(format!(
                    "Venue {} is already reserved for {}",
                    venue_id, blocking
                )));
            }

            snapshot.entries.push(slot.format());
            if self
                .compare_and_set(venue_id, snapshot.version, &snapshot.entries)
                .await?
            {
                debug!(venue_id = %venue_id, "Timeslot added");
                return Ok(());
            }
            self.lost_race(venue_id, attempt);
        }

        warn!(venue_id = %venue_id, "Giving up on timeslot add after repeated version conflicts");
        Err(ServiceError::ConcurrentModification(venue_id))
    }

    #[instrument(skip(self, slot), fields(slot = %slot))]
    async fn remove_slot(&self, venue_id: Uuid, slot: &TimeSlot) -> Result<bool, ServiceError> {
        for attempt in 1..=self.max_retries {
            let mut snapshot = self.load(venue_id).await?;

            let Some(position) = snapshot
                .entries
                .iter()
                .position(|entry| slot.matches_entry(entry))
            else {
                debug!(venue_id = %venue_id, "No timeslot entry matched, nothing to remove");
                return Ok(false);
            };

            snapshot.entries.remove(position);
            if self
                .compare_and_set(venue_id, snapshot.version, &snapshot.entries)
                .await?
            {
                debug!(venue_id = %venue_id, "Timeslot removed");
                return Ok(true);
            }
            self.lost_race(venue_id, attempt);
        }

        warn!(venue_id = %venue_id, "Giving up on timeslot removal after repeated version conflicts");
        Err(ServiceError::ConcurrentModification(venue_id))
    }
}
