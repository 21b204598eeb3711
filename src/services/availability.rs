//! Venue availability.
//!
//! A candidate interval only clears an existing reservation when it lies
//! strictly after it or strictly before it. Touching at a boundary counts as
//! a conflict, so back-to-back bookings are rejected.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::TimeSlot;
use crate::services::timeslots::TimeSlotStore;

/// Whether `candidate` collides with an already reserved interval
pub fn conflicts_with(existing: &TimeSlot, candidate: &TimeSlot) -> bool {
    let after = candidate.start > existing.end && candidate.end > existing.end;
    let before = candidate.start < existing.start && candidate.end < existing.start;
    !(after || before)
}

/// First reserved interval the candidate collides with, in stored order
pub fn first_conflict<'a>(existing: &'a [TimeSlot], candidate: &TimeSlot) -> Option<&'a TimeSlot> {
    existing.iter().find(|slot| conflicts_with(slot, candidate))
}

pub fn is_available(existing: &[TimeSlot], candidate: &TimeSlot) -> bool {
    first_conflict(existing, candidate).is_none()
}

/// Outcome of an availability lookup
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityReport {
    pub venue_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub available: bool,
    /// The reserved interval that blocks the candidate, if any
    pub conflict: Option<TimeSlot>,
}

/// Checks candidates against the venue's current list, read fresh per call.
#[derive(Clone)]
pub struct AvailabilityChecker {
    store: Arc<dyn TimeSlotStore>,
}

impl AvailabilityChecker {
    pub fn new(store: Arc<dyn TimeSlotStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn check(
        &self,
        venue_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<AvailabilityReport, ServiceError> {
        let candidate = TimeSlot::new(from, to)?;
        let conflict = self.check_slot(venue_id, &candidate).await?;

        Ok(AvailabilityReport {
            venue_id,
            from,
            to,
            available: conflict.is_none(),
            conflict,
        })
    }

    /// Returns the blocking interval, or `None` when the venue is free.
    pub async fn check_slot(
        &self,
        venue_id: Uuid,
        candidate: &TimeSlot,
    ) -> Result<Option<TimeSlot>, ServiceError> {
        let existing = self.store.slots(venue_id).await?;
        let conflict = first_conflict(&existing, candidate).copied();

        if let Some(blocking) = &conflict {
            counter!("reservations.availability.conflicts", 1);
            debug!(
                venue_id = %venue_id,
                candidate = %candidate,
                blocking = %blocking,
                "Candidate interval conflicts with an existing reservation"
            );
        }

        Ok(conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timeslot::parse_timestamp;

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot::new(parse_timestamp(start).unwrap(), parse_timestamp(end).unwrap()).unwrap()
    }

    #[test]
    fn touching_boundary_is_a_conflict() {
        let existing = [slot("2024-01-01T10:00Z", "2024-01-01T11:00Z")];
        let candidate = slot("2024-01-01T11:00Z", "2024-01-01T12:00Z");
        assert!(!is_available(&existing, &candidate));

        let existing = [slot("2024-01-01T11:00Z", "2024-01-01T12:00Z")];
        let candidate = slot("2024-01-01T10:00Z", "2024-01-01T11:00Z");
        assert!(!is_available(&existing, &candidate));
    }

    #[test]
    fn strictly_before_or_after_is_free() {
        let existing = [slot("2024-01-01T14:00Z", "2024-01-01T15:00Z")];
        assert!(is_available(
            &existing,
            &slot("2024-01-01T10:00Z", "2024-01-01T11:00Z")
        ));
        assert!(is_available(
            &existing,
            &slot("2024-01-01T15:01Z", "2024-01-01T16:00Z")
        ));
    }

    #[test]
    fn overlap_and_containment_conflict() {
        let existing = [slot("2024-01-01T11:00Z", "2024-01-01T12:00Z")];
        assert!(!is_available(
            &existing,
            &slot("2024-01-01T10:30Z", "2024-01-01T11:30Z")
        ));
        assert!(!is_available(
            &existing,
            &slot("2024-01-01T11:15Z", "2024-01-01T11:45Z")
        ));
        assert!(!is_available(
            &existing,
            &slot("2024-01-01T09:00Z", "2024-01-01T13:00Z")
        ));
    }

    #[test]
    fn empty_list_is_always_available() {
        assert!(is_available(
            &[],
            &slot("2024-01-01T10:00Z", "2024-01-01T11:00Z")
        ));
    }

    #[test]
    fn reports_first_conflict_in_stored_order() {
        let existing = [
            slot("2024-01-01T08:00Z", "2024-01-01T09:00Z"),
            slot("2024-01-01T10:00Z", "2024-01-01T11:00Z"),
            slot("2024-01-01T10:30Z", "2024-01-01T12:00Z"),
        ];
        let candidate = slot("2024-01-01T10:45Z", "2024-01-01T11:15Z");
        assert_eq!(first_conflict(&existing, &candidate), Some(&existing[1]));
    }
}
