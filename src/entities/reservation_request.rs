use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Status of a reservation request.
///
/// Stored as the labels the approval views display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ReservationStatus {
    #[serde(rename = "Pending for Approval")]
    Pending,
    Approved,
    Disapproved,
    Cancelled,
}

/// Something a user does to a request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReservationEvent {
    Approve,
    Disapprove,
    Cancel,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending for Approval",
            ReservationStatus::Approved => "Approved",
            ReservationStatus::Disapproved => "Disapproved",
            ReservationStatus::Cancelled => "Cancelled",
        }
    }

    /// Transition table. Every pair not listed is rejected.
    pub fn apply(self, event: ReservationEvent) -> Result<ReservationStatus, ServiceError> {
        use ReservationEvent::*;
        use ReservationStatus::*;

        match (self, event) {
            (Pending, Approve) => Ok(Approved),
            (Pending, Disapprove) => Ok(Disapproved),
            (Pending, Cancel) => Ok(Cancelled),
            (Approved, Cancel) => Ok(Cancelled),
            (from, event) => Err(ServiceError::InvalidTransition {
                from: from.as_str().to_string(),
                event: event.to_string(),
            }),
        }
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending for Approval" | "Pending" => Ok(ReservationStatus::Pending),
            "Approved" => Ok(ReservationStatus::Approved),
            "Disapproved" => Ok(ReservationStatus::Disapproved),
            "Cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(ServiceError::InvalidInput(format!(
                "Unknown reservation status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference_number: String,
    #[sea_orm(unique)]
    pub running_count: i64,
    pub title: String,
    pub requester_name: String,
    pub requester_email: String,
    pub department_id: Uuid,
    pub venue_id: Uuid,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub layout: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub status: String, // Storing as string in DB, converted to/from ReservationStatus
    #[sea_orm(column_type = "Text", nullable)]
    pub status_reason: Option<String>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    /// True while this request owns an interval in the venue's timeslot list
    pub slot_held: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::venue::Entity",
        from = "Column::VenueId",
        to = "super::venue::Column::Id"
    )]
    Venue,
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    #[sea_orm(has_many = "super::reservation_facility_item::Entity")]
    FacilityItems,
    #[sea_orm(has_many = "super::reservation_participant::Entity")]
    Participants,
    #[sea_orm(has_many = "super::reservation_attachment::Entity")]
    Attachments,
}

impl Related<super::venue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Venue.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::reservation_facility_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FacilityItems.def()
    }
}

impl Related<super::reservation_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::reservation_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }

        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

impl Model {
    pub fn status(&self) -> Result<ReservationStatus, ServiceError> {
        self.status.parse().map_err(|_| {
            ServiceError::InternalError(format!(
                "Reservation {} has unknown status '{}'",
                self.id, self.status
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ReservationStatus::Pending, ReservationEvent::Approve, ReservationStatus::Approved)]
    #[case(ReservationStatus::Pending, ReservationEvent::Disapprove, ReservationStatus::Disapproved)]
    #[case(ReservationStatus::Pending, ReservationEvent::Cancel, ReservationStatus::Cancelled)]
    #[case(ReservationStatus::Approved, ReservationEvent::Cancel, ReservationStatus::Cancelled)]
    fn allowed_transitions(
        #[case] from: ReservationStatus,
        #[case] event: ReservationEvent,
        #[case] to: ReservationStatus,
    ) {
        assert_eq!(from.apply(event).unwrap(), to);
    }

    #[rstest]
    #[case(ReservationStatus::Approved, ReservationEvent::Approve)]
    #[case(ReservationStatus::Approved, ReservationEvent::Disapprove)]
    #[case(ReservationStatus::Disapproved, ReservationEvent::Approve)]
    #[case(ReservationStatus::Disapproved, ReservationEvent::Cancel)]
    #[case(ReservationStatus::Cancelled, ReservationEvent::Approve)]
    #[case(ReservationStatus::Cancelled, ReservationEvent::Cancel)]
    fn rejected_transitions(#[case] from: ReservationStatus, #[case] event: ReservationEvent) {
        match from.apply(event) {
            Err(ServiceError::InvalidTransition { from: f, event: e }) => {
                assert_eq!(f, from.as_str());
                assert_eq!(e, event.to_string());
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Approved,
            ReservationStatus::Disapproved,
            ReservationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>().unwrap(), status);
        }
        assert!(matches!(
            "Archived".parse::<ReservationStatus>(),
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Pending).unwrap(),
            "\"Pending for Approval\""
        );
    }

    #[test]
    fn events_parse_case_insensitively() {
        assert_eq!(
            "Approve".parse::<ReservationEvent>().unwrap(),
            ReservationEvent::Approve
        );
        assert_eq!(ReservationEvent::Disapprove.to_string(), "disapprove");
        assert!("archive".parse::<ReservationEvent>().is_err());
    }
}
