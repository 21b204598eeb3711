use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "venues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Approval group, e.g. "CRSD"
    pub venue_group: String,
    /// Sector tag; when set only departments of that sector may book
    pub exclusive_to: Option<String>,
    /// Bookings are approved on creation
    pub self_service: bool,
    /// Capacity per seating layout, free text
    pub capacity: Option<String>,
    pub facilities_available: Option<String>,
    pub approver_email: Option<String>,
    /// JSON array of "<start> <end>" entries
    #[sea_orm(column_type = "Text", nullable)]
    pub timeslots: Option<String>,
    /// Bumped on every timeslot write
    pub version: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reservation_request::Entity")]
    ReservationRequests,
}

impl Related<super::reservation_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReservationRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn in_group(&self, group: &str) -> bool {
        self.venue_group.trim().eq_ignore_ascii_case(group.trim())
    }

    pub fn exclusivity(&self) -> Option<&str> {
        self.exclusive_to
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    /// Self-service venues skip the approval step. A venue reserved for the
    /// self-service sector counts as self-service even without the flag.
    pub fn is_self_service(&self, self_service_sector: &str) -> bool {
        self.self_service
            || (!self_service_sector.trim().is_empty()
                && self
                    .exclusivity()
                    .map(|tag| tag.eq_ignore_ascii_case(self_service_sector.trim()))
                    .unwrap_or(false))
    }
}
