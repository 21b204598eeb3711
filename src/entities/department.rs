use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Organizational sector, matched against a venue's exclusivity tag
    pub sector: String,
    pub approver_email: Option<String>,
    pub created_at: DateTime<Utc>,
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
    pub fn in_sector(&self, sector: &str) -> bool {
        self.sector.trim().eq_ignore_ascii_case(sector.trim())
    }
}
