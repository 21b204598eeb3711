use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Name of the counter behind reservation reference numbers
pub const RESERVATION_REQUESTS: &str = "reservation_requests";

/// Named monotonic counter, bumped inside the transaction that consumes it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reference_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
