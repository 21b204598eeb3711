use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{department, facility, venue},
    errors::ServiceError,
    models::TimeSlot,
    services::timeslots::TimeSlotStore,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVenueRequest {
    #[validate(length(min = 1, message = "Venue name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Venue group is required"))]
    pub venue_group: String,
    pub exclusive_to: Option<String>,
    #[serde(default)]
    pub self_service: bool,
    pub capacity: Option<String>,
    pub facilities_available: Option<String>,
    #[validate(email(message = "Approver e-mail is not valid"))]
    pub approver_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, message = "Department name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Sector is required"))]
    pub sector: String,
    #[validate(email(message = "Approver e-mail is not valid"))]
    pub approver_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateFacilityRequest {
    #[validate(length(min = 1, message = "Facility name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub requires_asset_number: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueFilter {
    pub group: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Reserved intervals of one venue, in stored order
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VenueSchedule {
    pub venue_id: Uuid,
    pub venue_name: String,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VenueResponse {
    pub id: Uuid,
    pub name: String,
    pub venue_group: String,
    pub exclusive_to: Option<String>,
    pub self_service: bool,
    pub capacity: Option<String>,
    pub facilities_available: Option<String>,
    pub approver_email: Option<String>,
    pub active: bool,
}

impl From<venue::Model> for VenueResponse {
    fn from(model: venue::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            venue_group: model.venue_group,
            exclusive_to: model.exclusive_to,
            self_service: model.self_service,
            capacity: model.capacity,
            facilities_available: model.facilities_available,
            approver_email: model.approver_email,
            active: model.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentResponse {
    pub id: Uuid,
    pub name: String,
    pub sector: String,
    pub approver_email: Option<String>,
}

impl From<department::Model> for DepartmentResponse {
    fn from(model: department::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sector: model.sector,
            approver_email: model.approver_email,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FacilityResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub requires_asset_number: bool,
}

impl From<facility::Model> for FacilityResponse {
    fn from(model: facility::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            requires_asset_number: model.requires_asset_number,
        }
    }
}

/// Venues, departments and facilities
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    slots: Arc<dyn TimeSlotStore>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, slots: Arc<dyn TimeSlotStore>) -> Self {
        Self { db_pool, slots }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_venue(&self, request: CreateVenueRequest) -> Result<venue::Model, ServiceError> {
        request.validate()?;

        let model = venue::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            venue_group: Set(request.venue_group.trim().to_string()),
            exclusive_to: Set(request
                .exclusive_to
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())),
            self_service: Set(request.self_service),
            capacity: Set(request.capacity),
            facilities_available: Set(request.facilities_available),
            approver_email: Set(request.approver_email),
            timeslots: Set(Some("[]".to_string())),
            version: Set(0),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(venue_id = %model.id, "Venue created");
        Ok(model)
    }

    pub async fn get_venue(&self, venue_id: Uuid) -> Result<venue::Model, ServiceError> {
        venue::Entity::find_by_id(venue_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Venue {} not found", venue_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_venues(
        &self,
        filter: VenueFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<venue::Model>, u64), ServiceError> {
        let mut query = venue::Entity::find();
        if !filter.include_inactive {
            query = query.filter(venue::Column::Active.eq(true));
        }
        if let Some(group) = filter.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            query = query.filter(venue::Column::VenueGroup.eq(group));
        }

        let paginator = query
            .order_by_asc(venue::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let venues = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((venues, total))
    }

    pub async fn venue_schedule(&self, venue_id: Uuid) -> Result<VenueSchedule, ServiceError> {
        let venue = self.get_venue(venue_id).await?;
        let slots = self.slots.slots(venue_id).await?;
        Ok(VenueSchedule {
            venue_id,
            venue_name: venue.name,
            slots,
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_department(
        &self,
        request: CreateDepartmentRequest,
    ) -> Result<department::Model, ServiceError> {
        request.validate()?;

        let model = department::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            sector: Set(request.sector.trim().to_string()),
            approver_email: Set(request.approver_email),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(department_id = %model.id, "Department created");
        Ok(model)
    }

    pub async fn get_department(&self, department_id: Uuid) -> Result<department::Model, ServiceError> {
        department::Entity::find_by_id(department_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Department {} not found", department_id))
            })
    }

    pub async fn list_departments(&self) -> Result<Vec<department::Model>, ServiceError> {
        Ok(department::Entity::find()
            .order_by_asc(department::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_facility(
        &self,
        request: CreateFacilityRequest,
    ) -> Result<facility::Model, ServiceError> {
        request.validate()?;

        let model = facility::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            requires_asset_number: Set(request.requires_asset_number),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(facility_id = %model.id, "Facility created");
        Ok(model)
    }

    pub async fn list_facilities(&self) -> Result<Vec<facility::Model>, ServiceError> {
        Ok(facility::Entity::find()
            .filter(facility::Column::Active.eq(true))
            .order_by_asc(facility::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }
}
