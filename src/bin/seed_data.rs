//! Seed data script - populates the database with demo catalog data
//!
//! Run with: cargo run --bin seed-data -- --migrate
//!
//! This creates:
//! - departments across the FSS and CRSD sectors
//! - bookable facilities (projector, sound system, ...)
//! - venues: approval-managed CRSD halls, an FSS self-service room and a
//!   general meeting room

use clap::Parser;
use sea_orm::{ConnectOptions, Database};
use std::{sync::Arc, time::Duration};
use tracing::info;

use venue_reservation_api::{
    db,
    services::{
        catalog::{
            CatalogService, CreateDepartmentRequest, CreateFacilityRequest, CreateVenueRequest,
        },
        timeslots::SeaOrmTimeSlotStore,
    },
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Populate the reservation database with demo data")]
struct Args {
    /// Database connection string
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://reservations.db?mode=rwc"
    )]
    database_url: String,

    /// Apply migrations before seeding
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    info!("=== Venue Reservation Seed Data ===");

    let mut options = ConnectOptions::new(args.database_url.clone());
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10));

    info!("Connecting to database: {}", args.database_url);
    let pool = Arc::new(Database::connect(options).await?);

    if args.migrate {
        db::run_migrations(&pool).await?;
    }

    let slots = Arc::new(SeaOrmTimeSlotStore::new(pool.clone(), 3));
    let catalog = CatalogService::new(pool, slots);

    info!("Creating departments...");
    let departments = [
        ("Facilities Support Services", "FSS", Some("fss.approver@example.com")),
        ("Corporate Relations", "CRSD", Some("crsd.approver@example.com")),
        ("Human Resources", "HR", None),
        ("Information Technology", "IT", None),
    ];
    for (name, sector, approver) in departments {
        catalog
            .create_department(CreateDepartmentRequest {
                name: name.to_string(),
                sector: sector.to_string(),
                approver_email: approver.map(str::to_string),
            })
            .await?;
    }
    info!("  Created {} departments", departments.len());

    info!("Creating facilities...");
    let facilities = [
        ("Projector", Some("Ceiling mounted, HDMI input"), true),
        ("Sound System", Some("Two wireless microphones"), true),
        ("Whiteboard", None, false),
        ("Coffee Service", Some("Requested 2 days ahead"), false),
    ];
    for (name, description, requires_asset_number) in facilities {
        catalog
            .create_facility(CreateFacilityRequest {
                name: name.to_string(),
                description: description.map(str::to_string),
                requires_asset_number,
            })
            .await?;
    }
    info!("  Created {} facilities", facilities.len());

    info!("Creating venues...");
    let venues = [
        CreateVenueRequest {
            name: "Grand Function Hall".to_string(),
            venue_group: "CRSD".to_string(),
            exclusive_to: None,
            self_service: false,
            capacity: Some("Theater 300, Banquet 180".to_string()),
            facilities_available: Some("Projector, Sound System".to_string()),
            approver_email: Some("crsd.approver@example.com".to_string()),
        },
        CreateVenueRequest {
            name: "Executive Boardroom".to_string(),
            venue_group: "CRSD".to_string(),
            exclusive_to: Some("CRSD".to_string()),
            self_service: false,
            capacity: Some("Boardroom 20".to_string()),
            facilities_available: Some("Projector, Whiteboard".to_string()),
            approver_email: Some("crsd.approver@example.com".to_string()),
        },
        CreateVenueRequest {
            name: "FSS Training Room".to_string(),
            venue_group: "FSS".to_string(),
            exclusive_to: Some("FSS".to_string()),
            self_service: true,
            capacity: Some("Classroom 40".to_string()),
            facilities_available: Some("Whiteboard".to_string()),
            approver_email: None,
        },
        CreateVenueRequest {
            name: "Meeting Room 3B".to_string(),
            venue_group: "General".to_string(),
            exclusive_to: None,
            self_service: false,
            capacity: Some("Boardroom 12".to_string()),
            facilities_available: None,
            approver_email: Some("facilities@example.com".to_string()),
        },
    ];
    let venue_count = venues.len();
    for venue in venues {
        catalog.create_venue(venue).await?;
    }
    info!("  Created {} venues", venue_count);

    info!("=== Seed Data Complete ===");
    info!("Try these API calls:");
    info!("  curl http://localhost:8080/api/v1/venues");
    info!("  curl http://localhost:8080/api/v1/departments");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}
