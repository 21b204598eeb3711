mod common;

use assert_matches::assert_matches;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::sync::Arc;

use common::{slot, TestApp};
use venue_reservation_api::{
    entities::venue,
    errors::ServiceError,
    services::timeslots::{SeaOrmTimeSlotStore, TimeSlotStore},
};

async fn load_venue(app: &TestApp, id: uuid::Uuid) -> venue::Model {
    venue::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("venue exists")
}

#[tokio::test]
async fn add_then_remove_round_trips_through_the_venue_record() {
    let app = TestApp::new().await;
    let hall = app.seed_venue("General", None, false).await;
    let store = SeaOrmTimeSlotStore::new(app.state.db.clone(), 3);
    let morning = slot("2030-01-01T10:00:00Z", "2030-01-01T11:00:00Z");

    store.add_slot(hall.id, &morning).await.unwrap();
    assert_eq!(store.slots(hall.id).await.unwrap(), vec![morning]);

    let stored = load_venue(&app, hall.id).await;
    assert_eq!(
        stored.timeslots.as_deref(),
        Some(r#"["2030-01-01T10:00:00Z 2030-01-01T11:00:00Z"]"#)
    );
    assert_eq!(stored.version, 1);

    assert!(store.remove_slot(hall.id, &morning).await.unwrap());
    assert!(store.slots(hall.id).await.unwrap().is_empty());
    assert_eq!(load_venue(&app, hall.id).await.version, 2);
}

#[tokio::test]
async fn removing_a_missing_interval_is_a_no_op() {
    let app = TestApp::new().await;
    let hall = app.seed_venue("General", None, false).await;
    let store = SeaOrmTimeSlotStore::new(app.state.db.clone(), 3);
    let morning = slot("2030-01-01T10:00:00Z", "2030-01-01T11:00:00Z");
    let afternoon = slot("2030-01-01T14:00:00Z", "2030-01-01T15:00:00Z");

    store.add_slot(hall.id, &morning).await.unwrap();
    assert!(!store.remove_slot(hall.id, &afternoon).await.unwrap());

    assert_eq!(store.slots(hall.id).await.unwrap(), vec![morning]);
    assert_eq!(load_venue(&app, hall.id).await.version, 1);
}

#[tokio::test]
async fn adding_an_overlapping_interval_is_rejected() {
    let app = TestApp::new().await;
    let hall = app.seed_venue("General", None, false).await;
    let store = SeaOrmTimeSlotStore::new(app.state.db.clone(), 3);

    store
        .add_slot(
            hall.id,
            &slot("2030-01-01T10:00:00Z", "2030-01-01T11:00:00Z"),
        )
        .await
        .unwrap();

    let touching = slot("2030-01-01T11:00:00Z", "2030-01-01T12:00:00Z");
    assert_matches!(
        store.add_slot(hall.id, &touching).await,
        Err(ServiceError::SlotUnavailable(_))
    );
    assert_eq!(store.slots(hall.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_venue_is_not_found() {
    let app = TestApp::new().await;
    let store = SeaOrmTimeSlotStore::new(app.state.db.clone(), 3);

    assert_matches!(
        store.slots(uuid::Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn malformed_and_legacy_entries_are_tolerated() {
    let app = TestApp::new().await;
    let hall = app.seed_venue("General", None, false).await;

    let mut active: venue::ActiveModel = load_venue(&app, hall.id).await.into();
    active.timeslots = Set(Some(
        r#"["2030-01-01T10:00Z 2030-01-01T11:00Z", "garbage"]"#.to_string(),
    ));
    active.update(&*app.state.db).await.unwrap();

    let store = SeaOrmTimeSlotStore::new(app.state.db.clone(), 3);
    let legacy = slot("2030-01-01T10:00:00Z", "2030-01-01T11:00:00Z");
    assert_eq!(store.slots(hall.id).await.unwrap(), vec![legacy]);

    assert!(store.remove_slot(hall.id, &legacy).await.unwrap());
    let stored = load_venue(&app, hall.id).await;
    assert_eq!(stored.timeslots.as_deref(), Some(r#"["garbage"]"#));
}

#[tokio::test]
async fn concurrent_adds_on_one_venue_admit_a_single_winner() {
    let app = TestApp::new().await;
    let hall = app.seed_venue("General", None, false).await;
    let store: Arc<dyn TimeSlotStore> =
        Arc::new(SeaOrmTimeSlotStore::new(app.state.db.clone(), 5));
    let wanted = slot("2030-01-01T10:00:00Z", "2030-01-01T11:00:00Z");

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        let venue_id = hall.id;
        tasks.push(tokio::spawn(async move {
            store.add_slot(venue_id, &wanted).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => successes += 1,
            Err(ServiceError::SlotUnavailable(_)) | Err(ServiceError::ConcurrentModification(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.slots(hall.id).await.unwrap(), vec![wanted]);
}

#[tokio::test]
async fn racing_adds_of_disjoint_intervals_all_land() {
    let app = TestApp::new().await;
    let hall = app.seed_venue("General", None, false).await;
    let store: Arc<dyn TimeSlotStore> =
        Arc::new(SeaOrmTimeSlotStore::new(app.state.db.clone(), 10));

    let mut tasks = Vec::new();
    for day in 1..=4 {
        let store = store.clone();
        let venue_id = hall.id;
        let wanted = slot(
            &format!("2030-02-0{}T10:00:00Z", day),
            &format!("2030-02-0{}T11:00:00Z", day),
        );
        tasks.push(tokio::spawn(async move {
            store.add_slot(venue_id, &wanted).await
        }));
    }
    for task in tasks {
        task.await.unwrap().expect("disjoint add should succeed after retrying");
    }

    let mut stored = store.slots(hall.id).await.unwrap();
    stored.sort_by_key(|s| s.start);
    assert_eq!(stored.len(), 4);
    assert_eq!(load_venue(&app, hall.id).await.version, 4);
}
