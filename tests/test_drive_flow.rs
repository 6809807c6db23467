mod common;

use chrono::NaiveDate;
use sea_orm::{DatabaseBackend, MockDatabase};
use uuid::Uuid;

use car_marketplace::entities::car::CarStatus;
use car_marketplace::entities::test_drive::{self, BookingStatus};
use car_marketplace::entities::user::UserRole;
use car_marketplace::services::booking::{
    book_test_drive, cancel_test_drive, update_test_drive_status, BookTestDriveRequest,
};
use car_marketplace::AppError;

fn request(car_id: Uuid) -> BookTestDriveRequest {
    BookTestDriveRequest {
        car_id,
        booking_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        start_time: "09:00".to_string(),
        end_time: "09:30".to_string(),
        notes: Some("  ".to_string()),
    }
}

#[tokio::test]
async fn test_book_conflict_then_cancel() {
    let customer = common::user(UserRole::User);
    let car = common::car(Uuid::new_v4(), CarStatus::Available);
    let pending = common::booking(car.id, customer.id, BookingStatus::Pending);
    let cancelled = test_drive::Model {
        status: BookingStatus::Cancelled,
        ..pending.clone()
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // first request: car, no occupying booking, inserted row
        .append_query_results([vec![car.clone()]])
        .append_query_results([Vec::<test_drive::Model>::new()])
        .append_query_results([vec![pending.clone()]])
        // second request: car, slot held by the first booking
        .append_query_results([vec![car.clone()]])
        .append_query_results([vec![pending.clone()]])
        // cancel: load booking, updated row
        .append_query_results([vec![pending.clone()]])
        .append_query_results([vec![cancelled.clone()]])
        .into_connection();

    let booked = book_test_drive(&db, &customer, request(car.id)).await.unwrap();
    assert_eq!(booked.status, BookingStatus::Pending);
    assert_eq!(booked.start_time, "09:00");

    let second = book_test_drive(&db, &customer, request(car.id)).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let result = cancel_test_drive(&db, &customer, booked.id).await.unwrap();
    assert_eq!(result.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_booking_requires_available_car() {
    let customer = common::user(UserRole::User);
    let sold = common::car(Uuid::new_v4(), CarStatus::Sold);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sold.clone()]])
        .into_connection();

    let result = book_test_drive(&db, &customer, request(sold.id)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_booking_rejects_end_before_start_without_querying() {
    let customer = common::user(UserRole::User);
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let mut bad = request(Uuid::new_v4());
    bad.end_time = "08:30".to_string();

    let result = book_test_drive(&db, &customer, bad).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_cancelled_and_completed_bookings_cannot_be_cancelled() {
    let customer = common::user(UserRole::User);
    let car_id = Uuid::new_v4();

    for status in [BookingStatus::Cancelled, BookingStatus::Completed] {
        let existing = common::booking(car_id, customer.id, status);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .into_connection();

        let result = cancel_test_drive(&db, &customer, existing.id).await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{status:?}");
    }
}

#[tokio::test]
async fn test_other_users_cannot_cancel() {
    let owner = common::user(UserRole::User);
    let stranger = common::user(UserRole::User);
    let existing = common::booking(Uuid::new_v4(), owner.id, BookingStatus::Pending);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![existing.clone()]])
        .into_connection();

    let result = cancel_test_drive(&db, &stranger, existing.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_status_update_follows_workflow() {
    let customer = common::user(UserRole::User);
    let pending = common::booking(Uuid::new_v4(), customer.id, BookingStatus::Pending);

    // PENDING -> COMPLETED skips confirmation
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![pending.clone()]])
        .into_connection();
    let result = update_test_drive_status(&db, pending.id, BookingStatus::Completed).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let confirmed = test_drive::Model {
        status: BookingStatus::Confirmed,
        ..pending.clone()
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![pending.clone()]])
        .append_query_results([vec![confirmed.clone()]])
        .into_connection();
    let updated = update_test_drive_status(&db, pending.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(updated.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_unpadded_start_time_hits_the_same_slot() {
    let customer = common::user(UserRole::User);
    let car = common::car(Uuid::new_v4(), CarStatus::Available);
    let held = common::booking(car.id, Uuid::new_v4(), BookingStatus::Confirmed);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![car.clone()]])
        .append_query_results([vec![held]])
        .into_connection();

    let mut unpadded = request(car.id);
    unpadded.start_time = "9:00".to_string();
    unpadded.end_time = "9:30".to_string();

    let result = book_test_drive(&db, &customer, unpadded).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // the slot lookup is bound with the stored form of the time
    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains(r#"String(Some("09:00"))"#), "{log}");
    assert!(!log.contains(r#"String(Some("9:00"))"#), "{log}");
}

#[tokio::test]
async fn test_unpadded_times_are_stored_padded() {
    let customer = common::user(UserRole::User);
    let car = common::car(Uuid::new_v4(), CarStatus::Available);
    let created = common::booking(car.id, customer.id, BookingStatus::Pending);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![car.clone()]])
        .append_query_results([Vec::<test_drive::Model>::new()])
        .append_query_results([vec![created]])
        .into_connection();

    let mut unpadded = request(car.id);
    unpadded.start_time = "9:00".to_string();
    unpadded.end_time = "9:30".to_string();
    book_test_drive(&db, &customer, unpadded).await.unwrap();

    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains(r#"String(Some("09:30"))"#), "{log}");
    assert!(!log.contains(r#"String(Some("9:00"))"#), "{log}");
}

#[tokio::test]
async fn test_any_dealership_can_cancel() {
    let owner = common::user(UserRole::User);
    let dealer = common::user(UserRole::Dealership);
    // a car listed by some other dealership
    let existing = common::booking(Uuid::new_v4(), owner.id, BookingStatus::Pending);
    let cancelled = test_drive::Model {
        status: BookingStatus::Cancelled,
        ..existing.clone()
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![existing.clone()]])
        .append_query_results([vec![cancelled]])
        .into_connection();

    let result = cancel_test_drive(&db, &dealer, existing.id).await.unwrap();
    assert_eq!(result.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_admin_can_cancel_confirmed_booking() {
    let owner = common::user(UserRole::User);
    let admin = common::user(UserRole::Admin);
    let existing = common::booking(Uuid::new_v4(), owner.id, BookingStatus::Confirmed);
    let cancelled = test_drive::Model {
        status: BookingStatus::Cancelled,
        ..existing.clone()
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![existing.clone()]])
        .append_query_results([vec![cancelled]])
        .into_connection();

    let result = cancel_test_drive(&db, &admin, existing.id).await.unwrap();
    assert_eq!(result.status, BookingStatus::Cancelled);
}
