use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::entities::car::{self, CarStatus};
use crate::entities::test_drive::{self, BookingStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::dealership;
use crate::error::{AppError, AppResult};
use crate::services::listing::ci_contains;
use crate::services::scope::Scope;

const SLOT_TAKEN: &str = "This time slot is already booked. Please select another time.";

#[derive(Debug, Clone, Deserialize)]
pub struct BookTestDriveRequest {
    pub car_id: Uuid,
    pub booking_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub notes: Option<String>,
}

fn parse_slot_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM", value)))
}

/// Start and end must be `HH:MM` with the end after the start. Returns both
/// zero-padded, the form slots are stored and compared in.
pub fn normalize_slot_times(start: &str, end: &str) -> AppResult<(String, String)> {
    let start = parse_slot_time(start)?;
    let end = parse_slot_time(end)?;

    if end <= start {
        return Err(AppError::Validation(
            "Test drive must end after it starts".to_string(),
        ));
    }

    Ok((start.format("%H:%M").to_string(), end.format("%H:%M").to_string()))
}

/// Book a slot on an available car. The booking starts out PENDING.
pub async fn book_test_drive(
    db: &DatabaseConnection,
    user: &user::Model,
    request: BookTestDriveRequest,
) -> AppResult<test_drive::Model> {
    let (start_time, end_time) = normalize_slot_times(&request.start_time, &request.end_time)?;

    let car = car::Entity::find_by_id(request.car_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    if car.status != CarStatus::Available {
        return Err(AppError::Validation(
            "Car is not available for test drives".to_string(),
        ));
    }

    let occupied = test_drive::Entity::find()
        .filter(test_drive::Column::CarId.eq(car.id))
        .filter(test_drive::Column::BookingDate.eq(request.booking_date))
        .filter(test_drive::Column::StartTime.eq(start_time.as_str()))
        .filter(test_drive::Column::Status.is_in(BookingStatus::ACTIVE))
        .one(db)
        .await?;

    if occupied.is_some() {
        return Err(AppError::Conflict(SLOT_TAKEN.to_string()));
    }

    let booking = test_drive::ActiveModel {
        id: Set(Uuid::new_v4()),
        car_id: Set(car.id),
        user_id: Set(user.id),
        booking_date: Set(request.booking_date),
        start_time: Set(start_time),
        end_time: Set(end_time),
        status: Set(BookingStatus::Pending),
        notes: Set(request.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())),
        ..Default::default()
    };

    // The partial unique index catches requests that raced past the check above
    let booking = booking.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(SLOT_TAKEN.to_string())
        } else {
            e.into()
        }
    })?;

    tracing::info!(
        booking_id = %booking.id,
        car_id = %booking.car_id,
        user_id = %user.id,
        date = %booking.booking_date,
        start = %booking.start_time,
        "Test drive booked"
    );

    Ok(booking)
}

#[derive(Debug, Serialize)]
pub struct BookingWithCar {
    #[serde(flatten)]
    pub booking: test_drive::Model,
    pub car: Option<car::Model>,
}

/// The caller's own bookings, latest date first
pub async fn user_test_drives(db: &DatabaseConnection, user: &user::Model) -> AppResult<Vec<BookingWithCar>> {
    let rows = test_drive::Entity::find()
        .filter(test_drive::Column::UserId.eq(user.id))
        .order_by_desc(test_drive::Column::BookingDate)
        .find_also_related(car::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(booking, car)| BookingWithCar { booking, car })
        .collect())
}

/// Why a booking in `status` cannot be cancelled, if it cannot
pub fn cancellation_blocker(status: BookingStatus) -> Option<String> {
    match status {
        BookingStatus::Cancelled => Some("Booking is already cancelled".to_string()),
        BookingStatus::Completed => Some("Cannot cancel a completed booking".to_string()),
        s if !s.can_transition_to(BookingStatus::Cancelled) => {
            Some(format!("Cannot cancel a {} booking", s.label()))
        }
        _ => None,
    }
}

/// Cancel a booking as its owner or as staff (any dealership or admin)
pub async fn cancel_test_drive(
    db: &DatabaseConnection,
    user: &user::Model,
    booking_id: Uuid,
) -> AppResult<test_drive::Model> {
    let booking = test_drive::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let allowed = booking.user_id == user.id || UserRole::STAFF.contains(&user.role);

    if !allowed {
        return Err(AppError::Forbidden(
            "You are not allowed to cancel this booking".to_string(),
        ));
    }

    if let Some(reason) = cancellation_blocker(booking.status) {
        return Err(AppError::Validation(reason));
    }

    let updated = set_status(db, booking, BookingStatus::Cancelled).await?;
    tracing::info!(booking_id = %updated.id, cancelled_by = %user.id, "Test drive cancelled");

    Ok(updated)
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

/// Move a booking along the status workflow (admin)
pub async fn update_test_drive_status(
    db: &DatabaseConnection,
    booking_id: Uuid,
    new_status: BookingStatus,
) -> AppResult<test_drive::Model> {
    let booking = test_drive::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.status == new_status {
        return Err(AppError::Validation(format!(
            "Booking is already {}",
            new_status.label()
        )));
    }

    if !booking.status.can_transition_to(new_status) {
        return Err(AppError::Validation(format!(
            "Cannot move a {} booking to {}",
            booking.status.label(),
            new_status.label()
        )));
    }

    let from = booking.status;
    let updated = set_status(db, booking, new_status).await?;
    tracing::info!(booking_id = %updated.id, from = ?from, to = ?new_status, "Test drive status updated");

    Ok(updated)
}

async fn set_status(
    db: &DatabaseConnection,
    booking: test_drive::Model,
    status: BookingStatus,
) -> AppResult<test_drive::Model> {
    let mut active: test_drive::ActiveModel = booking.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());

    Ok(active.update(db).await?)
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminTestDriveQuery {
    pub search: Option<String>,
    pub status: Option<BookingStatus>,
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookedCar {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub images: Vec<String>,
    pub dealership_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingCustomer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AdminTestDrive {
    #[serde(flatten)]
    pub booking: test_drive::Model,
    pub car: Option<BookedCar>,
    pub user: Option<BookingCustomer>,
}

/// Bookings in scope for the dashboard, optionally filtered by status and text
pub async fn admin_test_drives(
    db: &DatabaseConnection,
    scope: Scope,
    query: &AdminTestDriveQuery,
) -> AppResult<Vec<AdminTestDrive>> {
    let mut select = test_drive::Entity::find();

    if scope != Scope::All {
        select = select.filter(test_drive::Column::CarId.in_subquery(scope.car_ids_query()));
    }

    if let Some(status) = query.status {
        select = select.filter(test_drive::Column::Status.eq(status));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let matching_cars = car::Entity::find()
            .select_only()
            .column(car::Column::Id)
            .filter(
                Condition::any()
                    .add(ci_contains(car::Column::Make, search))
                    .add(ci_contains(car::Column::Model, search)),
            )
            .into_query();

        let matching_users = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .filter(
                Condition::any()
                    .add(ci_contains(user::Column::Name, search))
                    .add(ci_contains(user::Column::Email, search)),
            )
            .into_query();

        select = select.filter(
            Condition::any()
                .add(test_drive::Column::CarId.in_subquery(matching_cars))
                .add(test_drive::Column::UserId.in_subquery(matching_users)),
        );
    }

    let bookings = select
        .order_by_desc(test_drive::Column::BookingDate)
        .order_by_asc(test_drive::Column::StartTime)
        .all(db)
        .await?;

    if bookings.is_empty() {
        return Ok(Vec::new());
    }

    let car_ids: Vec<Uuid> = bookings.iter().map(|b| b.car_id).collect();
    let user_ids: Vec<Uuid> = bookings.iter().map(|b| b.user_id).collect();

    let cars: HashMap<Uuid, car::Model> = car::Entity::find()
        .filter(car::Column::Id.is_in(car_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let dealership_ids: Vec<Uuid> = cars.values().map(|c| c.dealership_id).collect();
    let dealerships: HashMap<Uuid, String> = dealership::Entity::find()
        .filter(dealership::Column::Id.is_in(dealership_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();

    let users: HashMap<Uuid, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(bookings
        .into_iter()
        .map(|booking| {
            let car = cars.get(&booking.car_id).map(|c| BookedCar {
                id: c.id,
                make: c.make.clone(),
                model: c.model.clone(),
                year: c.year,
                images: c.images.clone(),
                dealership_name: dealerships.get(&c.dealership_id).cloned(),
            });
            let user = users.get(&booking.user_id).map(|u| BookingCustomer {
                name: u.name.clone(),
                email: u.email.clone(),
            });

            AdminTestDrive { booking, car, user }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_times_must_be_ordered_hh_mm() {
        assert!(normalize_slot_times("09:00", "09:30").is_ok());
        assert!(matches!(normalize_slot_times("09:30", "09:00"), Err(AppError::Validation(_))));
        assert!(matches!(normalize_slot_times("09:00", "09:00"), Err(AppError::Validation(_))));
        assert!(matches!(normalize_slot_times("9am", "10:00"), Err(AppError::Validation(_))));
        assert!(matches!(normalize_slot_times("09:00", "25:00"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_slot_times_are_zero_padded() {
        assert_eq!(
            normalize_slot_times(" 9:00", "9:30 ").unwrap(),
            ("09:00".to_string(), "09:30".to_string())
        );
        assert_eq!(
            normalize_slot_times("14:05", "15:00").unwrap(),
            ("14:05".to_string(), "15:00".to_string())
        );
    }

    #[test]
    fn test_cancelled_and_completed_bookings_cannot_be_cancelled() {
        assert_eq!(
            cancellation_blocker(BookingStatus::Cancelled).as_deref(),
            Some("Booking is already cancelled")
        );
        assert_eq!(
            cancellation_blocker(BookingStatus::Completed).as_deref(),
            Some("Cannot cancel a completed booking")
        );
        assert!(cancellation_blocker(BookingStatus::NoShow).is_some());
    }

    #[test]
    fn test_active_bookings_can_be_cancelled() {
        assert!(cancellation_blocker(BookingStatus::Pending).is_none());
        assert!(cancellation_blocker(BookingStatus::Confirmed).is_none());
    }
}
