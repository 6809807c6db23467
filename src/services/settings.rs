use std::collections::HashSet;

use chrono::{NaiveTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::entities::working_hour::{self, DayOfWeek};
use crate::entities::{dealership, user};
use crate::error::{AppError, AppResult};
use crate::services::listing::{dealership_with_hours, DealershipWithHours};

#[derive(Debug, Clone, Deserialize)]
pub struct WorkingHourInput {
    pub day_of_week: DayOfWeek,
    pub open_time: String,
    pub close_time: String,
    pub is_open: bool,
}

#[derive(Debug, Deserialize)]
pub struct DealershipContact {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// MON-FRI 09:00-18:00, SAT 10:00-16:00, SUN closed
pub fn default_working_hours() -> Vec<WorkingHourInput> {
    use DayOfWeek::*;

    [Monday, Tuesday, Wednesday, Thursday, Friday, Saturday, Sunday]
        .into_iter()
        .map(|day| {
            let weekday = !matches!(day, Saturday | Sunday);
            WorkingHourInput {
                day_of_week: day,
                open_time: if weekday { "09:00" } else { "10:00" }.to_string(),
                close_time: if weekday { "18:00" } else { "16:00" }.to_string(),
                is_open: day != Sunday,
            }
        })
        .collect()
}

fn parse_hhmm(value: &str) -> AppResult<NaiveTime> {
    let valid_shape = value.len() == 5 && value.as_bytes()[2] == b':';
    valid_shape
        .then(|| NaiveTime::parse_from_str(value, "%H:%M").ok())
        .flatten()
        .ok_or_else(|| AppError::Validation(format!("Invalid time '{}', expected HH:MM", value)))
}

pub fn validate_working_hours(hours: &[WorkingHourInput]) -> AppResult<()> {
    if hours.is_empty() {
        return Err(AppError::Validation("Working hours are required".to_string()));
    }

    let mut seen = HashSet::new();
    for hour in hours {
        if !seen.insert(hour.day_of_week) {
            return Err(AppError::Validation(format!(
                "Duplicate working hours for {:?}",
                hour.day_of_week
            )));
        }

        let open = parse_hhmm(&hour.open_time)?;
        let close = parse_hhmm(&hour.close_time)?;
        if hour.is_open && open >= close {
            return Err(AppError::Validation(format!(
                "{:?}: closing time must be after opening time",
                hour.day_of_week
            )));
        }
    }

    Ok(())
}

async fn upsert_hours<C: ConnectionTrait>(
    db: &C,
    dealership_id: Uuid,
    hours: &[WorkingHourInput],
) -> AppResult<()> {
    let rows = hours.iter().map(|h| working_hour::ActiveModel {
        id: Set(Uuid::new_v4()),
        dealership_id: Set(dealership_id),
        day_of_week: Set(h.day_of_week),
        open_time: Set(h.open_time.clone()),
        close_time: Set(h.close_time.clone()),
        is_open: Set(h.is_open),
    });

    working_hour::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([working_hour::Column::DealershipId, working_hour::Column::DayOfWeek])
                .update_columns([
                    working_hour::Column::OpenTime,
                    working_hour::Column::CloseTime,
                    working_hour::Column::IsOpen,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

async fn find_dealership(db: &DatabaseConnection, user_id: Uuid) -> AppResult<Option<dealership::Model>> {
    Ok(dealership::Entity::find()
        .filter(dealership::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// The caller's dealership, created with default hours on first access
pub async fn dealership_info(db: &DatabaseConnection, user: &user::Model) -> AppResult<DealershipWithHours> {
    if let Some(existing) = find_dealership(db, user.id).await? {
        return dealership_with_hours(db, existing).await;
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let txn = db.begin().await?;

    let created = dealership::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        name: Set(format!("{} Motors", user.name)),
        address: Set(String::new()),
        phone: Set(String::new()),
        email: Set(user.email.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await;

    match created {
        Ok(dealership) => {
            upsert_hours(&txn, dealership.id, &default_working_hours()).await?;
            txn.commit().await?;
            tracing::info!(dealership_id = %dealership.id, user_id = %user.id, "Dealership created");
            dealership_with_hours(db, dealership).await
        }
        // a concurrent request created it first
        Err(e) if is_unique_violation(&e) => {
            txn.rollback().await?;
            let existing = find_dealership(db, user.id)
                .await?
                .ok_or_else(|| AppError::Internal("Dealership vanished after conflict".to_string()))?;
            dealership_with_hours(db, existing).await
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn save_dealership(
    db: &DatabaseConnection,
    user: &user::Model,
    contact: DealershipContact,
) -> AppResult<DealershipWithHours> {
    let name = contact.name.trim();
    let email = contact.email.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Dealership name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("A valid contact email is required".to_string()));
    }

    let current = dealership_info(db, user).await?.dealership;

    let mut active = current.into_active_model();
    active.name = Set(name.to_string());
    active.address = Set(contact.address.trim().to_string());
    active.phone = Set(contact.phone.trim().to_string());
    active.email = Set(email.to_string());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db).await?;

    tracing::info!(dealership_id = %updated.id, "Dealership contact details updated");

    dealership_with_hours(db, updated).await
}

/// Replace working hours day by day. Days not listed keep their row.
pub async fn save_working_hours(
    db: &DatabaseConnection,
    user: &user::Model,
    hours: Vec<WorkingHourInput>,
) -> AppResult<DealershipWithHours> {
    validate_working_hours(&hours)?;

    let current = dealership_info(db, user).await?.dealership;
    upsert_hours(db, current.id, &hours).await?;

    tracing::info!(dealership_id = %current.id, days = hours.len(), "Working hours saved");

    dealership_with_hours(db, current).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hour(day: DayOfWeek, open: &str, close: &str, is_open: bool) -> WorkingHourInput {
        WorkingHourInput {
            day_of_week: day,
            open_time: open.to_string(),
            close_time: close.to_string(),
            is_open,
        }
    }

    #[test]
    fn test_default_hours() {
        let hours = default_working_hours();
        assert_eq!(hours.len(), 7);
        assert!(validate_working_hours(&hours).is_ok());

        let monday = &hours[0];
        assert_eq!((monday.open_time.as_str(), monday.close_time.as_str()), ("09:00", "18:00"));

        let saturday = &hours[5];
        assert!(saturday.is_open);
        assert_eq!(saturday.close_time, "16:00");

        let sunday = &hours[6];
        assert_eq!(sunday.day_of_week, DayOfWeek::Sunday);
        assert!(!sunday.is_open);
    }

    #[test]
    fn test_rejects_malformed_times() {
        for bad in ["9:00", "25:00", "09-00", "0900", "09:60"] {
            let hours = vec![hour(DayOfWeek::Monday, bad, "18:00", true)];
            assert!(validate_working_hours(&hours).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_open_day_must_close_after_opening() {
        let hours = vec![hour(DayOfWeek::Monday, "18:00", "09:00", true)];
        assert!(validate_working_hours(&hours).is_err());

        // closed days may carry any ordering
        let hours = vec![hour(DayOfWeek::Sunday, "18:00", "09:00", false)];
        assert!(validate_working_hours(&hours).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_days_and_empty_input() {
        let hours = vec![
            hour(DayOfWeek::Friday, "09:00", "17:00", true),
            hour(DayOfWeek::Friday, "10:00", "16:00", true),
        ];
        assert!(validate_working_hours(&hours).is_err());
        assert!(validate_working_hours(&[]).is_err());
    }
}
