use chrono::{Datelike, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::car::{self, CarStatus};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::listing::ci_contains;
use crate::services::media::{remove_images, store_images, ObjectStorage};
use crate::services::scope::{own_dealership_id, Scope};

#[derive(Debug, Clone, Deserialize)]
pub struct CarInput {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub mileage: i32,
    pub color: String,
    pub fuel_type: String,
    pub transmission: String,
    pub body_type: String,
    pub seats: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: CarStatus,
    #[serde(default)]
    pub featured: bool,
}

fn default_status() -> CarStatus {
    CarStatus::Available
}

#[derive(Debug, Deserialize)]
pub struct NewCarRequest {
    #[serde(flatten)]
    pub car: CarInput,
    /// `data:image/...` URLs
    pub images: Vec<String>,
}

/// Fields of a car to change; `None` leaves the current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarPatch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub mileage: Option<i32>,
    pub color: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub body_type: Option<String>,
    pub seats: Option<i32>,
    pub description: Option<String>,
    pub status: Option<CarStatus>,
    pub featured: Option<bool>,
    /// Full image list: stored URLs to keep plus data URLs to upload
    pub images: Option<Vec<String>>,
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn check_year(year: i32) -> AppResult<()> {
    let latest = Utc::now().year() + 1;
    if !(1900..=latest).contains(&year) {
        return Err(AppError::Validation(format!(
            "Year must be between 1900 and {}",
            latest
        )));
    }
    Ok(())
}

fn check_numbers(price: Option<f64>, mileage: Option<i32>, seats: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| !p.is_finite() || p <= 0.0) {
        return Err(AppError::Validation("Price must be greater than 0".to_string()));
    }
    if mileage.is_some_and(|m| m < 0) {
        return Err(AppError::Validation("Mileage cannot be negative".to_string()));
    }
    if seats.is_some_and(|s| s <= 0) {
        return Err(AppError::Validation("Seats must be a positive number".to_string()));
    }
    Ok(())
}

impl CarInput {
    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("Make", &self.make),
            ("Model", &self.model),
            ("Color", &self.color),
            ("Fuel type", &self.fuel_type),
            ("Transmission", &self.transmission),
            ("Body type", &self.body_type),
        ] {
            require_text(field, value)?;
        }
        check_year(self.year)?;
        check_numbers(Some(self.price), Some(self.mileage), self.seats)
    }
}

impl CarPatch {
    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("Make", &self.make),
            ("Model", &self.model),
            ("Color", &self.color),
            ("Fuel type", &self.fuel_type),
            ("Transmission", &self.transmission),
            ("Body type", &self.body_type),
        ] {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }
        if let Some(year) = self.year {
            check_year(year)?;
        }
        check_numbers(self.price, self.mileage, self.seats)
    }

    fn apply(self, active: &mut car::ActiveModel) {
        if let Some(v) = self.make {
            active.make = Set(v.trim().to_string());
        }
        if let Some(v) = self.model {
            active.model = Set(v.trim().to_string());
        }
        if let Some(v) = self.year {
            active.year = Set(v);
        }
        if let Some(v) = self.price {
            active.price = Set(v);
        }
        if let Some(v) = self.mileage {
            active.mileage = Set(v);
        }
        if let Some(v) = self.color {
            active.color = Set(v.trim().to_string());
        }
        if let Some(v) = self.fuel_type {
            active.fuel_type = Set(v.trim().to_string());
        }
        if let Some(v) = self.transmission {
            active.transmission = Set(v.trim().to_string());
        }
        if let Some(v) = self.body_type {
            active.body_type = Set(v.trim().to_string());
        }
        if let Some(v) = self.seats {
            active.seats = Set(Some(v));
        }
        if let Some(v) = self.description {
            active.description = Set(v);
        }
        if let Some(v) = self.status {
            active.status = Set(v);
        }
        if let Some(v) = self.featured {
            active.featured = Set(v);
        }
    }
}

/// Stored images dropped from the new image list
pub fn unreferenced_images(current: &[String], next: &[String]) -> Vec<String> {
    current
        .iter()
        .filter(|url| !next.contains(url))
        .cloned()
        .collect()
}

/// Cars the caller manages: every car for admins, otherwise the caller's
/// dealership
pub async fn admin_cars(
    db: &DatabaseConnection,
    user: &user::Model,
    search: Option<&str>,
) -> AppResult<Vec<car::Model>> {
    let scope = match user.role {
        UserRole::Admin => Scope::All,
        _ => own_dealership_id(db, user.id)
            .await?
            .map(Scope::Dealership)
            .unwrap_or(Scope::Unassigned),
    };

    let mut condition = scope.car_condition();
    if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(ci_contains(car::Column::Make, term))
                .add(ci_contains(car::Column::Model, term))
                .add(ci_contains(car::Column::Color, term)),
        );
    }

    Ok(car::Entity::find()
        .filter(condition)
        .order_by_desc(car::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn add_car(
    db: &DatabaseConnection,
    storage: &dyn ObjectStorage,
    user: &user::Model,
    request: NewCarRequest,
) -> AppResult<car::Model> {
    let dealership_id = own_dealership_id(db, user.id)
        .await?
        .ok_or_else(|| AppError::Validation("Please set up your dealership first".to_string()))?;

    let input = request.car;
    input.validate()?;

    let car_id = Uuid::new_v4();
    let images = store_images(storage, car_id, &request.images, &[]).await?;
    if images.is_empty() {
        return Err(AppError::Validation(
            "At least one valid image is required".to_string(),
        ));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let car = car::ActiveModel {
        id: Set(car_id),
        dealership_id: Set(dealership_id),
        make: Set(input.make.trim().to_string()),
        model: Set(input.model.trim().to_string()),
        year: Set(input.year),
        price: Set(input.price),
        mileage: Set(input.mileage),
        color: Set(input.color.trim().to_string()),
        fuel_type: Set(input.fuel_type.trim().to_string()),
        transmission: Set(input.transmission.trim().to_string()),
        body_type: Set(input.body_type.trim().to_string()),
        seats: Set(input.seats),
        description: Set(input.description),
        status: Set(input.status),
        featured: Set(input.featured),
        images: Set(images),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(car_id = %car.id, dealership_id = %dealership_id, "Car listed");

    Ok(car)
}

/// Load a car the caller may edit: admins any car, dealerships their own
pub async fn authorize_car_edit(
    db: &DatabaseConnection,
    user: &user::Model,
    car_id: Uuid,
) -> AppResult<car::Model> {
    let car = car::Entity::find_by_id(car_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    let allowed = match user.role {
        UserRole::Admin => true,
        UserRole::Dealership => own_dealership_id(db, user.id).await? == Some(car.dealership_id),
        UserRole::User => false,
    };

    if !allowed {
        return Err(AppError::Forbidden(
            "You can only manage your own dealership's cars".to_string(),
        ));
    }

    Ok(car)
}

pub async fn update_car(
    db: &DatabaseConnection,
    storage: &dyn ObjectStorage,
    user: &user::Model,
    car_id: Uuid,
    mut patch: CarPatch,
) -> AppResult<car::Model> {
    patch.validate()?;
    let car = authorize_car_edit(db, user, car_id).await?;

    let mut dropped = Vec::new();
    let new_images = match patch.images.take() {
        Some(entries) => {
            let images = store_images(storage, car.id, &entries, &car.images).await?;
            if images.is_empty() {
                return Err(AppError::Validation(
                    "At least one valid image is required".to_string(),
                ));
            }
            dropped = unreferenced_images(&car.images, &images);
            Some(images)
        }
        None => None,
    };

    let mut active = car.into_active_model();
    patch.apply(&mut active);
    if let Some(images) = new_images {
        active.images = Set(images);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(db).await?;
    remove_images(storage, &dropped).await;

    tracing::info!(car_id = %updated.id, updated_by = %user.id, "Car updated");

    Ok(updated)
}

/// Delete a car; its bookings and wishlist rows go with it
pub async fn delete_car(
    db: &DatabaseConnection,
    storage: &dyn ObjectStorage,
    user: &user::Model,
    car_id: Uuid,
) -> AppResult<()> {
    let car = authorize_car_edit(db, user, car_id).await?;

    car::Entity::delete_by_id(car.id).exec(db).await?;
    remove_images(storage, &car.images).await;

    tracing::info!(car_id = %car.id, deleted_by = %user.id, "Car deleted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CarInput {
        CarInput {
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2021,
            price: 24_500.0,
            mileage: 30_000,
            color: "Blue".to_string(),
            fuel_type: "Petrol".to_string(),
            transmission: "Automatic".to_string(),
            body_type: "Sedan".to_string(),
            seats: Some(5),
            description: String::new(),
            status: CarStatus::Available,
            featured: false,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_input_rejects_bad_values() {
        let mut car = input();
        car.make = "  ".to_string();
        assert!(matches!(car.validate(), Err(AppError::Validation(_))));

        let mut car = input();
        car.price = 0.0;
        assert!(car.validate().is_err());

        let mut car = input();
        car.mileage = -1;
        assert!(car.validate().is_err());

        let mut car = input();
        car.year = 1850;
        assert!(car.validate().is_err());
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        assert!(CarPatch::default().validate().is_ok());

        let patch = CarPatch {
            price: Some(-5.0),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_new_car_request_defaults() {
        let request: NewCarRequest = serde_json::from_value(serde_json::json!({
            "make": "Honda",
            "model": "Civic",
            "year": 2020,
            "price": 18000.0,
            "mileage": 12000,
            "color": "Red",
            "fuel_type": "Petrol",
            "transmission": "Manual",
            "body_type": "Hatchback",
            "images": ["data:image/png;base64,aGVsbG8="]
        }))
        .unwrap();

        assert_eq!(request.car.status, CarStatus::Available);
        assert!(!request.car.featured);
        assert_eq!(request.images.len(), 1);
    }

    #[test]
    fn test_unreferenced_images() {
        let current = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let next = vec!["b".to_string(), "new".to_string()];
        assert_eq!(unreferenced_images(&current, &next), vec!["a", "c"]);
    }
}
