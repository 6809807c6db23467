use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{car, saved_car, user};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct ToggleResult {
    pub car_id: Uuid,
    pub saved: bool,
}

/// Add the car to the user's wishlist, or remove it when already saved
pub async fn toggle_saved_car(
    db: &DatabaseConnection,
    user: &user::Model,
    car_id: Uuid,
) -> AppResult<ToggleResult> {
    car::Entity::find_by_id(car_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    if let Some(existing) = saved_car::Entity::find_by_id((user.id, car_id)).one(db).await? {
        existing.delete(db).await?;
        tracing::debug!(user_id = %user.id, car_id = %car_id, "Car removed from wishlist");
        return Ok(ToggleResult { car_id, saved: false });
    }

    saved_car::ActiveModel {
        user_id: Set(user.id),
        car_id: Set(car_id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::debug!(user_id = %user.id, car_id = %car_id, "Car added to wishlist");
    Ok(ToggleResult { car_id, saved: true })
}

/// Cars on the user's wishlist, most recently saved first
pub async fn saved_cars(db: &DatabaseConnection, user: &user::Model) -> AppResult<Vec<car::Model>> {
    let rows = saved_car::Entity::find()
        .filter(saved_car::Column::UserId.eq(user.id))
        .order_by_desc(saved_car::Column::SavedAt)
        .find_also_related(car::Entity)
        .all(db)
        .await?;

    Ok(rows.into_iter().filter_map(|(_, car)| car).collect())
}
