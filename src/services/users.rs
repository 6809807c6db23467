use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::entities::dealership;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

pub async fn list_users(db: &DatabaseConnection) -> AppResult<Vec<user::Model>> {
    Ok(user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn update_user_role(
    db: &DatabaseConnection,
    admin: &user::Model,
    user_id: Uuid,
    role: UserRole,
) -> AppResult<user::Model> {
    if admin.id == user_id {
        return Err(AppError::Validation("You cannot change your own role".to_string()));
    }

    let target = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let previous = target.role;
    let mut active = target.into_active_model();
    active.role = Set(role);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db).await?;

    tracing::info!(
        user_id = %updated.id,
        from = ?previous,
        to = ?role,
        changed_by = %admin.id,
        "User role updated"
    );

    Ok(updated)
}

#[derive(Debug, Serialize)]
pub struct OwnerProfile {
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct DealershipListing {
    #[serde(flatten)]
    pub dealership: dealership::Model,
    pub user: Option<OwnerProfile>,
}

pub async fn list_dealerships(db: &DatabaseConnection) -> AppResult<Vec<DealershipListing>> {
    let rows = dealership::Entity::find()
        .find_also_related(user::Entity)
        .order_by_desc(dealership::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(dealership, owner)| DealershipListing {
            dealership,
            user: owner.map(|u| OwnerProfile {
                name: u.name,
                email: u.email,
                image_url: u.image_url,
                role: u.role,
            }),
        })
        .collect())
}
