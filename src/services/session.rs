use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::SessionClaims;

/// Map a verified session to its local user row, creating it on first visit.
pub async fn resolve_user(
    db: &DatabaseConnection,
    claims: &SessionClaims,
    admin_email: Option<&str>,
) -> AppResult<user::Model> {
    if let Some(existing) = find_by_external_id(db, &claims.sub).await? {
        return Ok(existing);
    }

    let role = match admin_email {
        Some(email) if email.eq_ignore_ascii_case(&claims.email) => UserRole::Admin,
        _ => UserRole::User,
    };

    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        external_auth_id: Set(claims.sub.clone()),
        email: Set(claims.email.clone()),
        name: Set(claims.display_name()),
        image_url: Set(claims.picture.clone()),
        role: Set(role),
        ..Default::default()
    };

    match new_user.insert(db).await {
        Ok(created) => {
            tracing::info!(user_id = %created.id, role = ?created.role, "Created user on first sign-in");
            Ok(created)
        }
        // Two first requests raced; the other one created the row
        Err(e) if is_unique_violation(&e) => find_by_external_id(db, &claims.sub)
            .await?
            .ok_or_else(|| AppError::Conflict("Email already belongs to another account".to_string())),
        Err(e) => Err(e.into()),
    }
}

async fn find_by_external_id(db: &DatabaseConnection, external_id: &str) -> AppResult<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::ExternalAuthId.eq(external_id))
        .one(db)
        .await?)
}
