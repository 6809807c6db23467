use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, QueryTrait};
use sea_orm::sea_query::SelectStatement;
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::entities::{car, dealership};
use crate::error::{AppError, AppResult};

/// Which dealerships' cars and bookings an admin view covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Dealership(Uuid),
    /// Caller has not set up a dealership yet, so nothing is in scope
    Unassigned,
}

impl Scope {
    pub fn car_condition(&self) -> Condition {
        match self {
            Scope::All => Condition::all(),
            Scope::Dealership(id) => Condition::all().add(car::Column::DealershipId.eq(*id)),
            // dealership_id is NOT NULL, so this matches no rows
            Scope::Unassigned => Condition::all().add(car::Column::DealershipId.is_null()),
        }
    }

    /// `SELECT id FROM car WHERE <scope>` for filtering bookings by car
    pub fn car_ids_query(&self) -> SelectStatement {
        car::Entity::find()
            .select_only()
            .column(car::Column::Id)
            .filter(self.car_condition())
            .into_query()
    }
}

/// Resolve the `filter` query parameter of an admin view.
///
/// No filter means the caller's own dealership. Admins may pass `all` or a
/// dealership id; dealerships may only name their own.
pub async fn resolve_scope(
    db: &DatabaseConnection,
    user: &user::Model,
    filter: Option<&str>,
) -> AppResult<Scope> {
    let own = own_dealership_id(db, user.id).await?;
    let own_scope = own.map(Scope::Dealership).unwrap_or(Scope::Unassigned);

    let requested = match filter.map(str::trim).filter(|f| !f.is_empty()) {
        None => return Ok(own_scope),
        Some("all") => Scope::All,
        Some(raw) => Scope::Dealership(
            Uuid::parse_str(raw)
                .map_err(|_| AppError::Validation(format!("Invalid dealership filter: {}", raw)))?,
        ),
    };

    if requested == own_scope || user.role == UserRole::Admin {
        Ok(requested)
    } else {
        Err(AppError::Forbidden(
            "Dealerships can only view their own data".to_string(),
        ))
    }
}

pub async fn own_dealership_id(db: &DatabaseConnection, user_id: Uuid) -> AppResult<Option<Uuid>> {
    Ok(dealership::Entity::find()
        .filter(dealership::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .map(|d| d.id))
}
