use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{car, test_drive, user};
use crate::error::AppResult;
use crate::extract::{AppJson, AppQuery};
use crate::handlers::cars::ImageRequest;
use crate::middleware::auth::AuthUser;
use crate::services::booking::{self, AdminTestDrive, AdminTestDriveQuery, UpdateStatusRequest};
use crate::services::dashboard::{self, DashboardData};
use crate::services::inventory::{self, CarPatch, NewCarRequest};
use crate::services::scope::resolve_scope;
use crate::services::users::{self, DealershipListing, UpdateRoleRequest};
use crate::services::vision::{self, ExtractedCar};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    /// `all` or a dealership id; omitted means the caller's dealership
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppQuery(query): AppQuery<ScopeQuery>,
) -> AppResult<Json<DashboardData>> {
    let scope = resolve_scope(&state.db, &user, query.filter.as_deref()).await?;
    Ok(Json(dashboard::dashboard_data(&state.db, &user, scope).await?))
}

// Inventory

pub async fn list_cars(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<Json<Vec<car::Model>>> {
    Ok(Json(
        inventory::admin_cars(&state.db, &user, query.search.as_deref()).await?,
    ))
}

pub async fn add_car(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<NewCarRequest>,
) -> AppResult<(StatusCode, Json<car::Model>)> {
    let car = inventory::add_car(&state.db, state.storage.as_ref(), &user, payload).await?;
    Ok((StatusCode::CREATED, Json(car)))
}

pub async fn update_car(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<CarPatch>,
) -> AppResult<Json<car::Model>> {
    Ok(Json(
        inventory::update_car(&state.db, state.storage.as_ref(), &user, id, payload).await?,
    ))
}

pub async fn delete_car(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    inventory::delete_car(&state.db, state.storage.as_ref(), &user, id).await?;
    Ok(Json(serde_json::json!({ "message": "Car deleted" })))
}

/// Prefill a new listing from a photo
pub async fn extract_car_details(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImageRequest>,
) -> AppResult<Json<ExtractedCar>> {
    Ok(Json(
        vision::extract_car_details(state.vision.as_ref(), &payload.image).await?,
    ))
}

// Test drives

pub async fn list_test_drives(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppQuery(query): AppQuery<AdminTestDriveQuery>,
) -> AppResult<Json<Vec<AdminTestDrive>>> {
    let scope = resolve_scope(&state.db, &user, query.filter.as_deref()).await?;
    Ok(Json(booking::admin_test_drives(&state.db, scope, &query).await?))
}

pub async fn update_test_drive_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> AppResult<Json<test_drive::Model>> {
    Ok(Json(
        booking::update_test_drive_status(&state.db, id, payload.status).await?,
    ))
}

// Users

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<user::Model>>> {
    Ok(Json(users::list_users(&state.db).await?))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> AppResult<Json<user::Model>> {
    Ok(Json(
        users::update_user_role(&state.db, &admin, id, payload.role).await?,
    ))
}

pub async fn list_dealerships(State(state): State<AppState>) -> AppResult<Json<Vec<DealershipListing>>> {
    Ok(Json(users::list_dealerships(&state.db).await?))
}
