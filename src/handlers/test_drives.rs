use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::entities::test_drive;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::services::booking::{self, BookTestDriveRequest, BookingWithCar};
use crate::AppState;

pub async fn book_test_drive(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<BookTestDriveRequest>,
) -> AppResult<(StatusCode, Json<test_drive::Model>)> {
    let booking = booking::book_test_drive(&state.db, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn my_test_drives(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<BookingWithCar>>> {
    Ok(Json(booking::user_test_drives(&state.db, &user).await?))
}

pub async fn cancel_test_drive(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<test_drive::Model>> {
    Ok(Json(booking::cancel_test_drive(&state.db, &user, id).await?))
}
