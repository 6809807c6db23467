use axum::{extract::State, Extension, Json};

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::services::listing::DealershipWithHours;
use crate::services::settings::{self, DealershipContact, WorkingHourInput};
use crate::AppState;

pub async fn dealership_info(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DealershipWithHours>> {
    Ok(Json(settings::dealership_info(&state.db, &user).await?))
}

pub async fn save_dealership(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<DealershipContact>,
) -> AppResult<Json<DealershipWithHours>> {
    Ok(Json(settings::save_dealership(&state.db, &user, payload).await?))
}

pub async fn save_working_hours(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<Vec<WorkingHourInput>>,
) -> AppResult<Json<DealershipWithHours>> {
    Ok(Json(settings::save_working_hours(&state.db, &user, payload).await?))
}
