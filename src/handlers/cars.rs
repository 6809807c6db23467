use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::EntityTrait;
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{car, user};
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppQuery};
use crate::middleware::auth::AuthUser;
use crate::services::listing::{self, CarDetails, CarFilters, CarListing, CarPage, ListingQuery};
use crate::services::vision::{self, SearchHints};
use crate::services::wishlist::{self, ToggleResult};
use crate::utils::finance::{estimate_loan, LoanEstimate, DEFAULT_INTEREST_RATE, DEFAULT_TENURE_YEARS};
use crate::AppState;

fn viewer(auth: &Option<Extension<AuthUser>>) -> Option<&user::Model> {
    auth.as_ref().map(|Extension(user)| &user.0)
}

pub async fn list_cars(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    AppQuery(query): AppQuery<ListingQuery>,
) -> AppResult<Json<CarPage>> {
    let page = listing::list_cars(&state.db, viewer(&auth), &query).await?;
    Ok(Json(page))
}

pub async fn car_filters(State(state): State<AppState>) -> AppResult<Json<CarFilters>> {
    Ok(Json(listing::car_filters(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<u64>,
}

pub async fn featured_cars(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    AppQuery(query): AppQuery<FeaturedQuery>,
) -> AppResult<Json<Vec<CarListing>>> {
    let limit = query
        .limit
        .unwrap_or(listing::DEFAULT_FEATURED_LIMIT)
        .clamp(1, listing::MAX_PAGE_SIZE);

    Ok(Json(listing::featured_cars(&state.db, viewer(&auth), limit).await?))
}

pub async fn car_details(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CarDetails>> {
    Ok(Json(listing::car_details(&state.db, viewer(&auth), id).await?))
}

#[derive(Debug, Deserialize)]
pub struct LoanQuery {
    pub down_payment: Option<f64>,
    pub interest_rate: Option<f64>,
    pub tenure_years: Option<u32>,
}

/// Monthly payment for financing a listed car. `null` when nothing is financed.
pub async fn loan_estimate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppQuery(query): AppQuery<LoanQuery>,
) -> AppResult<Json<Option<LoanEstimate>>> {
    for (field, value) in [
        ("down_payment", query.down_payment),
        ("interest_rate", query.interest_rate),
    ] {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(AppError::Validation(format!("{} must be a finite number", field)));
        }
    }

    let car = car::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    Ok(Json(estimate_loan(
        car.price,
        query.down_payment.unwrap_or(0.0),
        query.interest_rate.unwrap_or(DEFAULT_INTEREST_RATE),
        query.tenure_years.unwrap_or(DEFAULT_TENURE_YEARS),
    )))
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    /// `data:image/...;base64,...`
    pub image: String,
}

/// Make, body type and colour read from a photo, for prefilling search filters
pub async fn image_search(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImageRequest>,
) -> AppResult<Json<SearchHints>> {
    let hints = vision::search_hints(state.vision.as_ref(), &payload.image).await?;
    tracing::debug!(make = %hints.make, body_type = %hints.body_type, "Image search analysed");
    Ok(Json(hints))
}

pub async fn saved_cars(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<car::Model>>> {
    Ok(Json(wishlist::saved_cars(&state.db, &user).await?))
}

pub async fn toggle_saved_car(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(car_id): Path<Uuid>,
) -> AppResult<Json<ToggleResult>> {
    Ok(Json(wishlist::toggle_saved_car(&state.db, &user, car_id).await?))
}
