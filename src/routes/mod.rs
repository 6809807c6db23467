use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::entities::user::UserRole;
use crate::handlers::{admin, cars, session, settings, test_drives};
use crate::middleware::auth::{auth_middleware, optional_auth, require_role};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::user_rate_limit::create_user_governor;
use crate::AppState;

/// Request body cap for routes carrying base64 images in JSON
pub const IMAGE_BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    // Public catalogue; a session only adds wishlist/booking state
    let public_routes = Router::new()
        .route("/cars", get(cars::list_cars))
        .route("/cars/filters", get(cars::car_filters))
        .route("/cars/featured", get(cars::featured_cars))
        .route("/cars/{id}", get(cars::car_details))
        .route("/cars/{id}/loan-estimate", get(cars::loan_estimate))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    // Image search calls the vision model, so it gets a tighter per-IP limit
    let image_search_routes = Router::new()
        .route("/cars/image-search", post(cars::image_search))
        .layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT))
        .layer(create_public_governor());

    // Any signed-in user
    let user_routes = Router::new()
        .route("/me", get(session::me))
        .route("/saved-cars", get(cars::saved_cars))
        .route("/saved-cars/{car_id}/toggle", post(cars::toggle_saved_car))
        .route(
            "/test-drives",
            post(test_drives::book_test_drive).get(test_drives::my_test_drives),
        )
        .route("/test-drives/{id}/cancel", post(test_drives::cancel_test_drive))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Vision extraction, limited per user; the governor runs after auth
    let extraction_routes = Router::new()
        .route("/cars/extract", post(admin::extract_car_details))
        .layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT))
        .layer(create_user_governor());

    // Listing images are uploaded inline with the car
    let inventory_routes = Router::new()
        .route("/cars", get(admin::list_cars).post(admin::add_car))
        .route("/cars/{id}", put(admin::update_car).delete(admin::delete_car))
        .layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT));

    // Dealership dashboard (DEALERSHIP or ADMIN)
    let staff_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/test-drives", get(admin::list_test_drives))
        .route(
            "/settings",
            get(settings::dealership_info).put(settings::save_dealership),
        )
        .route("/settings/working-hours", put(settings::save_working_hours))
        .merge(inventory_routes)
        .merge(extraction_routes)
        .layer(middleware::from_fn_with_state(UserRole::STAFF, require_role))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // ADMIN only
    let admin_routes = Router::new()
        .route("/test-drives/{id}/status", put(admin::update_test_drive_status))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::update_user_role))
        .route("/dealerships", get(admin::list_dealerships))
        .layer(middleware::from_fn_with_state(UserRole::ADMIN_ONLY, require_role))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public_routes.merge(image_search_routes).merge(user_routes))
        .nest("/api/admin", staff_routes.merge(admin_routes))
        .with_state(state)
}
