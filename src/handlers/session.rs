use axum::{Extension, Json};

use crate::entities::user;
use crate::middleware::auth::AuthUser;

/// The signed-in user, created on first sight
pub async fn me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<user::Model> {
    Json(user)
}
