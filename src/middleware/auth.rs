use std::ops::Deref;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::session::resolve_user;
use crate::utils::jwt::verify_token;
use crate::AppState;

/// The signed-in user, inserted into request extensions by the auth layers
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl Deref for AuthUser {
    type Target = user::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

async fn authenticate(state: &AppState, token: &str) -> AppResult<user::Model> {
    let claims = verify_token(token, &state.config.session_secret)?;
    resolve_user(&state.db, &claims, state.config.admin_email.as_deref()).await
}

/// Require a valid session token and resolve it to a user row
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(auth) =
        auth.ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

    let user = authenticate(&state, auth.token()).await?;
    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}

/// Resolve the user when a token is sent; anonymous when there is none.
/// A token that fails verification is still rejected.
pub async fn optional_auth(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    if let Some(TypedHeader(auth)) = auth {
        let user = authenticate(&state, auth.token()).await?;
        request.extensions_mut().insert(AuthUser(user));
    }

    Ok(next.run(request).await)
}

/// Reject callers whose role is not in `allowed`. Runs after `auth_middleware`.
pub async fn require_role(
    State(allowed): State<&'static [UserRole]>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if !allowed.contains(&user.role) {
        tracing::warn!(user_id = %user.id, role = ?user.role, "Role not permitted for route");
        return Err(AppError::Forbidden(
            "You do not have access to this resource".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
