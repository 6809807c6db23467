mod common;

use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use uuid::Uuid;

use car_marketplace::entities::dealership;
use car_marketplace::entities::user::{self, UserRole};
use car_marketplace::services::scope::{resolve_scope, Scope};
use car_marketplace::AppError;

use common::dealership_for;

/// Database answering the caller's dealership lookup
fn db_with(own: Option<dealership::Model>) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([own.into_iter().collect::<Vec<_>>()])
        .into_connection()
}

fn with_dealership(role: UserRole) -> (user::Model, dealership::Model) {
    let user = common::user(role);
    let info = dealership_for(&user);
    (user, info)
}

#[tokio::test]
async fn test_no_filter_is_own_dealership() {
    let (dealer, info) = with_dealership(UserRole::Dealership);
    let scope = resolve_scope(&db_with(Some(info.clone())), &dealer, None).await.unwrap();
    assert_eq!(scope, Scope::Dealership(info.id));

    let (admin, info) = with_dealership(UserRole::Admin);
    let scope = resolve_scope(&db_with(Some(info.clone())), &admin, Some("  ")).await.unwrap();
    assert_eq!(scope, Scope::Dealership(info.id));
}

#[tokio::test]
async fn test_no_filter_without_dealership_is_unassigned() {
    let dealer = common::user(UserRole::Dealership);
    let scope = resolve_scope(&db_with(None), &dealer, None).await.unwrap();
    assert_eq!(scope, Scope::Unassigned);
}

#[tokio::test]
async fn test_dealership_may_name_itself() {
    let (dealer, info) = with_dealership(UserRole::Dealership);
    let filter = info.id.to_string();
    let scope = resolve_scope(&db_with(Some(info.clone())), &dealer, Some(&filter))
        .await
        .unwrap();
    assert_eq!(scope, Scope::Dealership(info.id));
}

#[tokio::test]
async fn test_dealership_cannot_widen_scope() {
    let (dealer, info) = with_dealership(UserRole::Dealership);
    let other = Uuid::new_v4().to_string();

    for filter in ["all", other.as_str()] {
        let result = resolve_scope(&db_with(Some(info.clone())), &dealer, Some(filter)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))), "{filter}");
    }

    let result = resolve_scope(&db_with(None), &dealer, Some("all")).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_admin_may_pick_any_scope() {
    let admin = common::user(UserRole::Admin);

    let scope = resolve_scope(&db_with(None), &admin, Some("all")).await.unwrap();
    assert_eq!(scope, Scope::All);

    let other = Uuid::new_v4();
    let scope = resolve_scope(&db_with(None), &admin, Some(&other.to_string()))
        .await
        .unwrap();
    assert_eq!(scope, Scope::Dealership(other));
}

#[tokio::test]
async fn test_malformed_filter_is_a_validation_error() {
    let admin = common::user(UserRole::Admin);
    let result = resolve_scope(&db_with(None), &admin, Some("not-a-uuid")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}
