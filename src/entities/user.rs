use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "dealership")]
    Dealership,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserRole {
    /// Roles allowed into the dealership/admin dashboard
    pub const STAFF: &'static [UserRole] = &[UserRole::Dealership, UserRole::Admin];
    pub const ADMIN_ONLY: &'static [UserRole] = &[UserRole::Admin];
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub external_auth_id: String,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub image_url: Option<String>,
    pub role: UserRole,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::dealership::Entity")]
    Dealership,
    #[sea_orm(has_many = "super::test_drive::Entity")]
    TestDrives,
    #[sea_orm(has_many = "super::saved_car::Entity")]
    SavedCars,
}

impl Related<super::dealership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dealership.def()
    }
}

impl Related<super::test_drive::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestDrives.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
