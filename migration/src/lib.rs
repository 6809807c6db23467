pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_dealerships;
mod m20250301_000003_create_cars;
mod m20250301_000004_create_test_drive_bookings;
mod m20250301_000005_create_saved_cars;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_dealerships::Migration),
            Box::new(m20250301_000003_create_cars::Migration),
            Box::new(m20250301_000004_create_test_drive_bookings::Migration),
            Box::new(m20250301_000005_create_saved_cars::Migration),
        ]
    }
}
