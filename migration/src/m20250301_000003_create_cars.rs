use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000002_create_dealerships::DealershipInfo;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(CarStatus::Enum)
                    .values([CarStatus::Available, CarStatus::Unavailable, CarStatus::Sold])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Car::Table)
                    .if_not_exists()
                    .col(uuid(Car::Id).primary_key())
                    .col(uuid(Car::DealershipId).not_null())
                    .col(string_len(Car::Make, 100).not_null())
                    .col(string_len(Car::Model, 100).not_null())
                    .col(integer(Car::Year).not_null())
                    .col(double(Car::Price).not_null())
                    .col(integer(Car::Mileage).not_null())
                    .col(string_len(Car::Color, 50).not_null())
                    .col(string_len(Car::FuelType, 50).not_null())
                    .col(string_len(Car::Transmission, 50).not_null())
                    .col(string_len(Car::BodyType, 50).not_null())
                    .col(integer_null(Car::Seats))
                    .col(text(Car::Description).not_null())
                    .col(
                        ColumnDef::new(Car::Status)
                            .custom(CarStatus::Enum)
                            .not_null()
                            .default("available"),
                    )
                    .col(boolean(Car::Featured).not_null().default(false))
                    .col(ColumnDef::new(Car::Images).array(ColumnType::Text).not_null())
                    .col(
                        timestamp_with_time_zone(Car::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Car::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_dealership")
                            .from(Car::Table, Car::DealershipId)
                            .to(DealershipInfo::Table, DealershipInfo::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_car_make", Car::Make),
            ("idx_car_body_type", Car::BodyType),
            ("idx_car_price", Car::Price),
            ("idx_car_status", Car::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Car::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Car::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(CarStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Car {
    Table,
    Id,
    DealershipId,
    Make,
    Model,
    Year,
    Price,
    Mileage,
    Color,
    FuelType,
    Transmission,
    BodyType,
    Seats,
    Description,
    Status,
    Featured,
    Images,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CarStatus {
    #[sea_orm(iden = "car_status")]
    Enum,
    #[sea_orm(iden = "available")]
    Available,
    #[sea_orm(iden = "unavailable")]
    Unavailable,
    #[sea_orm(iden = "sold")]
    Sold,
}
