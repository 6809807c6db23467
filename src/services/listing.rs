use std::collections::{BTreeSet, HashSet};

use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::car::{self, CarStatus};
use crate::entities::test_drive::{self, BookingStatus};
use crate::entities::{dealership, saved_car, user, working_hour};
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u64 = 6;
pub const MAX_PAGE_SIZE: u64 = 50;
/// Highest page whose row offset still fits a Postgres `bigint`
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;
pub const DEFAULT_FEATURED_LIMIT: u64 = 3;
const DEFAULT_MAX_PRICE: f64 = 100_000.0;

/// `%needle%` with LIKE wildcards in the needle matched literally
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match on a column
pub fn ci_contains<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((column.entity_name(), column))))
        .like(LikeExpr::new(like_pattern(needle)).escape('\\'))
}

/// Case-insensitive equality on a column
pub fn ci_eq<C: ColumnTrait>(column: C, value: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((column.entity_name(), column)))).eq(value.trim().to_lowercase())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub make: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(default)]
    pub sort: SortBy,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ListingQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// WHERE clause for the public listing: available cars only
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all().add(car::Column::Status.eq(CarStatus::Available));

        if let Some(search) = non_empty(&self.search) {
            condition = condition.add(
                Condition::any()
                    .add(ci_contains(car::Column::Make, search))
                    .add(ci_contains(car::Column::Model, search))
                    .add(ci_contains(car::Column::Description, search)),
            );
        }

        for (column, value) in [
            (car::Column::Make, &self.make),
            (car::Column::BodyType, &self.body_type),
            (car::Column::FuelType, &self.fuel_type),
            (car::Column::Transmission, &self.transmission),
        ] {
            if let Some(value) = non_empty(value) {
                condition = condition.add(ci_eq(column, value));
            }
        }

        condition = condition.add(car::Column::Price.gte(self.min_price.unwrap_or(0.0).max(0.0)));
        if let Some(max) = self.max_price {
            condition = condition.add(car::Column::Price.lte(max));
        }

        condition
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        Self {
            total,
            page,
            limit,
            pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CarListing {
    #[serde(flatten)]
    pub car: car::Model,
    pub wishlisted: bool,
}

#[derive(Debug, Serialize)]
pub struct CarPage {
    pub data: Vec<CarListing>,
    pub pagination: Pagination,
}

pub async fn wishlist_ids(db: &DatabaseConnection, viewer: Option<&user::Model>) -> AppResult<HashSet<Uuid>> {
    let Some(viewer) = viewer else {
        return Ok(HashSet::new());
    };

    let ids: Vec<Uuid> = saved_car::Entity::find()
        .select_only()
        .column(saved_car::Column::CarId)
        .filter(saved_car::Column::UserId.eq(viewer.id))
        .into_tuple()
        .all(db)
        .await?;

    Ok(ids.into_iter().collect())
}

fn with_wishlist(cars: Vec<car::Model>, wishlist: &HashSet<Uuid>) -> Vec<CarListing> {
    cars.into_iter()
        .map(|car| CarListing {
            wishlisted: wishlist.contains(&car.id),
            car,
        })
        .collect()
}

/// Search available cars with filters, sorting and pagination
pub async fn list_cars(
    db: &DatabaseConnection,
    viewer: Option<&user::Model>,
    query: &ListingQuery,
) -> AppResult<CarPage> {
    let page = query.page();
    let limit = query.limit();

    let mut select = car::Entity::find().filter(query.condition());
    select = match query.sort {
        SortBy::Newest => select.order_by_desc(car::Column::CreatedAt),
        SortBy::PriceAsc => select.order_by_asc(car::Column::Price),
        SortBy::PriceDesc => select.order_by_desc(car::Column::Price),
    };

    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await?;
    let cars = paginator.fetch_page(page - 1).await?;

    let wishlist = wishlist_ids(db, viewer).await?;

    Ok(CarPage {
        data: with_wishlist(cars, &wishlist),
        pagination: Pagination::new(total, page, limit),
    })
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CarFilters {
    pub makes: Vec<String>,
    pub body_types: Vec<String>,
    pub fuel_types: Vec<String>,
    pub transmissions: Vec<String>,
    pub price_range: PriceRange,
}

impl CarFilters {
    /// Distinct sorted facet values from (make, body type, fuel type, transmission) rows
    pub fn from_rows(rows: Vec<(String, String, String, String)>, price: (Option<f64>, Option<f64>)) -> Self {
        let mut makes = BTreeSet::new();
        let mut body_types = BTreeSet::new();
        let mut fuel_types = BTreeSet::new();
        let mut transmissions = BTreeSet::new();

        for (make, body_type, fuel_type, transmission) in rows {
            makes.insert(make);
            body_types.insert(body_type);
            fuel_types.insert(fuel_type);
            transmissions.insert(transmission);
        }

        Self {
            makes: makes.into_iter().collect(),
            body_types: body_types.into_iter().collect(),
            fuel_types: fuel_types.into_iter().collect(),
            transmissions: transmissions.into_iter().collect(),
            price_range: PriceRange {
                min: price.0.unwrap_or(0.0),
                max: price.1.unwrap_or(DEFAULT_MAX_PRICE),
            },
        }
    }
}

/// Facet values for the listing filter controls
pub async fn car_filters(db: &DatabaseConnection) -> AppResult<CarFilters> {
    let rows: Vec<(String, String, String, String)> = car::Entity::find()
        .select_only()
        .columns([
            car::Column::Make,
            car::Column::BodyType,
            car::Column::FuelType,
            car::Column::Transmission,
        ])
        .filter(car::Column::Status.eq(CarStatus::Available))
        .into_tuple()
        .all(db)
        .await?;

    let price: Option<(Option<f64>, Option<f64>)> = car::Entity::find()
        .select_only()
        .column_as(car::Column::Price.min(), "min_price")
        .column_as(car::Column::Price.max(), "max_price")
        .filter(car::Column::Status.eq(CarStatus::Available))
        .into_tuple()
        .one(db)
        .await?;

    Ok(CarFilters::from_rows(rows, price.unwrap_or((None, None))))
}

pub async fn featured_cars(
    db: &DatabaseConnection,
    viewer: Option<&user::Model>,
    limit: u64,
) -> AppResult<Vec<CarListing>> {
    let cars = car::Entity::find()
        .filter(car::Column::Featured.eq(true))
        .filter(car::Column::Status.eq(CarStatus::Available))
        .order_by_desc(car::Column::CreatedAt)
        .limit(limit.clamp(1, MAX_PAGE_SIZE))
        .all(db)
        .await?;

    let wishlist = wishlist_ids(db, viewer).await?;
    Ok(with_wishlist(cars, &wishlist))
}

#[derive(Debug, Serialize)]
pub struct UserTestDrive {
    pub id: Uuid,
    pub status: BookingStatus,
    pub booking_date: chrono::NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct DealershipWithHours {
    #[serde(flatten)]
    pub dealership: dealership::Model,
    pub working_hours: Vec<working_hour::Model>,
}

#[derive(Debug, Serialize)]
pub struct TestDriveInfo {
    pub user_test_drive: Option<UserTestDrive>,
    pub existing_bookings: Vec<test_drive::Model>,
    pub dealership: Option<DealershipWithHours>,
}

#[derive(Debug, Serialize)]
pub struct CarDetails {
    #[serde(flatten)]
    pub listing: CarListing,
    pub test_drive_info: TestDriveInfo,
}

pub async fn dealership_with_hours(
    db: &DatabaseConnection,
    dealership: dealership::Model,
) -> AppResult<DealershipWithHours> {
    let working_hours = working_hour::Entity::find()
        .filter(working_hour::Column::DealershipId.eq(dealership.id))
        .order_by_asc(working_hour::Column::DayOfWeek)
        .all(db)
        .await?;

    Ok(DealershipWithHours {
        dealership,
        working_hours,
    })
}

/// A car with the viewer's wishlist/booking state and the dealership's hours
pub async fn car_details(
    db: &DatabaseConnection,
    viewer: Option<&user::Model>,
    car_id: Uuid,
) -> AppResult<CarDetails> {
    let car = car::Entity::find_by_id(car_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    let mut wishlisted = false;
    let mut user_test_drive = None;
    let mut existing_bookings = Vec::new();

    if let Some(viewer) = viewer {
        wishlisted = saved_car::Entity::find_by_id((viewer.id, car.id))
            .one(db)
            .await?
            .is_some();

        user_test_drive = test_drive::Entity::find()
            .filter(test_drive::Column::UserId.eq(viewer.id))
            .filter(test_drive::Column::CarId.eq(car.id))
            .filter(test_drive::Column::Status.is_in([
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::Completed,
            ]))
            .order_by_desc(test_drive::Column::CreatedAt)
            .one(db)
            .await?
            .map(|b| UserTestDrive {
                id: b.id,
                status: b.status,
                booking_date: b.booking_date,
            });

        existing_bookings = test_drive::Entity::find()
            .filter(test_drive::Column::CarId.eq(car.id))
            .filter(test_drive::Column::Status.is_in(BookingStatus::ACTIVE))
            .order_by_desc(test_drive::Column::CreatedAt)
            .all(db)
            .await?;
    }

    let dealership = match dealership::Entity::find_by_id(car.dealership_id).one(db).await? {
        Some(d) => Some(dealership_with_hours(db, d).await?),
        None => None,
    };

    Ok(CarDetails {
        listing: CarListing { car, wishlisted },
        test_drive_info: TestDriveInfo {
            user_test_drive,
            existing_bookings,
            dealership,
        },
    })
}
