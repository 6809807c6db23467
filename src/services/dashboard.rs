use std::collections::HashSet;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::car::{self, CarStatus};
use crate::entities::test_drive::{self, BookingStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::dealership;
use crate::error::AppResult;
use crate::services::scope::Scope;
use crate::utils::finance::round2;

#[derive(Debug, Clone, Copy)]
pub struct CarSnapshot {
    pub id: Uuid,
    pub status: CarStatus,
    pub featured: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct BookingSnapshot {
    pub car_id: Uuid,
    pub status: BookingStatus,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CarStats {
    pub total: u64,
    pub available: u64,
    pub unavailable: u64,
    pub sold: u64,
    pub featured: u64,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct TestDriveStats {
    pub total: u64,
    pub pending: u64,
    pub confirmed: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub no_show: u64,
    /// Percent of completed test drives whose car is now sold
    pub conversion_rate: f64,
}

pub fn car_stats(cars: &[CarSnapshot]) -> CarStats {
    let mut stats = CarStats::default();

    for car in cars {
        stats.total += 1;
        match car.status {
            CarStatus::Available => stats.available += 1,
            CarStatus::Unavailable => stats.unavailable += 1,
            CarStatus::Sold => stats.sold += 1,
        }
        if car.featured {
            stats.featured += 1;
        }
    }

    stats
}

/// Booking counts per status plus the conversion rate.
///
/// A sale is attributed to test drives when the sold car has at least one
/// COMPLETED booking; each sold car counts once.
pub fn test_drive_stats(cars: &[CarSnapshot], bookings: &[BookingSnapshot]) -> TestDriveStats {
    let mut stats = TestDriveStats::default();
    let mut completed_car_ids = HashSet::new();

    for booking in bookings {
        stats.total += 1;
        match booking.status {
            BookingStatus::Pending => stats.pending += 1,
            BookingStatus::Confirmed => stats.confirmed += 1,
            BookingStatus::Completed => {
                stats.completed += 1;
                completed_car_ids.insert(booking.car_id);
            }
            BookingStatus::Cancelled => stats.cancelled += 1,
            BookingStatus::NoShow => stats.no_show += 1,
        }
    }

    let sold_after_test_drive = cars
        .iter()
        .filter(|c| c.status == CarStatus::Sold && completed_car_ids.contains(&c.id))
        .count();

    stats.conversion_rate = if stats.completed > 0 {
        round2(sold_after_test_drive as f64 / stats.completed as f64 * 100.0)
    } else {
        0.0
    };

    stats
}

#[derive(Debug, Clone, Serialize)]
pub struct DealershipOwner {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct DealershipSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub owner: Option<DealershipOwner>,
}

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub cars: CarStats,
    pub test_drives: TestDriveStats,
    /// Every dealership, for the admin scope picker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealerships: Option<Vec<DealershipSummary>>,
    pub current_dealership: Option<DealershipSummary>,
}

pub async fn dashboard_data(
    db: &DatabaseConnection,
    user: &user::Model,
    scope: Scope,
) -> AppResult<DashboardData> {
    let cars: Vec<CarSnapshot> = car::Entity::find()
        .select_only()
        .columns([car::Column::Id, car::Column::Status, car::Column::Featured])
        .filter(scope.car_condition())
        .into_tuple::<(Uuid, CarStatus, bool)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(id, status, featured)| CarSnapshot { id, status, featured })
        .collect();

    let mut bookings_query = test_drive::Entity::find()
        .select_only()
        .columns([test_drive::Column::CarId, test_drive::Column::Status]);
    if scope != Scope::All {
        bookings_query = bookings_query.filter(test_drive::Column::CarId.in_subquery(scope.car_ids_query()));
    }

    let bookings: Vec<BookingSnapshot> = bookings_query
        .into_tuple::<(Uuid, BookingStatus)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(car_id, status)| BookingSnapshot { car_id, status })
        .collect();

    let all_dealerships: Vec<DealershipSummary> = dealership::Entity::find()
        .find_also_related(user::Entity)
        .order_by_asc(dealership::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|(d, owner)| DealershipSummary {
            id: d.id,
            name: d.name,
            email: d.email,
            owner: owner.map(|u| DealershipOwner {
                id: u.id,
                name: u.name,
                role: u.role,
            }),
        })
        .collect();

    let current_dealership = all_dealerships
        .iter()
        .find(|d| d.owner.as_ref().is_some_and(|o| o.id == user.id))
        .cloned();
    let dealerships = (user.role == UserRole::Admin).then_some(all_dealerships);

    Ok(DashboardData {
        cars: car_stats(&cars),
        test_drives: test_drive_stats(&cars, &bookings),
        dealerships,
        current_dealership,
    })
}
