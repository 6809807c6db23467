#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use car_marketplace::config::{Config, StorageConfig, VisionConfig};
use car_marketplace::entities::car::{self, CarStatus};
use car_marketplace::entities::dealership;
use car_marketplace::entities::test_drive::{self, BookingStatus};
use car_marketplace::entities::user::{self, UserRole};
use car_marketplace::services::media::{storage_path_from_url, DataUrlImage, ObjectStorage};
use car_marketplace::services::vision::VisionModel;
use car_marketplace::utils::jwt::{create_token, SessionClaims};
use car_marketplace::{AppResult, AppState};

pub const SECRET: &str = "test-session-secret";
pub const BUCKET: &str = "car-listing-image";

pub fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

pub fn config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        session_secret: SECRET.to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 3000,
        storage: StorageConfig {
            base_url: "https://storage.test".to_string(),
            service_key: "service-key".to_string(),
            bucket: BUCKET.to_string(),
        },
        vision: VisionConfig {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
        },
        admin_email: None,
    }
}

/// Records uploads and removals instead of talking to a storage service
#[derive(Default)]
pub struct FakeStorage {
    pub uploaded: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> AppResult<String> {
        self.uploaded.lock().unwrap().push(path.to_string());
        Ok(format!(
            "https://storage.test/storage/v1/object/public/{}/{}",
            BUCKET, path
        ))
    }

    async fn remove(&self, paths: &[String]) -> AppResult<()> {
        self.removed.lock().unwrap().extend(paths.iter().cloned());
        Ok(())
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        storage_path_from_url(url, BUCKET)
    }
}

/// Answers every prompt with a fixed text
pub struct FakeVision(pub &'static str);

#[async_trait]
impl VisionModel for FakeVision {
    async fn describe(&self, _image: &DataUrlImage, _prompt: &str) -> AppResult<String> {
        Ok(self.0.to_string())
    }
}

pub fn state(db: DatabaseConnection) -> AppState {
    state_with(db, Arc::new(FakeStorage::default()), FakeVision("{}"))
}

pub fn state_with(db: DatabaseConnection, storage: Arc<FakeStorage>, vision: FakeVision) -> AppState {
    AppState {
        db,
        config: config(),
        storage,
        vision: Arc::new(vision),
    }
}

pub fn user(role: UserRole) -> user::Model {
    let id = Uuid::new_v4();
    user::Model {
        id,
        external_auth_id: format!("ext_{}", id.simple()),
        email: format!("{}@example.com", id.simple()),
        name: "Test User".to_string(),
        image_url: None,
        role,
        created_at: now(),
        updated_at: now(),
    }
}

pub fn dealership_for(owner: &user::Model) -> dealership::Model {
    dealership::Model {
        id: Uuid::new_v4(),
        user_id: owner.id,
        name: "Test Motors".to_string(),
        address: "1 Main St".to_string(),
        phone: "555-0100".to_string(),
        email: "sales@testmotors.com".to_string(),
        created_at: now(),
        updated_at: now(),
    }
}

pub fn token_for(user: &user::Model) -> String {
    let claims = SessionClaims::new(&user.external_auth_id, &user.email, Some(&user.name), Duration::hours(1));
    create_token(&claims, SECRET).unwrap()
}

pub fn car(dealership_id: Uuid, status: CarStatus) -> car::Model {
    car::Model {
        id: Uuid::new_v4(),
        dealership_id,
        make: "Toyota".to_string(),
        model: "Corolla".to_string(),
        year: 2021,
        price: 20_000.0,
        mileage: 15_000,
        color: "White".to_string(),
        fuel_type: "Petrol".to_string(),
        transmission: "Automatic".to_string(),
        body_type: "Sedan".to_string(),
        seats: Some(5),
        description: "Well kept".to_string(),
        status,
        featured: false,
        images: vec![format!(
            "https://storage.test/storage/v1/object/public/{}/cars/old/image-1-0.png",
            BUCKET
        )],
        created_at: now(),
        updated_at: now(),
    }
}

pub fn booking(car_id: Uuid, user_id: Uuid, status: BookingStatus) -> test_drive::Model {
    test_drive::Model {
        id: Uuid::new_v4(),
        car_id,
        user_id,
        booking_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        start_time: "09:00".to_string(),
        end_time: "09:30".to_string(),
        status,
        notes: None,
        created_at: now(),
        updated_at: now(),
    }
}
