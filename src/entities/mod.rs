pub mod car;
pub mod dealership;
pub mod saved_car;
pub mod test_drive;
pub mod user;
pub mod working_hour;
