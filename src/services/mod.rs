pub mod booking;
pub mod dashboard;
pub mod inventory;
pub mod listing;
pub mod media;
pub mod scope;
pub mod session;
pub mod settings;
pub mod users;
pub mod vision;
pub mod wishlist;
