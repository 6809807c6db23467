pub mod admin;
pub mod cars;
pub mod session;
pub mod settings;
pub mod test_drives;
