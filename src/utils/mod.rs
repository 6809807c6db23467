pub mod finance;
pub mod jwt;
