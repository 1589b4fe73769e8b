pub mod api;
pub mod datetime;
pub mod models;

pub use models::*;
