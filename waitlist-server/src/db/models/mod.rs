//! Database Models

pub mod restaurant;

// Re-exports
pub use restaurant::{DEFAULT_TOLERANCE_MINUTES, Restaurant, RestaurantCreate, RestaurantUpdate};
