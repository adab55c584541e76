//! HTTP API handlers

pub mod error;
pub mod health;
pub mod inventory;
pub mod upload;

pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use inventory::{initiate_inventory, inventory_status};
pub use upload::upload_archive;
