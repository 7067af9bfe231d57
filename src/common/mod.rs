//! Common utilities and types shared across the application.

pub mod error;
pub mod types;

// Re-export the types most modules touch
pub use types::{uuid_from_bytes, GatewayId, SubscribeEvent};
