pub mod schema;

pub use schema::{Config, DeliveryConfig, ObservabilityConfig, StorageConfig};
