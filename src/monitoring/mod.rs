//! Runtime monitoring

pub mod health;

pub use health::{ComponentHealth, HealthMonitor, HealthStatus, Status};
