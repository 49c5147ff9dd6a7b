mod api;
mod deployment;

pub use api::HealthResponse;
pub use deployment::{AggregatedResult, CallResult, DeploymentRequest};
