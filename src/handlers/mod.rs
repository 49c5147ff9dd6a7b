pub mod deployment;
mod health;
mod pages;

pub use deployment::edge_deployment;
pub use health::health_check;
pub use pages::{INDEX_HTML, index, not_found, submit};
