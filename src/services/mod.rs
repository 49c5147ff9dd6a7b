mod deployment;

pub use deployment::{
    API_TOKEN_HEADER, API_USER_HEADER, DeploymentOrchestrator, PLATFORM_KEY_HEADER,
};
