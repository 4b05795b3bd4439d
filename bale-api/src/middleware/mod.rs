pub mod auth;
pub mod rate_limit;

pub use auth::{require_identity, Claims, Identity};
pub use rate_limit::rate_limit_middleware;
