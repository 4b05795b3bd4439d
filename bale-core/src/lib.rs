pub mod models;
pub mod repository;
pub mod payment;

pub use models::*;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Repository error: {0}")]
    RepositoryError(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn repository(err: impl std::fmt::Display) -> Self {
        CoreError::RepositoryError(err.to_string())
    }
}
