use thiserror::Error;

/// Client-facing error taxonomy shared by every marketplace operation.
///
/// Admission failures map to `Unauthenticated`/`Forbidden`, input validation
/// is caught before any remote call, and transport or service failures
/// surface as `RemoteFailure` so views can fall back to an empty state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote service failure: {0}")]
    RemoteFailure(String),
    #[error("order already delivered")]
    AlreadyTerminal,
}

impl MarketError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        MarketError::Forbidden(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        MarketError::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        MarketError::NotFound(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        MarketError::RemoteFailure(message.into())
    }
}
