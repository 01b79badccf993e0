use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request payload failed a business rule; the message is shown to the client.
    #[error("{0}")]
    Validation(String),

    /// OpenAI call failed (transport, status or missing content).
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Upstream(format!("request timed out: {}", err))
        } else {
            Self::Upstream(err.to_string())
        }
    }
}

impl From<prometheus::Error> for ServiceError {
    fn from(err: prometheus::Error) -> Self {
        Self::Internal(format!("metrics: {}", err))
    }
}

impl warp::reject::Reject for ServiceError {}
