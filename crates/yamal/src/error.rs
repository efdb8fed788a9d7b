//! Errors surfaced by the data source.

use crate::api::ApiError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Rate limited by upstream")]
    RateLimited { retry_after_seconds: Option<u64> },

    #[error("Anime {id} not found")]
    NotFound { id: u64 },

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Unexpected error: {message}")]
    Unknown { message: String },
}

pub type Result<T> = std::result::Result<T, DataSourceError>;

impl DataSourceError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            cause: None,
        }
    }

    /// Map a client-boundary failure; `id` names the resource the call was about
    pub fn from_api(err: ApiError, id: Option<u64>) -> Self {
        match err {
            ApiError::Transport(e) => Self::Network {
                message: e.to_string(),
                cause: Some(Box::new(e)),
            },
            ApiError::Timeout => Self::network("Request timed out"),
            ApiError::Decode { message } => Self::network(message),
            ApiError::Status {
                status,
                retry_after_seconds,
                body,
            } => match (StatusCode::from_u16(status), id) {
                (Ok(StatusCode::UNAUTHORIZED), _) => Self::Unauthorized,
                (Ok(StatusCode::NOT_FOUND), Some(id)) => Self::NotFound { id },
                (Ok(StatusCode::TOO_MANY_REQUESTS), _) => Self::RateLimited {
                    retry_after_seconds,
                },
                _ => Self::Unknown {
                    message: format!("HTTP {}: {}", status, body),
                },
            },
        }
    }

    /// Whether retrying the same request later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::RateLimited { .. })
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Self::RateLimited {
                retry_after_seconds: Some(seconds),
            } => format!("Too many requests. Try again in {} seconds.", seconds),
            Self::RateLimited { .. } => "Too many requests. Try again shortly.".to_string(),
            Self::NotFound { id } => format!("Anime #{} could not be found.", id),
            Self::Unauthorized => "Please log in to continue.".to_string(),
            Self::Unknown { message } => format!("Something went wrong: {}", message),
        }
    }
}

impl From<ApiError> for DataSourceError {
    fn from(err: ApiError) -> Self {
        Self::from_api(err, None)
    }
}
