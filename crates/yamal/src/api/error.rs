//! Errors raised at the HTTP client boundary.

use reqwest::StatusCode;

/// Failure of a single upstream call, before it is mapped into a
/// [`DataSourceError`](crate::error::DataSourceError).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to parse response: {message}")]
    Decode { message: String },

    #[error("Request failed with status {status}: {body}")]
    Status {
        status: u16,
        retry_after_seconds: Option<u64>,
        body: String,
    },
}

impl ApiError {
    /// HTTP status code, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(StatusCode::TOO_MANY_REQUESTS.as_u16())
    }

    /// Server-requested back-off from a Retry-After header
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::Status {
                retry_after_seconds,
                ..
            } => *retry_after_seconds,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        let err = ApiError::Status {
            status: 429,
            retry_after_seconds: Some(3),
            body: String::new(),
        };
        assert!(err.is_rate_limited());
        assert!(!err.is_not_found());
        assert_eq!(err.retry_after_seconds(), Some(3));

        assert_eq!(ApiError::Timeout.status_code(), None);
        assert_eq!(ApiError::Timeout.retry_after_seconds(), None);
    }

    #[test]
    fn test_json_error_is_decode() {
        let err: ApiError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
