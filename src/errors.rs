use reqwest::StatusCode;
use thiserror::Error;

/// Fishlog Errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FishlogError {
    /// The API base provided is not an absolute http(s) URL.
    #[error("Invalid API base. Must be an absolute http(s) URL.")]
    InvalidApiBase,
    /// The user ID provided is zero.
    #[error("Invalid user ID. Must be greater than zero.")]
    InvalidUserId,

    /// Failed to send a request to the Fishlog API.
    #[error("Failed to send a request to the Fishlog API.")]
    RequestFailed,

    /// Failed to decode Fishlog API response.
    #[error("Failed to decode Fishlog API response.")]
    FailedToDecode,

    /// The Fishlog API returned a 400: Bad Request status code.
    /// This means that the body or parameters passed to the endpoint were not correct.
    #[error("Bad request.")]
    BadRequest,
    /// The Fishlog API returned a 404: Not Found status code.
    /// Returned for unknown users, and for unliking a catch that was never liked.
    #[error("Resource not found.")]
    NotFound,
    /// The Fishlog API returned a 401: Unauthorized status code.
    #[error("Not authorized.")]
    Unauthorized,
    /// The Fishlog API returned a 429: Too Many Requests status code.
    #[error("You are being rate limited.")]
    RateLimited,
    /// The Fishlog API returned a 503: Service Unavailable status code.
    #[error("The service is unavailable.")]
    ServiceUnavailable,
    /// The Fishlog API returned a server error.
    /// This is a catch-all for unusual error cases.
    #[error("Server error ({0}).")]
    ServerError(u16),
}

impl FishlogError {
    /// Maps a non-success HTTP status to its error variant.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => FishlogError::BadRequest,
            StatusCode::NOT_FOUND => FishlogError::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FishlogError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => FishlogError::RateLimited,
            StatusCode::SERVICE_UNAVAILABLE => FishlogError::ServiceUnavailable,
            other => FishlogError::ServerError(other.as_u16()),
        }
    }
}
