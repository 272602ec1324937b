use thiserror::Error;

/// Failure of a single request against the workspace service
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success response; `body` is the service's error document verbatim
    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("Network error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Remote error body when the service answered with one
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}
