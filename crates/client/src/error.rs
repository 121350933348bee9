use {
    bytes::Bytes,
    reqwest::{StatusCode, header::HeaderMap},
};

/// Failure of a single API call, as produced by the transport.
///
/// The request pipeline hands these back to callers untouched when it cannot
/// recover, so status, headers and body stay available for inspection.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed with status {status}")]
    Status {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Whether this is the distinguished "credential missing, expired or invalid" status.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// Response body of a status failure, lossily decoded.
    pub fn body_text(&self) -> Option<String> {
        match self {
            Self::Status { body, .. } => Some(String::from_utf8_lossy(body).into_owned()),
            _ => None,
        }
    }
}
