use thiserror::Error;

/// Failures surfaced by backend calls. No variant is retried by the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No session token; the request was never sent
    #[error("Not authenticated: no session token available")]
    Unauthenticated,

    #[error("Request failed: {status} - {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, GatewayError::Unauthenticated)
    }

    /// HTTP status for `RequestFailed`, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}
