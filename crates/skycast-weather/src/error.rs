//! Weather error taxonomy and failure classification.
//!
//! Provider calls fail with a [`ProviderError`] describing *how* the call
//! broke. [`classify`] folds that into the three-way [`WeatherError`] that
//! consumers see on a result stream.

use thiserror::Error;

/// Raw failure from a [`RemoteClient`](crate::provider::RemoteClient) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request could not be built: {0}")]
    Request(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown status").to_string(),
            }
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else if e.is_body() || e.is_request() {
            // Connection dropped while sending or reading
            ProviderError::Connection(e.to_string())
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

/// Tag of a [`WeatherError`], for consumers that only branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Server,
    Unknown,
}

/// Failure reported to consumers of weather data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// Transport or connectivity failure, usually transient.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The provider answered with a non-success status.
    #[error("Server error {code}: {message}")]
    Server { code: u16, message: String },

    /// Anything else, including malformed responses.
    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl WeatherError {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Message produced at classification time, unmodified.
    pub fn message(&self) -> &str {
        match self {
            Self::Network { message } | Self::Server { message, .. } | Self::Unknown { message } => {
                message
            }
        }
    }

    /// HTTP status for server errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network { .. } => "Unable to connect. Check your internet connection.",
            Self::Server { code: 401, .. } => "Weather API key is invalid. Check settings.",
            Self::Server { code: 429, .. } => "Too many weather requests. Please wait a moment.",
            Self::Server { code, .. } if *code >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            Self::Server { .. } => "The weather request failed. Please try again.",
            Self::Unknown { .. } => "Something went wrong. Please try again.",
        }
    }

    /// Whether a consumer-initiated retry has a reasonable chance of succeeding.
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Server { code, .. } => *code >= 500 || *code == 429,
            Self::Unknown { .. } => false,
        }
    }
}

/// Map a raw provider failure onto the consumer-facing taxonomy.
///
/// Only the variant is inspected, never the message text.
pub fn classify(error: &ProviderError) -> WeatherError {
    match error {
        ProviderError::Connection(_) | ProviderError::Timeout => WeatherError::Network {
            message: error.to_string(),
        },
        ProviderError::Status { status, message } => WeatherError::Server {
            code: *status,
            message: message.clone(),
        },
        ProviderError::InvalidResponse(_) | ProviderError::Request(_) => WeatherError::Unknown {
            message: error.to_string(),
        },
    }
}

impl From<ProviderError> for WeatherError {
    fn from(e: ProviderError) -> Self {
        classify(&e)
    }
}
