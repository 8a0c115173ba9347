//! Error types for boleto operations

use thiserror::Error;

/// Result type for boleto operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boleto adapter errors
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was not set before the operation
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field was set but its value cannot be encoded for the target bank
    #[error("Invalid field {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Payload encoding failed (unsupported variant, width overflow)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Bank accepted the request syntactically but rejected it on
    /// business grounds. `code` carries the bank's own code, a resolved
    /// canonical code, or a checksum of the message when nothing matched.
    #[error("Bank rejected request [{code}]: {message}")]
    BusinessRule {
        /// Stable code callers can branch on
        code: String,
        /// Bank-provided message
        message: String,
        /// HTTP status of the rejection
        http_status: u16,
    },

    /// Token request failed or returned non-2xx; never retried automatically
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-2xx response without a structured bank error body
    #[error("Bank API error {status_code}: {message}")]
    BankApi {
        /// HTTP status code
        status_code: u16,
        /// Raw response body
        message: String,
    },

    /// Operation not offered by this bank's integration
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    /// Certificate material error
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML error
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a business-rule rejection from a numeric code
    pub fn business_rule(code: impl ToString, message: impl Into<String>, http_status: u16) -> Self {
        Error::BusinessRule {
            code: code.to_string(),
            message: message.into(),
            http_status,
        }
    }
}
