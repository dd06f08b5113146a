use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised before a request ever leaves the client
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid authentication method \"{0}\". Possible values are \"basic\" and \"cookie\"")]
    AuthenticationMethod(String),

    #[error("Database name \"{0}\" does not comply with the CouchDB requirements")]
    NameCompliance(String),

    #[error("Proxy \"{0}\" has an invalid scheme")]
    ProxySchemeCompliance(String),

    #[error("User ID \"{0}\" does not comply with the CouchDB requirements")]
    UserIdCompliance(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Error payload returned by the server, e.g. `{"error":"not_found","reason":"missing"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub reason: String,
}

impl ErrorBody {
    /// Parse a response body, keeping non-JSON bodies verbatim as the reason
    pub fn from_text(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| Self {
            error: String::new(),
            reason: text.trim().to_string(),
        })
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.error.is_empty(), self.reason.is_empty()) {
            (true, _) => write!(f, "{}", self.reason),
            (false, true) => write!(f, "{}", self.error),
            (false, false) => write!(f, "{}: {}", self.error, self.reason),
        }
    }
}
