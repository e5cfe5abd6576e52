use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    NetworkError(String),
    Status(u16),
    ParseError(String),
    QuotaExceeded,
    InvalidCredential,
    NotFound(String),
    ProcessError(String),
}

impl ProviderError {
    /// Whether this error means the credential used is unusable for the rest of the run.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, ProviderError::QuotaExceeded | ProviderError::InvalidCredential)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ProviderError::Status(code) => write!(f, "Unexpected HTTP status {}", code),
            ProviderError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ProviderError::QuotaExceeded => write!(f, "Quota exceeded"),
            ProviderError::InvalidCredential => write!(f, "Invalid credential"),
            ProviderError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ProviderError::ProcessError(msg) => write!(f, "Process error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProviderError::Status(status.as_u16()),
            None => ProviderError::NetworkError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::ProcessError(err.to_string())
    }
}
