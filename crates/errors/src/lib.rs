use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("event store error: {0}")]
    Store(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ListenerResult<T> = Result<T, ListenerError>;

impl ListenerError {
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedResponse(msg.into())
    }
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    /// Only configuration problems are fatal; everything else is retried on
    /// the next poll tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ListenerError::Configuration(_))
    }
    pub fn is_transient(&self) -> bool {
        !self.is_fatal()
    }
    pub fn is_timeout(&self) -> bool {
        matches!(self, ListenerError::Timeout(_))
    }
}

impl From<serde_json::Error> for ListenerError {
    fn from(err: serde_json::Error) -> Self {
        ListenerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ListenerError {
    fn from(err: anyhow::Error) -> Self {
        ListenerError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for ListenerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ListenerError::Timeout(err.to_string())
        } else if err.is_decode() {
            ListenerError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            ListenerError::HttpStatus {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ListenerError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests;
