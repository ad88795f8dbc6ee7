use std::time::Duration;

/// Failure reaching a remote source. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GET {url} timed out after {}s", timeout.as_secs_f32())]
    Timeout { url: String, timeout: Duration },

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    pub fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_owned(),
                timeout,
            }
        } else {
            Self::Transport {
                url: url.to_owned(),
                source: err,
            }
        }
    }
}

/// Failure of the text-generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("{engine} request failed: {message}")]
    Request {
        engine: &'static str,
        message: String,
    },

    #[error("{engine} API error ({status}): {message}")]
    Api {
        engine: &'static str,
        status: u16,
        message: String,
    },

    #[error("{engine} output text is empty")]
    EmptyOutput { engine: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum RecapError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("nothing to recap yet: {0}")]
    EmptyWindow(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Generation(#[from] GenerateError),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Coarse failure class used by callers to pick a client-visible status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidTarget,
    EmptyWindow,
    Upstream,
    Internal,
}

impl RecapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTarget(_) => ErrorKind::InvalidTarget,
            Self::EmptyWindow(_) => ErrorKind::EmptyWindow,
            Self::Fetch(_) | Self::Generation(_) => ErrorKind::Upstream,
            Self::Parse(_) | Self::NotConfigured(_) => ErrorKind::Internal,
        }
    }
}
