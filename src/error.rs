use thiserror::Error;

/// Why a tracker could not be reached or answered with something other than 200
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Tracker answered with a non-200 HTTP status
    #[error("HTTP status {0}")]
    Status(u16),
    /// Request timed out
    #[error("request timed out")]
    Timeout,
    /// Connection, TLS or body read error
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum AnnounceError {
    #[error("Invalid announce URL: {0}")]
    InvalidAnnounceUrl(String),

    #[error("Tracker fetch failed: {0}")]
    FetchFailed(#[from] FetchFailure),

    #[error("Malformed bencode: {0}")]
    MalformedEncoding(String),

    #[error("Schema mismatch for key '{key}': expected {expected}")]
    SchemaMismatch { key: String, expected: &'static str },

    #[error("Compact peer list length {0} is not a multiple of 6")]
    InvalidPeerBlobLength(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AnnounceError {
    pub(crate) fn schema(key: &[u8], expected: &'static str) -> Self {
        AnnounceError::SchemaMismatch {
            key: String::from_utf8_lossy(key).into_owned(),
            expected,
        }
    }
}

impl From<url::ParseError> for AnnounceError {
    fn from(err: url::ParseError) -> Self {
        AnnounceError::InvalidAnnounceUrl(err.to_string())
    }
}

impl From<reqwest::Error> for AnnounceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::Timeout.into()
        } else {
            FetchFailure::Transport(err.to_string()).into()
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnounceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_fetch_failure_is_reported_as_source() {
        let err: AnnounceError = FetchFailure::Status(503).into();
        assert_eq!(err.to_string(), "Tracker fetch failed: HTTP status 503");
        assert_eq!(
            err.source().map(|cause| cause.to_string()),
            Some("HTTP status 503".to_string())
        );

        let err: AnnounceError = FetchFailure::Timeout.into();
        assert!(matches!(err, AnnounceError::FetchFailed(FetchFailure::Timeout)));
    }
}
