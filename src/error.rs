//! Typed failures produced by the feed interaction core.
//!
//! Transport and parse failures are never swallowed inside the core; every
//! operation hands one of these back so callers can tell a transient network
//! problem apart from a feed that simply cannot do what was asked.

use std::path::PathBuf;

use thiserror::Error;

use crate::feed::ServiceKind;

/// Failure talking to a feed resource.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The request never produced a usable response (connection failure,
    /// timeout, or a non-success HTTP status).
    #[error("request to {url} failed: {message}")]
    Transport {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// A response arrived but its body could not be parsed.
    #[error("unparsable response from {url} at line {line}, column {column}: {message}")]
    Malformed {
        url: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl FeedError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FeedError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn malformed(url: &str, error: &serde_json::Error) -> Self {
        FeedError::Malformed {
            url: url.to_string(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        }
    }
}

/// Failure resolving a feed's service index.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The index document could not be fetched or read.
    #[error("feed index {index_url} is unreachable")]
    Unreachable {
        index_url: String,
        #[source]
        source: FeedError,
    },

    /// The feed does not advertise a service the operation needs.
    #[error("feed does not advertise a {0} service")]
    MissingService(ServiceKind),

    #[error("discovery cancelled")]
    Cancelled,
}

/// Failure pushing a package artifact.
#[derive(Debug, Error)]
pub enum PushError {
    #[error(transparent)]
    Transport(FeedError),

    #[error("feed rejected the API key (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("{}: {reason}", path.display())]
    PerFileFailure { path: PathBuf, reason: String },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("push cancelled")]
    Cancelled,
}

impl From<FeedError> for PushError {
    fn from(error: FeedError) -> Self {
        match error {
            FeedError::Cancelled => PushError::Cancelled,
            other => PushError::Transport(other),
        }
    }
}

/// Failure deleting (unlisting) a package version.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error(transparent)]
    Transport(FeedError),

    #[error("feed rejected the API key (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("{package_id} {version} was not found on the feed")]
    NotFound { package_id: String, version: String },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("delete cancelled")]
    Cancelled,
}

impl From<FeedError> for DeleteError {
    fn from(error: FeedError) -> Self {
        match error {
            FeedError::Cancelled => DeleteError::Cancelled,
            other => DeleteError::Transport(other),
        }
    }
}

/// A paginated search that stopped early. Whatever was collected before the
/// failing page is handed back in `partial`.
#[derive(Debug, Error)]
#[error("search stopped after {} package(s): {error}", partial.len())]
pub struct SearchFailure<T> {
    pub partial: Vec<T>,
    #[source]
    pub error: FeedError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_status() {
        let err = FeedError::Transport {
            url: "http://feed/x".into(),
            status: Some(404),
            message: "HTTP 404 Not Found".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());

        let err = FeedError::Transport {
            url: "http://feed/x".into(),
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.status(), None);
        assert!(!err.is_not_found());
        assert!(!FeedError::Cancelled.is_not_found());
    }

    #[test]
    fn test_malformed_carries_parse_location() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{\n  \"a\": ").unwrap_err();
        let err = FeedError::malformed("http://feed/index.json", &parse_err);
        match &err {
            FeedError::Malformed { line, url, .. } => {
                assert_eq!(*line, 2);
                assert_eq!(url, "http://feed/index.json");
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_cancelled_maps_to_operation_cancelled() {
        assert!(matches!(
            PushError::from(FeedError::Cancelled),
            PushError::Cancelled
        ));
        assert!(matches!(
            DeleteError::from(FeedError::Cancelled),
            DeleteError::Cancelled
        ));
        let transport = FeedError::Transport {
            url: "u".into(),
            status: Some(500),
            message: "boom".into(),
        };
        assert!(matches!(
            DeleteError::from(transport),
            DeleteError::Transport(_)
        ));
    }

    #[test]
    fn test_search_failure_display() {
        let failure = SearchFailure {
            partial: vec!["a", "b"],
            error: FeedError::Cancelled,
        };
        let text = failure.to_string();
        assert!(text.contains("2 package(s)"));
        assert!(text.contains("cancelled"));
    }

    #[test]
    fn test_missing_service_display() {
        let err = DiscoveryError::MissingService(ServiceKind::Publish);
        assert_eq!(
            err.to_string(),
            "feed does not advertise a PackagePublish service"
        );
    }
}
