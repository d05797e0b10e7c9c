//! HTTP client with cancellation and typed error mapping.

use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::FeedError;

/// Longest response-body excerpt carried in a transport error.
const BODY_EXCERPT_LEN: usize = 200;

/// Thin wrapper over a reqwest `Client` shared by every feed operation.
///
/// Requests race against a cancellation token and every failure is mapped to
/// a [`FeedError`]. There is no retry here; see `application::retry`.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, FeedError> {
        debug!("GET JSON from {}...", url);
        let response = self.send(url, self.client.get(url), cancel).await?;
        read_json(url, response, cancel).await
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    #[tracing::instrument(skip(self, query, cancel))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, FeedError> {
        debug!("GET JSON from {} with query {:?}...", url, query);
        let response = self
            .send(url, self.client.get(url).query(query), cancel)
            .await?;
        read_json(url, response, cancel).await
    }

    /// Like [`get_json`](Self::get_json), but a 404 yields `Ok(None)`.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_json_optional<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, FeedError> {
        match self.get_json(url, cancel).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                debug!("{} not found", url);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Sends a prepared request and returns the response whatever its status.
    ///
    /// Only connection-level failures and cancellation are errors here; callers
    /// that need to interpret specific statuses (push, delete) use this.
    pub async fn execute(
        &self,
        url: &str,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Response, FeedError> {
        cancellable(cancel, async {
            request.send().await.map_err(|e| FeedError::Transport {
                url: url.to_string(),
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })
        })
        .await
    }

    /// Sends a request and fails on any non-success status.
    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Response, FeedError> {
        let response = self.execute(url, request, cancel).await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(url, response, cancel).await)
    }
}

/// Builds a transport error from a non-success response, keeping the status
/// and an excerpt of whatever text the feed sent back.
pub async fn status_error(url: &str, response: Response, cancel: &CancellationToken) -> FeedError {
    let status = response.status();
    let body = response_text(response, cancel).await;
    FeedError::Transport {
        url: url.to_string(),
        status: Some(status.as_u16()),
        message: describe_status(status, &body),
    }
}

/// Reads a response body as text, returning an empty string when the body
/// cannot be read or the read is cancelled.
pub async fn response_text(response: Response, cancel: &CancellationToken) -> String {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => String::new(),
        text = response.text() => text.unwrap_or_default(),
    }
}

/// Formats "HTTP 404 Not Found: <excerpt>".
pub fn describe_status(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("");
    let mut message = format!("HTTP {} {}", status.as_u16(), reason)
        .trim_end()
        .to_string();
    let excerpt = body.trim();
    if !excerpt.is_empty() {
        let excerpt: String = excerpt.chars().take(BODY_EXCERPT_LEN).collect();
        message.push_str(": ");
        message.push_str(&excerpt);
    }
    message
}

async fn read_json<T: DeserializeOwned>(
    url: &str,
    response: Response,
    cancel: &CancellationToken,
) -> Result<T, FeedError> {
    let body = cancellable(cancel, async {
        response.text().await.map_err(|e| FeedError::Transport {
            url: url.to_string(),
            status: None,
            message: format!("failed to read response body: {}", e),
        })
    })
    .await?;

    serde_json::from_str(&body).map_err(|e| FeedError::malformed(url, &e))
}

/// Races a feed future against the cancellation token.
pub async fn cancellable<T, F>(cancel: &CancellationToken, operation: F) -> Result<T, FeedError>
where
    F: Future<Output = Result<T, FeedError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FeedError::Cancelled),
        result = operation => result,
    }
}
