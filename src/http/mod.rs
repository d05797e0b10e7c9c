//! HTTP client module with cancellation and error mapping.

mod client;

pub use client::{HttpClient, cancellable, describe_status, response_text, status_error};

/// User agent sent with every feed request.
pub const USER_AGENT: &str = concat!("feedman/", env!("FEEDMAN_VERSION"));

/// Builds the shared HTTP client used by a feed session.
pub fn build_client() -> reqwest::Result<HttpClient> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    Ok(HttpClient::new(client))
}
