//! A long-lived connection to one feed.

use log::debug;
use tokio_util::sync::CancellationToken;

use super::retry::{RetryPolicy, with_retry};
use crate::error::DiscoveryError;
use crate::feed::{self, FeedConfig, FeedEndpoints, ListVersionsOptions};
use crate::http::HttpClient;
use crate::model::{Package, PackageVersion};

/// One user's connection to one feed.
///
/// Owns the HTTP client, the feed configuration and the endpoints resolved for
/// it. Endpoints are resolved on first use and reused until the feed URL
/// changes.
pub struct FeedSession {
    http: HttpClient,
    config: FeedConfig,
    endpoints: Option<FeedEndpoints>,
    retry: RetryPolicy,
}

impl FeedSession {
    pub fn new(http: HttpClient, config: FeedConfig) -> Self {
        Self {
            http,
            config,
            endpoints: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Switches to a new configuration. Cached endpoints survive only if they
    /// belong to the new feed URL.
    pub fn set_config(&mut self, config: FeedConfig) {
        if let Some(endpoints) = &self.endpoints {
            if !endpoints.is_for(&config.feed_url) {
                debug!("Feed URL changed; dropping cached endpoints");
                self.endpoints = None;
            }
        }
        self.config = config;
    }

    /// The endpoints for the current feed, resolving (with retry) if needed.
    pub async fn endpoints(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<FeedEndpoints, DiscoveryError> {
        if let Some(cached) = self
            .endpoints
            .as_ref()
            .filter(|e| e.is_for(&self.config.feed_url))
        {
            return Ok(cached.clone());
        }

        let http = &self.http;
        let feed_url = self.config.feed_url.as_str();
        let resolved = with_retry("Resolving feed", &self.retry, cancel, || {
            feed::resolve(http, feed_url, cancel)
        })
        .await?;

        self.endpoints = Some(resolved.clone());
        Ok(resolved)
    }

    /// Lists versions of one package, retrying transient failures.
    pub async fn list_versions(
        &mut self,
        package_id: &str,
        options: ListVersionsOptions,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<PackageVersion>> {
        let endpoints = self.endpoints(cancel).await?;
        let versions = with_retry("Listing versions", &self.retry, cancel, || {
            feed::list_versions(&self.http, &endpoints, package_id, options, cancel)
        })
        .await?;
        Ok(versions)
    }

    /// Loads one package with its versions, retrying transient failures.
    pub async fn load_package(
        &mut self,
        package_id: &str,
        options: ListVersionsOptions,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Package>> {
        let endpoints = self.endpoints(cancel).await?;
        let package = with_retry("Loading package", &self.retry, cancel, || {
            feed::load_package(&self.http, &endpoints, package_id, options, cancel)
        })
        .await?;
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::Client;
    use std::time::Duration;

    fn index_body(base: &str) -> String {
        format!(
            r#"{{"resources": [
                {{"@id": "{base}/query", "@type": "SearchQueryService/3.5.0"}},
                {{"@id": "{base}/api/v2/package", "@type": "PackagePublish/2.0.0"}}
            ]}}"#
        )
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_endpoints_resolved_once_per_feed() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let index = server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_body(index_body(&url))
            .expect(1)
            .create_async()
            .await;

        let http = HttpClient::new(Client::new());
        let mut session = FeedSession::new(http, FeedConfig::new(&url));
        let cancel = CancellationToken::new();

        let first = session.endpoints(&cancel).await.unwrap();
        let second = session.endpoints(&cancel).await.unwrap();

        index.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first.search(), format!("{}/query", url));
    }

    #[tokio::test]
    async fn test_endpoints_re_resolved_when_feed_changes() {
        let mut first_server = mockito::Server::new_async().await;
        let first_url = first_server.url();
        let mut second_server = mockito::Server::new_async().await;
        let second_url = second_server.url();

        let first_index = first_server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_body(index_body(&first_url))
            .expect(1)
            .create_async()
            .await;
        let second_index = second_server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_body(index_body(&second_url))
            .expect(1)
            .create_async()
            .await;

        let http = HttpClient::new(Client::new());
        let mut session = FeedSession::new(http, FeedConfig::new(&first_url));
        let cancel = CancellationToken::new();

        session.endpoints(&cancel).await.unwrap();
        session.set_config(FeedConfig::new(&second_url).with_api_key("k"));
        let endpoints = session.endpoints(&cancel).await.unwrap();

        first_index.assert_async().await;
        second_index.assert_async().await;
        assert!(endpoints.is_for(&second_url));
        assert_eq!(session.config().api_key(), Some("k"));
    }

    #[tokio::test]
    async fn test_discovery_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let index = server
            .mock("GET", "/v3/index.json")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let http = HttpClient::new(Client::new());
        let mut session =
            FeedSession::new(http, FeedConfig::new(&url)).with_retry_policy(quick_retry());

        let result = session.endpoints(&CancellationToken::new()).await;

        index.assert_async().await;
        assert!(matches!(result, Err(DiscoveryError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_list_versions_through_session() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _index = server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_body(index_body(&url))
            .create_async()
            .await;
        let _search = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": [{"id": "A", "versions": ["1.0.0", "1.1.0-rc.1"]}]}"#)
            .create_async()
            .await;

        let http = HttpClient::new(Client::new());
        let mut session = FeedSession::new(http, FeedConfig::new(&url));
        let cancel = CancellationToken::new();

        let versions = session
            .list_versions(
                "a",
                ListVersionsOptions {
                    include_prerelease: false,
                    include_unlisted: false,
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);

        let package = session
            .load_package("A", ListVersionsOptions::default(), &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.versions().len(), 2);
    }
}
