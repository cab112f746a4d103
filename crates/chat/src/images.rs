//! Image search helper.
//!
//! Thin client for the image search provider (Unsplash-style API). The chat
//! pipeline does NOT call this — the system instructions tell the model to
//! locate images itself — but the helper is part of the crate surface for
//! callers that want to resolve a photo URL server-side.

use agrisense_core::ProviderError;
use serde::Deserialize;
use tracing::debug;

const SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

/// Client for the image search provider.
pub struct ImageSearchClient {
    access_key: String,
    client: reqwest::Client,
}

impl ImageSearchClient {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Search for one landscape photo matching `query`.
    ///
    /// Returns the first result's regular-size URL, or `None` when the
    /// provider has no match.
    pub async fn search(&self, query: &str) -> Result<Option<String>, ProviderError> {
        self.search_at(SEARCH_URL, query).await
    }

    async fn search_at(&self, url: &str, query: &str) -> Result<Option<String>, ProviderError> {
        debug!(query = %query, "Searching for image");

        let response = self
            .client
            .get(url)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status,
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(body.results.into_iter().next().map(|r| r.urls.regular))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: ResultUrls,
}

#[derive(Debug, Deserialize)]
struct ResultUrls {
    regular: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn first_result_url_is_returned() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/search/photos")
                .query_param("query", "wheat field")
                .query_param("per_page", "1")
                .header("Authorization", "Client-ID test-key");
            then.status(200).json_body(json!({
                "results": [
                    {"urls": {"regular": "https://images.example/wheat.jpg"}}
                ]
            }));
        });

        let client = ImageSearchClient::new("test-key");
        let url = client
            .search_at(&server.url("/search/photos"), "wheat field")
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://images.example/wheat.jpg"));
    }

    #[tokio::test]
    async fn no_results_is_none_not_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search/photos");
            then.status(200).json_body(json!({"results": []}));
        });

        let client = ImageSearchClient::new("test-key");
        let url = client
            .search_at(&server.url("/search/photos"), "nothing")
            .await
            .unwrap();
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn provider_error_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search/photos");
            then.status(403).body("rate limited");
        });

        let client = ImageSearchClient::new("test-key");
        let err = client
            .search_at(&server.url("/search/photos"), "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 403, .. }));
    }
}
