//! Image lookup for articles whose block carried no usable picture.
//!
//! Uses the Unsplash photo search API and takes the `small` rendition of the
//! first hit. Every failure degrades to "no image".

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Finds a representative image for a free-text query.
pub trait ImageSearch {
    /// Returns `None` on any failure or when nothing matched.
    async fn search(&self, query: &str) -> Option<String>;
}

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    small: Option<String>,
}

/// First result's `small` URL from a search response body.
fn first_small_url(body: &str) -> Option<String> {
    let parsed: SearchResponse = serde_json::from_str(body).ok()?;
    parsed.results.into_iter().next()?.urls.small
}

/// [`ImageSearch`] backed by Unsplash.
pub struct UnsplashClient {
    client: Client,
    access_key: String,
}

impl std::fmt::Debug for UnsplashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsplashClient")
            .field("access_key", &"<redacted>")
            .finish()
    }
}

impl UnsplashClient {
    pub fn new(access_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, access_key })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}?query={}&client_id={}",
            UNSPLASH_SEARCH_URL,
            urlencoding::encode(query),
            urlencoding::encode(&self.access_key)
        )
    }
}

impl ImageSearch for UnsplashClient {
    #[instrument(level = "info", skip_all, fields(%query))]
    async fn search(&self, query: &str) -> Option<String> {
        let response = match self.client.get(self.search_url(query)).send().await {
            Ok(r) => r,
            Err(e) => {
                // The request URL carries the access key.
                warn!(error = %e.without_url(), "Image search request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Image search returned an error status");
            return None;
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e.without_url(), "Failed reading image search response");
                return None;
            }
        };

        match first_small_url(&body) {
            Some(url) => {
                info!(%url, "Found image");
                Some(url)
            }
            None => {
                info!("No image found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_small_url_picks_first_result() {
        let body = r#"{
            "total": 2,
            "results": [
                {"id": "a", "urls": {"raw": "https://images.unsplash.com/a?raw", "small": "https://images.unsplash.com/a?w=400"}},
                {"id": "b", "urls": {"small": "https://images.unsplash.com/b?w=400"}}
            ]
        }"#;
        assert_eq!(
            first_small_url(body).as_deref(),
            Some("https://images.unsplash.com/a?w=400")
        );
    }

    #[test]
    fn test_first_small_url_empty_results() {
        assert_eq!(first_small_url(r#"{"total": 0, "results": []}"#), None);
        assert_eq!(first_small_url(r#"{"errors": ["OAuth error"]}"#), None);
        assert_eq!(first_small_url("not json"), None);
    }

    #[test]
    fn test_search_url_encodes_query() {
        let client = UnsplashClient::new("key 1".to_string(), Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.search_url("Sube el pan & la luz"),
            "https://api.unsplash.com/search/photos?query=Sube%20el%20pan%20%26%20la%20luz&client_id=key%201"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = UnsplashClient::new("secret".to_string(), Duration::from_secs(1)).unwrap();
        assert!(!format!("{:?}", client).contains("secret"));
    }
}
