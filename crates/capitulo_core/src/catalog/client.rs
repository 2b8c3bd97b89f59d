use crate::catalog::Catalog;
use crate::catalog::book::{Book, parse_search, parse_volume};
use crate::catalog::errors::CatalogError;
use core::time::Duration;
use log::{error, info, warn};
use reqwest::{ClientBuilder, Request, StatusCode, header};
use urlencoding::encode;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";
pub const DEFAULT_LANGUAGE: &str = "es";
pub const DEFAULT_MAX_RESULTS: u8 = 3;
/// Largest `maxResults` Google Books accepts; larger values are rejected with a 400.
pub const MAX_RESULTS_LIMIT: u8 = 40;

/// Where and how to query the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Base URL of the Google Books API, without trailing slash.
    pub base_url: String,
    /// Language restriction applied to searches.
    pub language: String,
    /// Upper bound on search results.
    pub max_results: u8,
}

impl Default for CatalogConfig {
    #[allow(clippy::missing_inline_in_public_items, reason = "Called once per program run")]
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            language: DEFAULT_LANGUAGE.to_owned(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Catalog client backed by the public Google Books API. Every lookup is a single attempt.
pub struct GoogleBooksClient {
    /// A HTTP client used to execute all GET requests against the catalog
    http_client: reqwest::Client,
    config: CatalogConfig,
}

impl GoogleBooksClient {
    /// Create a new HTTP request client, to be used for all subsequent catalog lookups
    /// # Errors
    /// Fails in case any of the reqwest `ClientBuilder` methods fail
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per program run"
    )]
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        let http_client = ClientBuilder::new()
            .user_agent(concat!("capitulo-cero/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(20))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    #[must_use]
    #[inline]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// The search request for `query`, limited to the configured language and result count.
    fn search_request(&self, query: &str) -> Result<Request, CatalogError> {
        let url = format!("{}/volumes", self.config.base_url);
        let max_results = self.config.max_results.to_string();
        Ok(self
            .http_client
            .get(&url)
            .query(&[
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("langRestrict", self.config.language.as_str()),
            ])
            .build()?)
    }

    /// Decodes a search response, keeping at most `max_results` books even if the catalog sent
    /// more.
    fn search_results(&self, body: &str) -> Result<Vec<Book>, CatalogError> {
        let mut books = parse_search(body)?;
        books.truncate(usize::from(self.config.max_results));
        Ok(books)
    }

    async fn fetch_search(&self, query: &str) -> Result<Vec<Book>, CatalogError> {
        let request = self.search_request(query)?;
        let response = self.http_client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }
        self.search_results(&response.text().await?)
    }

    async fn fetch_volume(&self, external_id: &str) -> Result<Book, CatalogError> {
        let url = format!("{}/volumes/{}", self.config.base_url, encode(external_id));
        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }
        Ok(parse_volume(&response.text().await?)?)
    }
}

impl Catalog for GoogleBooksClient {
    async fn search(&self, query: &str) -> Vec<Book> {
        match self.fetch_search(query).await {
            Ok(books) => {
                info!("Catalog search for {query:?} returned {} result(s)", books.len());
                books
            }
            Err(err) => {
                error!("Catalog search for {query:?} failed: {err}");
                Vec::new()
            }
        }
    }

    async fn get_detail(&self, external_id: &str) -> Option<Book> {
        match self.fetch_volume(external_id).await {
            Ok(book) => Some(book),
            Err(CatalogError::Status(StatusCode::NOT_FOUND)) => {
                warn!("Catalog has no volume {external_id}");
                None
            }
            Err(err) => {
                error!("Catalog lookup for volume {external_id} failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_targets_spanish_google_books() {
        let config = CatalogConfig::default();
        assert_eq!(config.base_url, "https://www.googleapis.com/books/v1");
        assert_eq!(config.language, "es");
        assert_eq!(config.max_results, 3);
    }

    #[test]
    fn search_request_restricts_language_and_result_count() {
        let client = GoogleBooksClient::new(CatalogConfig::default()).unwrap();

        let request = client.search_request("cien años de soledad").unwrap();

        assert_eq!(
            request.url().as_str().split('?').next(),
            Some("https://www.googleapis.com/books/v1/volumes")
        );
        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_owned(), "cien años de soledad".to_owned()),
                ("maxResults".to_owned(), "3".to_owned()),
                ("langRestrict".to_owned(), "es".to_owned()),
            ]
        );
    }

    #[test]
    fn search_results_are_capped_to_the_configured_count() {
        let client = GoogleBooksClient::new(CatalogConfig::default()).unwrap();
        let items: Vec<serde_json::Value> = (1..=5)
            .map(|n| {
                serde_json::json!({
                    "id": format!("v{n}"),
                    "volumeInfo": { "title": format!("Libro {n}") }
                })
            })
            .collect();
        let body = serde_json::json!({ "items": items }).to_string();

        let books = client.search_results(&body).unwrap();

        let ids: Vec<&str> = books.iter().map(|book| book.external_id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
    }

    #[tokio::test]
    async fn unreachable_catalog_yields_empty_results() {
        // nothing listens on the discard port
        let client = GoogleBooksClient::new(CatalogConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            ..CatalogConfig::default()
        })
        .unwrap();

        assert!(client.search("rayuela").await.is_empty());
        assert_eq!(client.get_detail("abc").await, None);
    }
}
