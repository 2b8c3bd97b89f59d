use reqwest::StatusCode;

/// Failures while talking to the book catalog. They never reach the conversation: the
/// [`Catalog`](crate::catalog::Catalog) implementation logs them and reports an empty result.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The request could not be sent or the body could not be read, originating from `reqwest`.
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The catalog answered with a non-success status code.
    #[error("catalog answered with status {0}")]
    Status(StatusCode),
    /// The response body is not the JSON document we expect, originating from `serde_json`.
    #[error("catalog response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}
