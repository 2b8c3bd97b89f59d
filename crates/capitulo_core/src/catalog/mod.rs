//! Book catalog
//!
//! Searches the public book catalog and looks up single volumes. Lookups are best effort: a
//! failed request is logged and reported as "nothing found".
pub mod book;
pub mod client;
pub mod errors;

use book::Book;
use core::future::Future;

/// The catalog as seen by the conversation flows.
pub trait Catalog: Send + Sync {
    /// Searches the catalog. Failures are logged and yield an empty result.
    fn search(&self, query: &str) -> impl Future<Output = Vec<Book>> + Send;

    /// Fetches a single volume, or `None` if it does not exist or cannot be fetched.
    fn get_detail(&self, external_id: &str) -> impl Future<Output = Option<Book>> + Send;
}
