use crate::settings::SettingsError;
use capitulo_core::catalog::errors::CatalogError;
use capitulo_core::database::types::StoreError;

/// Everything that can stop the bot from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Settings(#[from] SettingsError),
    #[error("failed to install the log subscriber: {0}")]
    Tracing(String),
    #[error("failed to open the record store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build the catalog client: {0}")]
    Catalog(#[from] CatalogError),
}
