use capitulo_core::catalog::client::GoogleBooksClient;
use capitulo_core::flow::FlowController;

/// Shared by every update handler.
pub struct AppState {
    pub flow: FlowController<GoogleBooksClient>,
}

impl AppState {
    pub const fn new(flow: FlowController<GoogleBooksClient>) -> Self {
        Self { flow }
    }
}
