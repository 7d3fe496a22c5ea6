//! Shared application state.

use std::sync::Arc;

use utter_core::SynthesisService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Service reference - Arc for cheap clones across handlers.
    pub service: Arc<SynthesisService>,
}

impl AppState {
    pub fn new(service: SynthesisService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
