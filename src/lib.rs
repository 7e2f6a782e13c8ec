pub mod config;
pub mod conversation;
pub mod error;
pub mod model;
pub mod web;

use std::sync::Arc;

use model::ChatProvider;

/// Immutable state shared by every worker.
pub struct AppState {
    pub persona: String,
    pub provider: Arc<dyn ChatProvider>,
}
