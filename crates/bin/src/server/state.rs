//! Shared server state.

use super::error::{Result, ServerError};
use abode::FeatureOptions;
use abode_model::{LoadedModel, ModelHandle};
use std::sync::Arc;

/// State handed to every handler.
///
/// Cloning is cheap: both fields are reference counted.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub(crate) handle: Arc<ModelHandle>,
    pub(crate) options: Arc<FeatureOptions>,
}

impl AppState {
    pub(crate) fn new(handle: ModelHandle) -> Self {
        Self {
            handle: Arc::new(handle),
            options: Arc::new(FeatureOptions::standard()),
        }
    }

    /// The model in service.
    ///
    /// Handlers hold the returned `Arc` for the whole request, so a reload
    /// that lands mid-request does not change the answer.
    pub(crate) fn model(&self) -> Result<Arc<LoadedModel>> {
        self.handle.current().ok_or(ServerError::ModelNotLoaded)
    }
}
