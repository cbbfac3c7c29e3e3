//! Error types for pool operations

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced to callers of the pool's control surface
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to construct danmaku '{text}'")]
    Construction {
        text: String,
        #[source]
        source: BackendError,
    },

    #[error("batch stopped after {added} danmaku")]
    Batch {
        added: usize,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// The backend error at the root of this failure
    pub fn backend_error(&self) -> &BackendError {
        match self {
            EngineError::Construction { source, .. } => source,
            EngineError::Batch { source, .. } => source.backend_error(),
        }
    }
}
