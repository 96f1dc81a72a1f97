//! Errors returned by the view pipeline.

use docview_core::strategy::UriConstructionError;
use thiserror::Error;

use crate::backend::BackendError;

/// Terminal outcome of a failed view request.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The reference does not resolve to a visible document.
    #[error("document not found: {reference}")]
    NotFound {
        reference: String,
        #[source]
        cause: Option<BackendError>,
    },
    /// The view server failed while rendering the resolved URL.
    #[error("view server could not render {reference}: {cause}")]
    Render {
        reference: String,
        #[source]
        cause: BackendError,
    },
    #[error(transparent)]
    UriConstruction(#[from] UriConstructionError),
    #[error("{0}")]
    NotImplemented(&'static str),
    /// The content backend could not be reached or answered unusably.
    #[error("content backend request failed: {0}")]
    Backend(#[source] BackendError),
    /// Writing to the output sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ViewError {
    pub fn not_found(reference: impl Into<String>) -> Self {
        ViewError::NotFound {
            reference: reference.into(),
            cause: None,
        }
    }

    /// The document reference the error concerns, if it carries one.
    pub fn reference(&self) -> Option<&str> {
        match self {
            ViewError::NotFound { reference, .. } | ViewError::Render { reference, .. } => {
                Some(reference)
            }
            _ => None,
        }
    }
}
