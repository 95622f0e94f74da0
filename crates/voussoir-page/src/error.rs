use crate::{ConfigurationError, DetectionFailure};
use voussoir_core::GeometryFailure;

/// Why one page could not be produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PageError {
    #[error(transparent)]
    Detection(#[from] DetectionFailure),
    #[error(transparent)]
    Geometry(#[from] GeometryFailure),
    #[error(transparent)]
    Layout(#[from] ConfigurationError),
}
