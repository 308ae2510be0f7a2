use std::path::PathBuf;

use thiserror::Error;

use crate::annotation::FieldKey;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing {kind} for key '{key}' at {path}")]
    MissingArtifact {
        key: String,
        kind: &'static str,
        path: PathBuf,
    },

    #[error("no classifier registered for field '{0}'")]
    MissingClassifier(FieldKey),

    #[error("invalid sidecar {path}: {reason}")]
    InvalidSidecar { path: PathBuf, reason: String },

    #[error("invalid ROI: {0}")]
    InvalidRoi(String),

    #[error("ROI for '{key}' selects no pixels on a {width}x{height} image")]
    EmptyCrop {
        key: String,
        width: u32,
        height: u32,
    },

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("inference failed for '{key}': {reason}")]
    Inference { key: String, reason: String },

    #[error("malformed annotation file {path}: {source}")]
    MalformedAnnotationFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid annotation record: {0}")]
    InvalidAnnotation(String),

    #[error("invalid dataset version '{0}', expected v<integer> up to v10000")]
    InvalidVersion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Failures tied to one image's content rather than to the setup
    pub fn is_per_image(&self) -> bool {
        matches!(self, Error::EmptyCrop { .. } | Error::Inference { .. })
    }
}

/// Per-image outcomes of screen detection. Recoverable: batch callers skip
/// the image and carry on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenError {
    #[error("no four-sided screen region found")]
    NoScreenFound,

    #[error("screen quadrilateral is degenerate, perspective transform is singular")]
    DegenerateQuadrilateral,
}
