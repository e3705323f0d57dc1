//! Typed errors for the OCR pipeline.
//!
//! Application code (the CLI) works with [`anyhow::Result`], but the pipeline
//! itself needs to tell callers _why_ a file failed, so that batch reports can
//! distinguish a missing Tesseract install from a corrupt image.

use std::io;

use serde::Serialize;

use crate::prelude::*;

/// Result type for pipeline operations.
pub type OcrResult<T> = std::result::Result<T, OcrError>;

/// Something went wrong while extracting or saving text.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// The OCR engine binary could not be found or started.
    #[error("OCR engine unavailable: {command}")]
    EngineUnavailable {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The engine rejected our configuration (usually the language code).
    #[error("invalid OCR configuration: {0}")]
    InvalidConfiguration(String),

    /// The engine ran but failed for some other reason.
    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    /// An input file or folder does not exist.
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// An input image could not be decoded.
    #[error("cannot decode image {source_name}")]
    Decode {
        source_name: String,
        #[source]
        source: image::ImageError,
    },

    /// An image could not be encoded for the engine.
    #[error("cannot encode image for OCR engine")]
    Encode(#[source] image::ImageError),

    /// Somebody asked for text before any recognition happened.
    #[error("no text has been extracted yet")]
    NothingToSave,

    /// A filesystem operation failed.
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OcrError {
    /// Build an [`OcrError::Io`] for `path`. Handy with `map_err`.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> OcrError {
        let path = path.into();
        move |source| OcrError::Io { path, source }
    }

    /// Which broad category does this error fall into?
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::EngineUnavailable { .. } | OcrError::InvalidConfiguration(_) => {
                ErrorKind::Configuration
            }
            OcrError::EngineFailed(_) | OcrError::Encode(_) => ErrorKind::Engine,
            OcrError::InputNotFound(_) | OcrError::Decode { .. } => ErrorKind::Input,
            OcrError::NothingToSave => ErrorKind::State,
            OcrError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Broad error categories, as reported in batch reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Engine missing or misconfigured.
    Configuration,
    /// Engine ran and failed.
    Engine,
    /// Missing or undecodable input.
    Input,
    /// API misuse, such as saving before recognizing.
    State,
    /// Filesystem failure.
    Io,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_assigned_by_variant() {
        assert_eq!(OcrError::NothingToSave.kind(), ErrorKind::State);
        assert_eq!(
            OcrError::InputNotFound(PathBuf::from("missing.png")).kind(),
            ErrorKind::Input
        );
        assert_eq!(
            OcrError::InvalidConfiguration("xyz".to_owned()).kind(),
            ErrorKind::Configuration
        );
        let err = OcrError::io("out.txt")(io::Error::other("disk full"));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("out.txt"));
    }

    #[test]
    fn kinds_serialize_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Configuration).unwrap();
        assert_eq!(json, r#""configuration""#);
    }
}
