use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for icon background removal.
///
/// Each variant carries the context of its domain (filesystem, image codec,
/// model inference) so callers can report a failing icon without parsing
/// error strings.
#[derive(Error, Debug)]
pub enum IconBgError {
    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },

    #[error("Background removal failed for {path:?}: {source}")]
    Removal {
        path: PathBuf,
        #[source]
        source: Box<IconBgError>,
    },
}

pub type Result<T> = std::result::Result<T, IconBgError>;

impl IconBgError {
    pub(crate) fn file_system(
        path: impl Into<PathBuf>,
        operation: &str,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            path: path.into(),
            operation: operation.to_string(),
            source,
        }
    }

    pub(crate) fn model(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Model {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

/// The pixel helpers in `imageops_ai` report through anyhow and know
/// nothing about the file being processed.
impl From<anyhow::Error> for IconBgError {
    fn from(err: anyhow::Error) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "pixel operation".to_string(),
            source: err.into(),
        }
    }
}

/// Fallback for I/O errors without path context. Code that knows the path
/// should build `IconBgError::FileSystem` directly.
impl From<std::io::Error> for IconBgError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for IconBgError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for IconBgError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors come out of tensor reshaping during inference, so they are
/// filed under model errors.
impl From<ndarray::ShapeError> for IconBgError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_error_mentions_path_and_cause() {
        let inner = IconBgError::Validation {
            field: "mask".to_string(),
            reason: "is empty".to_string(),
        };
        let err = IconBgError::Removal {
            path: PathBuf::from("icons/finder.png"),
            source: Box::new(inner),
        };

        let message = err.to_string();
        assert!(message.contains("finder.png"));
        assert!(message.contains("mask is empty"));
    }

    #[test]
    fn test_io_error_conversion_uses_unknown_context() {
        let err: IconBgError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        match err {
            IconBgError::FileSystem { path, operation, .. } => {
                assert_eq!(path, PathBuf::from("unknown"));
                assert_eq!(operation, "unknown");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_pixel_helper_error_becomes_image_processing() {
        let err: IconBgError = anyhow::anyhow!("mask is too small").into();
        match err {
            IconBgError::ImageProcessing { operation, source, .. } => {
                assert_eq!(operation, "pixel operation");
                assert!(source.to_string().contains("mask is too small"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
