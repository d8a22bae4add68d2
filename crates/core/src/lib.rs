//! Core types for header/footer band removal.
//!
//! Everything here is independent of any PDF backend: margins, band
//! geometry, the page-source seam and the error taxonomy shared by the
//! preview and redaction pipelines.

pub mod document;
pub mod geometry;
pub mod margins;

pub use document::{output_path_for, representative_page, Document, DEFAULT_SUFFIX};
pub use geometry::{preview_bands, redaction_bands, BandRect, PageSize};
pub use margins::{Band, Margins};

pub type Result<T> = std::result::Result<T, CoreError>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
    #[error("invalid page geometry: {0}")]
    Geometry(String),
    #[error("{action} failed: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: BoxError,
    },
}

/// Problems with what the caller handed in, detected before any document
/// is mutated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{band} margin {text:?} is not a number")]
    NotANumber { band: Band, text: String },
    #[error("{band} margin must be a finite value")]
    NonFinite { band: Band },
    #[error("{band} margin must not be negative, got {value}")]
    Negative { band: Band, value: f32 },
    #[error("file not found: {0}")]
    MissingFile(String),
    #[error("document {0} has no pages")]
    EmptyDocument(String),
    #[error("output path {0} would overwrite the input file")]
    OutputIsInput(String),
}

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Geometry,
    Io,
}

impl CoreError {
    pub fn io<E>(action: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::Io {
            action,
            source: Box::new(source),
        }
    }

    /// Wraps a backend error that is only known through its message.
    pub fn io_message(action: &'static str, message: impl std::fmt::Display) -> Self {
        CoreError::Io {
            action,
            source: message.to_string().into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Input(_) => ErrorKind::Input,
            CoreError::Geometry(_) => ErrorKind::Geometry,
            CoreError::Io { .. } => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let err: CoreError = InputError::MissingFile("a.pdf".into()).into();
        assert_eq!(err.kind(), ErrorKind::Input);

        let err = CoreError::Geometry("zero width".into());
        assert_eq!(err.kind(), ErrorKind::Geometry);

        let err = CoreError::io(
            "save document",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "save document failed: read-only");
    }

    #[test]
    fn test_io_message_keeps_text() {
        let err = CoreError::io_message("render page", "bitmap allocation failed");
        assert_eq!(err.to_string(), "render page failed: bitmap allocation failed");
    }

    #[test]
    fn test_input_error_message() {
        let err = InputError::NotANumber {
            band: Band::Top,
            text: "abc".into(),
        };
        assert_eq!(err.to_string(), "top margin \"abc\" is not a number");
    }
}
