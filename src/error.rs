//! Error taxonomy for the catalog core
//!
//! Every operation either succeeds or fails with exactly one of these kinds.
//! Layers pass them through unchanged, so the kind always names the
//! component where the failure happened.

use thiserror::Error;

/// Boxed underlying cause (SQLite, I/O, JSON, task join...)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Declared media type is not on the allow-list
    #[error("unsupported image format '{media_type}': only JPEG, PNG and WebP are accepted")]
    UnsupportedFormat { media_type: String },

    #[error("image is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// Source bytes could not be decoded (or re-encoded) as an image
    #[error("failed to decode image '{name}'")]
    DecodeError {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("read failed: {context}")]
    ReadError {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("write failed: {context}")]
    WriteError {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("garment '{id}' not found")]
    NotFound { id: String },
}

/// Stable, copyable discriminant of a [`CatalogError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    FileTooLarge,
    DecodeError,
    ReadError,
    WriteError,
    NotFound,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            CatalogError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            CatalogError::DecodeError { .. } => ErrorKind::DecodeError,
            CatalogError::ReadError { .. } => ErrorKind::ReadError,
            CatalogError::WriteError { .. } => ErrorKind::WriteError,
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub(crate) fn read(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CatalogError::ReadError {
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn write(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CatalogError::WriteError {
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        CatalogError::NotFound { id: id.into() }
    }
}
