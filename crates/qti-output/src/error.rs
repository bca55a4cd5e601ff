//! Error types for item generation and archive packaging.
//!
//! Only conditions that abort the run are errors. Questions that cannot be
//! exported are reported as [`SkipReason`](crate::SkipReason) values instead.

use qti_model::FieldKey;
use thiserror::Error;

/// Errors raised while exporting questions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExportError {
    // =========================================================================
    // ARCHIVE ERRORS
    // =========================================================================
    /// An archive path was written twice.
    #[error("Archive path already written: {path}")]
    DuplicatePath {
        /// The conflicting path.
        path: String,
    },

    /// A write was attempted after the archive was finalized.
    #[error("Archive already finalized, cannot write '{path}'")]
    ArchiveClosed {
        /// The path that was being written.
        path: String,
    },

    // =========================================================================
    // ASSET ERRORS
    // =========================================================================
    /// The file storage could not supply an embedded file.
    #[error("Cannot resolve embedded file '{filename}' ({field} of {owner_id}): {source}")]
    AssetResolution {
        filename: String,
        field: FieldKey,
        owner_id: u64,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // WRAPPED ERRORS
    // =========================================================================
    /// XML writing error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Whether the error leaves the archive unusable.
    ///
    /// Asset failures abort only the question being exported; everything
    /// else means the archive can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::AssetResolution { .. })
    }

    /// Get a user-friendly suggestion for fixing this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DuplicatePath { .. } => {
                Some("Each question must appear only once per export; check for duplicate ids.")
            }
            Self::ArchiveClosed { .. } => Some("Write all items before finalizing the archive."),
            Self::AssetResolution { .. } => {
                Some("Check that the assets directory contains the files referenced by the question.")
            }
            Self::Io(_) | Self::Zip(_) => Some("Check file permissions and available disk space."),
            Self::Xml(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_failures_are_not_fatal_to_the_archive() {
        let error = ExportError::AssetResolution {
            filename: "a.png".to_string(),
            field: FieldKey::QuestionText,
            owner_id: 7,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(!error.is_fatal());
        assert!(error.to_string().contains("questiontext of 7"));
        assert!(ExportError::DuplicatePath { path: "x".into() }.is_fatal());
    }
}
