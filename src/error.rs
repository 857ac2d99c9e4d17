//! Error types for the artfix-matting crate.

/// Errors that can occur while decoding, matting, restoring or exporting artwork.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pixel buffer or encoded image is malformed or undecodable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The background removal pass failed unexpectedly.
    #[error("background removal failed: {0}")]
    BackgroundRemovalFailed(String),

    /// The restoration service rejected the credential (denied, missing or unbilled).
    #[error("restoration access denied: {0}")]
    RestorationAuthFailure(String),

    /// The restoration service failed for any other reason.
    #[error("restoration failed: {0}")]
    RestorationFailure(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error requires the user to pick a new credential before retrying.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::RestorationAuthFailure(_))
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let invalid = Error::invalid_input("buffer length 7 is not 2x2x4");
        assert_eq!(
            invalid.to_string(),
            "invalid input: buffer length 7 is not 2x2x4"
        );
    }

    #[test]
    fn only_auth_failures_force_reauthentication() {
        assert!(Error::RestorationAuthFailure("403".into()).is_auth_failure());
        assert!(!Error::RestorationFailure("timeout".into()).is_auth_failure());
        assert!(!Error::BackgroundRemovalFailed("canvas".into()).is_auth_failure());
    }
}
