//! Boundary to the remote generative restoration service.
//!
//! The service itself is an external collaborator: it receives one encoded
//! photograph and answers with a restored image (perspective flattened,
//! lighting evened out, wrinkles removed, white background) or an error.
//! This module defines the [`Restorer`] seam and the failure classification
//! the session relies on.

use crate::error::{Error, Result};

/// Instruction text sent alongside the photograph.
pub const RESTORATION_PROMPT: &str = "\
You are an expert art conservator.
I will provide a photograph of a flat physical artwork (like calligraphy, ink painting, or watercolor).

Please perform the following restoration tasks strictly:
1. Perspective Correction: Make the artwork perfectly rectangular and flat, as if scanned. Crop out any background table or wall.
2. Lighting Correction: Remove uneven lighting, shadows, camera flash glare, and gradients. The background paper should be uniform.
3. Physical Repair: Digitally iron out any wrinkles, creases, or folds in the paper.
4. Output: Return ONLY the restored artwork on a clean, high-contrast white background. Do not alter the artistic strokes, signature, or ink details. Preserve the original resolution as much as possible.
";

/// Substrings in a service error that mean the credential was rejected.
const AUTH_MARKERS: [&str; 3] = ["403", "PERMISSION_DENIED", "not found"];

/// A service that restores a photographed artwork.
pub trait Restorer {
    /// Restore one encoded image, returning the encoded result.
    ///
    /// # Errors
    ///
    /// Implementations report service failures through [`classify_failure`],
    /// so that credential problems surface as
    /// [`Error::RestorationAuthFailure`].
    fn restore(&self, encoded: &[u8]) -> Result<Vec<u8>>;
}

impl<F> Restorer for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn restore(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        self(encoded)
    }
}

/// Turn a raw service error message into the matching error kind.
#[must_use]
pub fn classify_failure(message: &str) -> Error {
    if AUTH_MARKERS.iter().any(|marker| message.contains(marker)) {
        return Error::RestorationAuthFailure(message.to_string());
    }
    if message.trim().is_empty() {
        return Error::RestorationFailure("restoration failed".to_string());
    }
    Error::RestorationFailure(message.to_string())
}

/// One part of a service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Free text returned by the model.
    Text(String),
    /// Inline binary payload with its MIME type.
    InlineData {
        /// MIME type reported by the service.
        mime_type: String,
        /// Decoded payload bytes.
        data: Vec<u8>,
    },
}

/// Pick the first non-empty inline `image/*` payload out of a service response.
///
/// # Errors
///
/// Returns [`Error::RestorationFailure`] when the response is empty or holds
/// no image data.
pub fn extract_image(parts: Vec<ResponsePart>) -> Result<Vec<u8>> {
    if parts.is_empty() {
        return Err(Error::RestorationFailure("empty response".to_string()));
    }
    parts
        .into_iter()
        .find_map(|part| match part {
            ResponsePart::InlineData { mime_type, data }
                if mime_type.starts_with("image/") && !data.is_empty() =>
            {
                Some(data)
            }
            _ => None,
        })
        .ok_or_else(|| Error::RestorationFailure("no image in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_auth_failures() {
        assert!(classify_failure("HTTP 403 Forbidden").is_auth_failure());
        assert!(classify_failure("status: PERMISSION_DENIED").is_auth_failure());
        assert!(classify_failure("Requested entity was not found.").is_auth_failure());
    }

    #[test]
    fn other_errors_are_generic_failures() {
        match classify_failure("deadline exceeded") {
            Error::RestorationFailure(msg) => assert_eq!(msg, "deadline exceeded"),
            other => panic!("unexpected {other:?}"),
        }
        match classify_failure("  ") {
            Error::RestorationFailure(msg) => assert_eq!(msg, "restoration failed"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extract_image_skips_text_parts() {
        let parts = vec![
            ResponsePart::Text("here you go".into()),
            ResponsePart::InlineData {
                mime_type: "image/png".into(),
                data: Vec::new(),
            },
            ResponsePart::InlineData {
                mime_type: "application/json".into(),
                data: b"{}".to_vec(),
            },
            ResponsePart::InlineData {
                mime_type: "image/png".into(),
                data: vec![1, 2, 3],
            },
        ];
        assert_eq!(extract_image(parts).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn extract_image_reports_missing_payloads() {
        assert!(matches!(
            extract_image(Vec::new()),
            Err(Error::RestorationFailure(m)) if m == "empty response"
        ));
        assert!(matches!(
            extract_image(vec![ResponsePart::Text("sorry".into())]),
            Err(Error::RestorationFailure(m)) if m == "no image in response"
        ));
    }

    #[test]
    fn closures_act_as_restorers() {
        let echo = |bytes: &[u8]| -> Result<Vec<u8>> { Ok(bytes.to_vec()) };
        assert_eq!(echo.restore(&[9, 8]).unwrap(), vec![9, 8]);
    }
}
