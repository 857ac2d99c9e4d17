//! Upload, restore, matte and export as an explicit state machine.
//!
//! A [`Session`] owns every artifact produced so far together with the
//! matting parameters and the credential flag, so handlers receive it as a
//! plain `&mut` instead of reaching for globals. Only one operation runs at a
//! time; while [`Session::is_busy`] is true, new operations are refused.

use std::path::Path;

use image::RgbaImage;

use crate::codec;
use crate::error::{Error, Result};
use crate::matting::{self, MattingSettings};
use crate::restore::Restorer;

/// Message shown when the restoration service rejects the credential.
pub const AUTH_FAILURE_MESSAGE: &str =
    "Access denied. Select a paid API credential that can use the restoration model.";

/// Message shown when the matting pass fails.
pub const MATTING_FAILURE_MESSAGE: &str = "background removal failed";

/// Step of the workflow currently on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Pick a photograph.
    #[default]
    Upload,
    /// Send it to the restoration service.
    Restore,
    /// Tune and run background removal.
    Matte,
    /// Download the results.
    Export,
}

/// What the session is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Waiting for user input.
    #[default]
    Idle,
    /// A restoration request is in flight.
    Restoring,
    /// The matting pass is running.
    Matting,
    /// The last operation completed.
    Success,
    /// The last operation failed; see [`Session::error_message`].
    Error,
}

/// Images produced along the workflow.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    /// Photograph as uploaded.
    pub original: Option<RgbaImage>,
    /// Output of the restoration service.
    pub restored: Option<RgbaImage>,
    /// Matted result with transparent background.
    pub transparent: Option<RgbaImage>,
}

/// Explicit application state for one artwork.
#[derive(Debug, Clone, Default)]
pub struct Session {
    artifacts: Artifacts,
    stage: Stage,
    status: Status,
    error_message: Option<String>,
    credential_selected: bool,
    /// Parameters used by the next [`Session::run_matting`] call.
    pub settings: MattingSettings,
}

impl Session {
    /// Create a session; `credential_selected` reflects whether a service credential is already available.
    #[must_use]
    pub fn new(credential_selected: bool) -> Self {
        Self {
            credential_selected,
            ..Self::default()
        }
    }

    /// Current workflow step.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current activity.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// User-facing message for the last failure, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Whether a restoration credential is selected.
    #[must_use]
    pub fn credential_selected(&self) -> bool {
        self.credential_selected
    }

    /// Images produced so far.
    #[must_use]
    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Whether an operation is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.status, Status::Restoring | Status::Matting)
    }

    /// Mark a credential as selected and clear any pending error.
    pub fn select_credential(&mut self) {
        self.credential_selected = true;
        self.error_message = None;
    }

    /// Replace the photograph, discarding earlier results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the bytes cannot be decoded; the
    /// session is left unchanged in that case.
    pub fn load_original(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_idle()?;
        let original = codec::decode(bytes)?;
        tracing::info!(
            width = original.width(),
            height = original.height(),
            "loaded original"
        );
        self.artifacts = Artifacts {
            original: Some(original),
            restored: None,
            transparent: None,
        };
        self.stage = Stage::Restore;
        self.status = Status::Idle;
        self.error_message = None;
        Ok(())
    }

    /// Start a restoration: mark the session busy and return the PNG-encoded
    /// original to send to the service.
    ///
    /// Returns `Ok(None)` when no original is loaded. The caller must hand the
    /// service's answer to [`Session::finish_restore`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if another operation is in flight, or
    /// an encoding error.
    pub fn begin_restore(&mut self) -> Result<Option<Vec<u8>>> {
        self.ensure_idle()?;
        let Some(original) = self.artifacts.original.as_ref() else {
            return Ok(None);
        };
        let encoded = codec::encode_png(original)?;
        self.status = Status::Restoring;
        self.error_message = None;
        Ok(Some(encoded))
    }

    /// Record the outcome of a restoration started with [`Session::begin_restore`].
    ///
    /// # Errors
    ///
    /// Propagates the failure after recording it. An
    /// [`Error::RestorationAuthFailure`] also clears the credential flag so
    /// the user has to pick a credential again. Returns
    /// [`Error::InvalidInput`] if no restoration was in flight.
    pub fn finish_restore(&mut self, outcome: Result<Vec<u8>>) -> Result<()> {
        if self.status != Status::Restoring {
            return Err(Error::invalid_input("no restoration in flight"));
        }

        match outcome.and_then(|restored| codec::decode(&restored)) {
            Ok(restored) => {
                tracing::info!(
                    width = restored.width(),
                    height = restored.height(),
                    "restoration finished"
                );
                self.artifacts.restored = Some(restored);
                self.status = Status::Success;
                self.stage = Stage::Matte;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "restoration failed");
                self.status = Status::Error;
                if err.is_auth_failure() {
                    self.credential_selected = false;
                    self.error_message = Some(AUTH_FAILURE_MESSAGE.to_string());
                } else {
                    self.error_message = Some(match &err {
                        Error::RestorationFailure(msg) => msg.clone(),
                        other => other.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    /// Send the original to `restorer` and keep the result.
    ///
    /// Does nothing when no original is loaded.
    ///
    /// # Errors
    ///
    /// See [`Session::finish_restore`].
    pub fn restore(&mut self, restorer: &dyn Restorer) -> Result<()> {
        let Some(encoded) = self.begin_restore()? else {
            return Ok(());
        };
        self.finish_restore(restorer.restore(&encoded))
    }

    /// Start a matting pass: mark the session busy and return a copy of the
    /// source image (restored if present, otherwise original) with the
    /// current settings.
    ///
    /// Returns `Ok(None)` when no image is loaded. The caller must hand the
    /// matted image to [`Session::finish_matting`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if another operation is in flight.
    pub fn begin_matting(&mut self) -> Result<Option<(RgbaImage, MattingSettings)>> {
        self.ensure_idle()?;
        let Some(source) = self
            .artifacts
            .restored
            .as_ref()
            .or(self.artifacts.original.as_ref())
        else {
            return Ok(None);
        };
        let job = (source.clone(), self.settings);
        self.status = Status::Matting;
        self.error_message = None;
        Ok(Some(job))
    }

    /// Record the outcome of a pass started with [`Session::begin_matting`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackgroundRemovalFailed`] if the pass failed, or
    /// [`Error::InvalidInput`] if no pass was in flight.
    pub fn finish_matting(&mut self, outcome: Result<RgbaImage>) -> Result<()> {
        if self.status != Status::Matting {
            return Err(Error::invalid_input("no matting pass in flight"));
        }

        match outcome {
            Ok(matted) => {
                self.artifacts.transparent = Some(matted);
                self.status = Status::Success;
                self.stage = Stage::Export;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "background removal failed");
                self.status = Status::Error;
                self.error_message = Some(MATTING_FAILURE_MESSAGE.to_string());
                Err(Error::BackgroundRemovalFailed(err.to_string()))
            }
        }
    }

    /// Matte the restored image, or the original if nothing was restored.
    ///
    /// Does nothing when no image is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackgroundRemovalFailed`] if the pass fails.
    pub fn run_matting(&mut self) -> Result<()> {
        let Some((mut pixels, settings)) = self.begin_matting()? else {
            return Ok(());
        };
        let (width, height) = pixels.dimensions();
        let outcome = matting::matte_rgba(&mut pixels, width, height, settings).map(|()| pixels);
        self.finish_matting(outcome)
    }

    /// Whether the given stage may be shown with the current artifacts.
    #[must_use]
    pub fn can_navigate(&self, stage: Stage) -> bool {
        let a = &self.artifacts;
        match stage {
            Stage::Upload => true,
            Stage::Restore => a.original.is_some(),
            Stage::Matte => a.restored.is_some() || a.original.is_some(),
            Stage::Export => a.transparent.is_some() || a.restored.is_some(),
        }
    }

    /// Switch to `stage` if allowed; returns whether the switch happened.
    pub fn navigate(&mut self, stage: Stage) -> bool {
        if self.is_busy() || !self.can_navigate(stage) {
            return false;
        }
        self.stage = stage;
        true
    }

    /// Write the matted result as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if nothing was matted yet, or an I/O
    /// error if writing fails.
    pub fn export_transparent(&self, path: &Path) -> Result<()> {
        let img = self
            .artifacts
            .transparent
            .as_ref()
            .ok_or_else(|| Error::invalid_input("no matted image to export"))?;
        codec::save_png(img, path)
    }

    /// Write the restored image as an opaque JPEG on white.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if nothing was restored yet, or an I/O
    /// error if writing fails.
    pub fn export_restored(&self, path: &Path) -> Result<()> {
        let img = self
            .artifacts
            .restored
            .as_ref()
            .ok_or_else(|| Error::invalid_input("no restored image to export"))?;
        codec::save_jpeg(img, path)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            return Err(Error::invalid_input("operation already in flight"));
        }
        Ok(())
    }
}
