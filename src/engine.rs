//! Batch matting of image files and directories.

use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::codec;
use crate::matting::{self, MattingSettings};

/// Options controlling batch processing behavior.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Matting parameters applied to every image.
    pub settings: MattingSettings,
    /// Also write the unmatted input, flattened on white, as JPEG to this path.
    pub restored_jpeg: Option<PathBuf>,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Path the matted PNG was written to, on success.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped.
    pub skipped: bool,
    /// Share of fully opaque pixels in the result.
    pub opaque_ratio: f32,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            output: None,
            success: false,
            skipped: false,
            opaque_ratio: 0.0,
            message: String::new(),
        }
    }
}

/// Process a single image file: load, matte, save as PNG.
///
/// Failures are reported in the returned [`ProcessResult`], never panicked.
#[must_use]
pub fn process_file(input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
    let mut result = ProcessResult::new(input);

    if let Err(e) = codec::check_output_format(output, ImageFormat::Png) {
        result.message = format!("Refusing to write: {e}");
        return result;
    }

    let dyn_img = match image::open(input) {
        Ok(img) => img,
        Err(e) => {
            result.message = format!("Failed to load: {e}");
            return result;
        }
    };

    if dyn_img.width() == 0 || dyn_img.height() == 0 {
        result.skipped = true;
        result.success = true;
        result.message = format!("Empty image ({}x{})", dyn_img.width(), dyn_img.height());
        return result;
    }

    if let Some(jpeg_path) = &opts.restored_jpeg {
        if let Err(e) = codec::save_jpeg(&dyn_img.to_rgba8(), jpeg_path) {
            result.message = format!("Failed to save JPEG: {e}");
            return result;
        }
    }

    let matted = match matting::matte_image(&dyn_img, opts.settings) {
        Ok(img) => img,
        Err(e) => {
            result.message = format!("Background removal failed: {e}");
            return result;
        }
    };
    let stats = matting::alpha_stats(&matted);
    result.opaque_ratio = stats.opaque_ratio();
    tracing::debug!(
        path = %input.display(),
        transparent = stats.transparent,
        partial = stats.partial,
        opaque = stats.opaque,
        "matted"
    );

    match codec::save_png(&matted, output) {
        Ok(()) => {
            result.success = true;
            result.output = Some(output.to_path_buf());
            result.message = "Background removed".to_string();
        }
        Err(e) => {
            result.message = format!("Failed to save: {e}");
        }
    }

    result
}

/// Process all supported images in a directory.
///
/// Each `name.ext` is written to `output_dir/name.png`. Uses parallel
/// iteration when the `parallel` feature is enabled.
#[must_use]
pub fn process_directory(
    input_dir: &Path,
    output_dir: &Path,
    opts: &ProcessOptions,
) -> Vec<ProcessResult> {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
        Ok(rd) => rd
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| codec::is_supported_image(p))
            .collect(),
        Err(e) => {
            let mut failed = ProcessResult::new(input_dir);
            failed.message = format!("Failed to read directory: {e}");
            return vec![failed];
        }
    };
    entries.sort();

    if !output_dir.exists() {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            let mut failed = ProcessResult::new(output_dir);
            failed.message = format!("Failed to create output directory: {e}");
            return vec![failed];
        }
    }

    // In batch mode `restored_jpeg` names a directory.
    let per_file = |input_path: &PathBuf| {
        let stem = input_path.file_stem().unwrap_or_default().to_string_lossy();
        let output_path = output_dir.join(format!("{stem}.png"));
        let file_opts = ProcessOptions {
            restored_jpeg: opts
                .restored_jpeg
                .as_ref()
                .map(|dir| dir.join(format!("{stem}.jpg"))),
            ..opts.clone()
        };
        process_file(input_path, &output_path, &file_opts)
    };

    tracing::info!(count = entries.len(), dir = %input_dir.display(), "processing directory");

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        entries.par_iter().map(per_file).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        entries.iter().map(per_file).collect()
    }
}
