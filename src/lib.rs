//! Remove the paper background from photographs of flat artwork.
//!
//! Calligraphy, ink paintings and watercolours are usually photographed on
//! near-white paper. This crate turns such a photograph into a transparent
//! PNG with a single-pass, per-pixel threshold matte: pixels brighter than a
//! threshold become transparent, darker ones stay opaque, and a configurable
//! band in between is blended linearly.
//!
//! # Quick Start
//!
//! ```no_run
//! use artfix_matting::{matte, MattingMode, MattingSettings};
//!
//! let img = image::open("scroll.jpg").unwrap().to_rgba8();
//! let settings = MattingSettings::default().with_mode(MattingMode::Color);
//! let transparent = matte(&img, settings);
//! transparent.save("scroll.png").unwrap();
//! ```
//!
//! # Workflow
//!
//! [`Session`] models the full upload → restore → matte → export flow. The
//! remote restoration step is injected through the [`Restorer`] trait.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use artfix_matting::{Result, Session};
//!
//! let mut session = Session::new(true);
//! session.load_original(&std::fs::read("scroll.jpg").unwrap()).unwrap();
//! let passthrough = |bytes: &[u8]| -> Result<Vec<u8>> { Ok(bytes.to_vec()) };
//! session.restore(&passthrough).unwrap();
//! session.run_matting().unwrap();
//! session.export_transparent(Path::new("scroll.png")).unwrap();
//! ```

#![deny(missing_docs)]

pub mod codec;
mod engine;
pub mod error;
pub mod matting;
pub mod restore;
pub mod session;

pub use codec::{default_output_path, is_supported_image};
pub use engine::{process_directory, process_file, ProcessOptions, ProcessResult};
pub use error::{Error, Result};
pub use matting::{
    alpha_stats, matte, matte_image, matte_in_place, matte_rgba, MatteStats, MattingMode,
    MattingSettings,
};
pub use restore::{classify_failure, Restorer};
pub use session::{Session, Stage, Status};
