use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use artfix_matting::{
    default_output_path, process_directory, process_file, MattingMode, MattingSettings,
    ProcessOptions, ProcessResult,
};
use artfix_matting::matting::MAX_SMOOTHING;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Perceptual brightness, best for ink and calligraphy
    Luminance,
    /// Distance from white, best for coloured paintings
    Color,
}

impl From<Mode> for MattingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Luminance => Self::Luminance,
            Mode::Color => Self::Color,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "artfix",
    about = "Remove the white paper background from photographs of flat artwork",
    version,
    after_help = "Simple usage: artfix <image>  (writes <image>_transparent.png)\n\n\
                  Raise --threshold to remove more of the paper, raise --smoothing\n\
                  for softer stroke edges. Use --mode color for coloured paintings."
)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_transparent.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Brightness above which a pixel counts as background (0-255)
    #[arg(short, long, default_value_t = 240)]
    threshold: u8,

    /// Width of the soft edge band below the threshold (0-100)
    #[arg(short, long, default_value_t = 20)]
    smoothing: u8,

    /// Brightness metric
    #[arg(short, long, value_enum, default_value_t = Mode::Luminance)]
    mode: Mode,

    /// Also write the input flattened on white as JPEG (a directory in batch mode)
    #[arg(long)]
    restored_jpeg: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.smoothing > MAX_SMOOTHING {
        eprintln!("Error: Smoothing must be between 0 and {MAX_SMOOTHING}");
        process::exit(1);
    }

    let opts = ProcessOptions {
        settings: MattingSettings {
            threshold: cli.threshold,
            smoothing: cli.smoothing,
            mode: cli.mode.into(),
        },
        restored_jpeg: cli.restored_jpeg.as_ref().map(PathBuf::from),
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !opts.quiet {
        eprintln!(
            "Matting with threshold {}, smoothing {}, mode {}",
            opts.settings.threshold, opts.settings.smoothing, opts.settings.mode
        );
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: artfix <input_dir> -o <output_dir>");
            process::exit(1);
        };
        process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![process_file(input_path, &output_path, &opts)]
    };

    let mut tally = Tally::default();
    for r in &results {
        report(r, &opts);
        tally.record(r);
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprintln!("{}", tally.summary());
    }

    if tally.failed > 0 {
        process::exit(1);
    }
}

/// Running totals over a batch of results.
#[derive(Debug, Default)]
struct Tally {
    matted: u32,
    skipped: u32,
    failed: u32,
    opaque_sum: f32,
}

impl Tally {
    fn record(&mut self, result: &ProcessResult) {
        if result.skipped {
            self.skipped += 1;
        } else if result.success {
            self.matted += 1;
            self.opaque_sum += result.opaque_ratio;
        } else {
            self.failed += 1;
        }
    }

    fn total(&self) -> u32 {
        self.matted + self.skipped + self.failed
    }

    /// Mean share of opaque pixels over the matted images.
    #[allow(clippy::cast_precision_loss)]
    fn mean_opaque(&self) -> Option<f32> {
        (self.matted > 0).then(|| self.opaque_sum / self.matted as f32)
    }

    fn summary(&self) -> String {
        let mut line = format!("[Summary] Matted {} of {}", self.matted, self.total());
        if let Some(mean) = self.mean_opaque() {
            line.push_str(&format!(", {:.0}% ink on average", mean * 100.0));
        }
        if self.skipped > 0 {
            line.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            line.push_str(&format!(", {} failed", self.failed));
        }
        line
    }
}

fn report(result: &ProcessResult, opts: &ProcessOptions) {
    let name = result
        .path
        .file_name()
        .map_or_else(|| result.path.display().to_string(), |f| f.to_string_lossy().into_owned());

    match (result.success, result.skipped) {
        (_, true) if !opts.quiet => eprintln!("[SKIP] {name}: {}", result.message),
        (true, false) if !opts.quiet => {
            let target = result
                .output
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            eprintln!(
                "[OK] {name} -> {target} ({:.0}% opaque)",
                result.opaque_ratio * 100.0
            );
        }
        (false, false) => eprintln!("[FAIL] {name}: {}", result.message),
        _ => return,
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
