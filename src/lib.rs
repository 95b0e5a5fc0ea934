//! # code2pdf
//!
//! Converts a directory of source code into a single paginated PDF.
//!
//! ## Features
//!
//! - `.gitignore` and `.code2pdf.ignore` filtering with provenance reporting
//! - Text/binary detection from an 8 KB content sample
//! - Title page, table of contents, and per-file pages with running footers
//! - Optional line numbers, portrait or landscape A4 output
//!
//! ## Quick Start
//!
//! ```no_run
//! use code2pdf::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("./src")
//!     .output_path("src.pdf")
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?.print_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Filter**: evaluates ignore patterns, first match wins
//! 2. **Scanner**: walks the tree, classifies files, collects text
//! 3. **Writer**: lays out and writes the PDF

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

mod config;
mod error;
mod file;
mod filter;
mod pipeline;
mod scanner;
mod writer;

pub use config::{Config, ConfigBuilder, FontFamily};
pub use error::{Error, Result};
pub use file::{
    format_size, is_text_file, is_text_sample, read_text_file, FileEntry, LanguageMap,
    FALLBACK_LANGUAGE, SAMPLE_SIZE,
};
pub use filter::{
    load_patterns, IgnoreMatch, IgnorePattern, IgnoreRules, Provenance, GITIGNORE_FILE,
    TOOL_IGNORE_FILE,
};
pub use pipeline::{Pipeline, PipelineStats};
pub use scanner::{RunStats, ScanOutput, Scanner};
pub use writer::{PdfWriter, RenderConfig};

/// Runs the complete conversion with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - A directory under the root cannot be read
/// - The output document cannot be written
///
/// # Examples
///
/// ```no_run
/// use code2pdf::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .root_dir(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
