use crate::{
    config::Config,
    error::Result,
    scanner::{RunStats, Scanner},
    writer::{PdfWriter, RenderConfig},
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

const TOP_LANGUAGES: usize = 5;
const UNKNOWN_TITLE: &str = "???";

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Included and ignored counters plus the language tally
    pub run: RunStats,

    /// The written document, or `None` if nothing was written
    pub output: Option<PathBuf>,

    /// Time spent scanning
    pub scan_duration: Duration,

    /// Time spent rendering and writing
    pub render_duration: Duration,
}

impl PipelineStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        match &self.output {
            Some(path) => println!("\nPDF created successfully: {}", path.display()),
            None if self.run.included == 0 => println!("No files found to include in the PDF"),
            None => println!("\nDry run: no PDF written"),
        }

        println!(
            "Statistics: {} files included, {} files/directories ignored",
            self.run.included, self.run.ignored
        );

        let top = self.run.top_languages(TOP_LANGUAGES);
        if !top.is_empty() {
            println!("Top file types included:");
            for (label, count) in top {
                println!("  {label}: {count} files");
            }
        }

        println!("Completed in {:.2}s", self.duration().as_secs_f64());
    }

    /// Total time spent in the pipeline.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.scan_duration + self.render_duration
    }
}

/// Scans the root directory and renders the collected files.
pub struct Pipeline {
    config: Config,
    scanner: Scanner,
    writer: PdfWriter,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// Ignore files are loaded from the root directory at this point.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config);
        let title = document_title(&config.root_dir);
        let writer = PdfWriter::new(RenderConfig::new(&config, title));

        Ok(Self {
            config,
            scanner,
            writer,
        })
    }

    /// Executes the pipeline and returns statistics.
    ///
    /// An empty result is not an error: no document is written and
    /// [`PipelineStats::output`] is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory walk fails or the document cannot be
    /// written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use code2pdf::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .root_dir("./src")
    ///     .output_path("src.pdf")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(mut self) -> Result<PipelineStats> {
        let scan_start = Instant::now();
        let scan = self.scanner.scan()?;
        let scan_duration = scan_start.elapsed();

        info!(
            "Collected {} files ({} ignored) in {:.2}s",
            scan.stats.included,
            scan.stats.ignored,
            scan_duration.as_secs_f64()
        );

        let render_start = Instant::now();
        let output = if scan.files.is_empty() {
            warn!("No files found to include in the PDF");
            None
        } else if self.config.dry_run {
            warn!("Dry run mode enabled - skipping PDF output");
            for file in &scan.files {
                info!(
                    "Would include {} ({}, {} lines)",
                    file.relative_path,
                    file.size_display(),
                    file.line_count()
                );
            }
            None
        } else {
            self.writer.write(&scan.files)?;
            Some(self.config.output_path.clone())
        };

        Ok(PipelineStats {
            run: scan.stats,
            output,
            scan_duration,
            render_duration: render_start.elapsed(),
        })
    }
}

/// Base name of the root directory, used as the document title.
fn document_title(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn create_test_config(root: &Path) -> Config {
        Config::builder()
            .root_dir(root)
            .output_path(root.join("out/code.pdf"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline_basic_execution() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.go").write_str("package main\n").unwrap();
        temp.child("a.bin").write_binary(&[1, 0, 2]).unwrap();
        temp.child(".git/config").write_str("[core]\n").unwrap();

        let config = create_test_config(temp.path());
        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.run.included, 1);
        assert!(stats.run.ignored >= 2);
        assert_eq!(stats.output, Some(temp.path().join("out/code.pdf")));
        assert!(temp.child("out/code.pdf").exists());
    }

    #[test]
    fn test_pipeline_dry_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("file.rs").write_str("fn main() {}").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .output_path(temp.path().join("code.pdf"))
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.run.included, 1);
        assert!(stats.output.is_none());
        assert!(!temp.child("code.pdf").exists());
        assert_eq!(stats.duration(), stats.scan_duration + stats.render_duration);
    }

    #[test]
    fn test_pipeline_nothing_to_do() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("blob.bin").write_binary(&[0u8; 32]).unwrap();

        let config = create_test_config(temp.path());
        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.run.included, 0);
        assert_eq!(stats.run.ignored, 1);
        assert!(stats.output.is_none());
        assert!(!temp.child("out").exists());
    }

    #[test]
    fn test_document_title() {
        let temp = assert_fs::TempDir::new().unwrap();
        let project = temp.child("my-project");
        project.create_dir_all().unwrap();

        assert_eq!(document_title(project.path()), "my-project");
        assert_eq!(document_title(&temp.path().join("missing")), UNKNOWN_TITLE);
    }
}
