use crate::error::{Error, Result};
use std::path::PathBuf;

const DEFAULT_OUTPUT_FILE: &str = "code.pdf";
const DEFAULT_FONT_SIZE: f32 = 7.0;
const MAX_FONT_SIZE: f32 = 72.0;

/// Base-14 font family used for the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    /// Monospaced Courier
    #[default]
    Courier,
    /// Proportional sans-serif Helvetica
    Helvetica,
    /// Proportional serif Times
    Times,
}

impl FontFamily {
    /// PostScript name of the regular face.
    #[must_use]
    pub const fn regular(self) -> &'static str {
        match self {
            Self::Courier => "Courier",
            Self::Helvetica => "Helvetica",
            Self::Times => "Times-Roman",
        }
    }

    /// PostScript name of the bold face.
    #[must_use]
    pub const fn bold(self) -> &'static str {
        match self {
            Self::Courier => "Courier-Bold",
            Self::Helvetica => "Helvetica-Bold",
            Self::Times => "Times-Bold",
        }
    }
}

/// Configuration for a code2pdf run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Root directory to convert; ignore files are read from here
    pub root_dir: PathBuf,

    /// Path of the PDF to write
    pub output_path: PathBuf,

    /// Body font family
    pub font: FontFamily,

    /// Body font size in points
    pub font_size: f32,

    /// Prefix every content line with its line number
    pub line_numbers: bool,

    /// Landscape (`true`) or portrait A4 pages
    pub landscape: bool,

    /// Collect and report without writing the document
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use code2pdf::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir(".")
    ///     .output_path("listing.pdf")
    ///     .line_numbers(true)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or is not a directory
    /// - Font size is not in `(0, 72]`
    /// - Output path is empty or names an existing directory
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Root directory does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Root path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        if !(self.font_size > 0.0 && self.font_size <= MAX_FONT_SIZE) {
            return Err(Error::config(format!(
                "font_size must be in (0, {MAX_FONT_SIZE}], got {}",
                self.font_size
            )));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::config("output path must not be empty"));
        }

        if self.output_path.is_dir() {
            return Err(Error::config(format!(
                "Output path is a directory: {}",
                self.output_path.display()
            )));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            font: FontFamily::default(),
            font_size: DEFAULT_FONT_SIZE,
            line_numbers: false,
            landscape: true,
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    output_path: Option<PathBuf>,
    font: Option<FontFamily>,
    font_size: Option<f32>,
    line_numbers: bool,
    landscape: Option<bool>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the root directory to convert.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the output PDF path.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the body font family.
    #[must_use]
    pub fn font(mut self, font: FontFamily) -> Self {
        self.font = Some(font);
        self
    }

    /// Sets the body font size in points.
    #[must_use]
    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Enables or disables line numbers.
    #[must_use]
    pub fn line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    /// Selects landscape (`true`, the default) or portrait pages.
    #[must_use]
    pub fn landscape(mut self, enabled: bool) -> Self {
        self.landscape = Some(enabled);
        self
    }

    /// Enables dry run mode (no document is written).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
            font: self.font.unwrap_or_default(),
            font_size: self.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            line_numbers: self.line_numbers,
            landscape: self.landscape.unwrap_or(true),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}
