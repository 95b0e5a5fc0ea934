use anyhow::Context;
use clap::Parser;
use code2pdf::{Config, FontFamily, Pipeline};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "code2pdf",
    version,
    about = "Convert code directories to PDF documents",
    long_about = "Convert a directory of source code into a single PDF document.\n\n\
    The document has a title page, a table of contents, and one section per file. \
    Binary files are skipped automatically.\n\n\
    File filtering respects .gitignore and .code2pdf.ignore files in the root directory; \
    the .git directory is always skipped.\n\n\
    USAGE EXAMPLES:\n  \
      # Convert the current directory to code.pdf\n  \
      code2pdf\n\n  \
      # Portrait pages with line numbers\n  \
      code2pdf --portrait --line-numbers -o listing.pdf\n\n  \
      # Convert another project in Times, 9pt\n  \
      code2pdf --dir ../project --font times --font-size 9"
)]
struct Cli {
    /// Root directory to convert
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    dir: PathBuf,

    /// Output PDF file name
    #[arg(short, long, default_value = "code.pdf", value_name = "FILE")]
    output: PathBuf,

    /// Font for code
    #[arg(long, value_enum, default_value = "courier")]
    font: CliFont,

    /// Font size for code
    #[arg(long, default_value_t = 7.0, value_name = "POINTS")]
    font_size: f32,

    /// Include line numbers in the PDF
    #[arg(long)]
    line_numbers: bool,

    /// Use portrait orientation instead of landscape
    #[arg(long)]
    portrait: bool,

    /// List what would be included without writing the PDF
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFont {
    Courier,
    Helvetica,
    Times,
}

impl From<CliFont> for FontFamily {
    fn from(f: CliFont) -> Self {
        match f {
            CliFont::Courier => Self::Courier,
            CliFont::Helvetica => Self::Helvetica,
            CliFont::Times => Self::Times,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config = Config::builder()
        .root_dir(cli.dir)
        .output_path(cli.output)
        .font(cli.font.into())
        .font_size(cli.font_size)
        .line_numbers(cli.line_numbers)
        .landscape(!cli.portrait)
        .dry_run(cli.dry_run)
        .build()
        .context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Error creating PDF")?;

    stats.print_summary();

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("code2pdf=info"),
        1 => EnvFilter::new("code2pdf=debug"),
        _ => EnvFilter::new("code2pdf=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
