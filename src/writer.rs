//! PDF rendering of collected files.
//!
//! Layout is done in millimetres from the top-left corner of an A4 page and
//! converted to PDF points when text is placed. Only the base-14 Type1 fonts
//! are used, so no font data is embedded.

use crate::{
    config::{Config, FontFamily},
    error::{Error, Result},
    file::FileEntry,
};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const MM_TO_PT: f32 = 72.0 / 25.4;

const A4_SHORT_MM: f32 = 210.0;
const A4_LONG_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const AUTO_BREAK_MARGIN_MM: f32 = 20.0;

const LINE_HEIGHT_MM: f32 = 5.0;
const HEADER_HEIGHT_MM: f32 = 10.0;
const LINE_NUMBER_WIDTH_MM: f32 = 20.0;

// Content pages break once the cursor passes these offsets.
const PORTRAIT_BREAK_MM: f32 = 270.0;
const LANDSCAPE_BREAK_MM: f32 = 170.0;

const TITLE_FONT_SIZE: f32 = 24.0;
const TOC_FONT_SIZE: f32 = 12.0;
const FOOTER_FONT_SIZE: f32 = 8.0;
const FOOTER_OFFSET_MM: f32 = 15.0;
const FOOTER_FONT: &str = "Courier-Oblique";
const COURIER_ADVANCE: f32 = 0.6;

const TAB_WIDTH: usize = 4;
const TOC_SECTION: &str = "Table of Contents";

const FONT_REGULAR: Name<'static> = Name(b"F1");
const FONT_BOLD: Name<'static> = Name(b"F2");
const FONT_FOOTER: Name<'static> = Name(b"F3");

/// Settings that control document layout.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Document title, also prefixed to every file path
    pub title: String,

    /// Body font family
    pub font: FontFamily,

    /// Body font size in points
    pub font_size: f32,

    /// Prefix content lines with line numbers
    pub line_numbers: bool,

    /// Landscape or portrait pages
    pub landscape: bool,

    /// Destination file
    pub output_path: PathBuf,
}

impl RenderConfig {
    /// Derives render settings from the run configuration.
    #[must_use]
    pub fn new(config: &Config, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            font: config.font,
            font_size: config.font_size,
            line_numbers: config.line_numbers,
            landscape: config.landscape,
            output_path: config.output_path.clone(),
        }
    }

    const fn break_threshold(&self) -> f32 {
        if self.landscape {
            LANDSCAPE_BREAK_MM
        } else {
            PORTRAIT_BREAK_MM
        }
    }
}

struct Page {
    content: Content,
    section: String,
}

/// Page sequence under construction with a vertical cursor.
struct Layout {
    width: f32,
    height: f32,
    y: f32,
    pages: Vec<Page>,
}

impl Layout {
    fn new(landscape: bool) -> Self {
        let (width, height) = if landscape {
            (A4_LONG_MM, A4_SHORT_MM)
        } else {
            (A4_SHORT_MM, A4_LONG_MM)
        };

        Self {
            width,
            height,
            y: MARGIN_MM,
            pages: Vec::new(),
        }
    }

    /// Starts a new page whose footer names `section`.
    fn add_page(&mut self, section: impl Into<String>) {
        self.pages.push(Page {
            content: Content::new(),
            section: section.into(),
        });
        self.y = MARGIN_MM;
    }

    /// Starts a new page if a row of `height` would run into the bottom margin.
    fn ensure_room(&mut self, height: f32, section: &str) {
        if self.y + height > self.height - AUTO_BREAK_MARGIN_MM {
            self.add_page(section);
        }
    }

    /// Places one line of text in a row of `height` starting at the cursor.
    fn cell(&mut self, x: f32, height: f32, font: Name<'_>, size: f32, text: &str) {
        let baseline = self.y + height / 2.0 + 0.3 * size / MM_TO_PT;
        let page_height = self.height;

        if let Some(page) = self.pages.last_mut() {
            show_text(&mut page.content, font, size, x, page_height - baseline, text);
        }
    }

    fn ln(&mut self, height: f32) {
        self.y += height;
    }

    /// Serializes the pages, drawing the running footer on each.
    fn into_pdf(self, config: &RenderConfig) -> Vec<u8> {
        let mut next_id = 1;
        let mut alloc = || {
            let id = Ref::new(next_id);
            next_id += 1;
            id
        };

        let catalog_id = alloc();
        let tree_id = alloc();
        let info_id = alloc();
        let regular_id = alloc();
        let bold_id = alloc();
        let footer_id = alloc();
        let page_ids: Vec<(Ref, Ref)> = self.pages.iter().map(|_| (alloc(), alloc())).collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids(page_ids.iter().map(|&(page_id, _)| page_id))
            .count(i32::try_from(page_ids.len()).unwrap_or(i32::MAX));

        let media_box = Rect::new(0.0, 0.0, self.width * MM_TO_PT, self.height * MM_TO_PT);
        // Footer row starts FOOTER_OFFSET_MM above the bottom edge.
        let footer_baseline =
            FOOTER_OFFSET_MM - HEADER_HEIGHT_MM / 2.0 - 0.3 * FOOTER_FONT_SIZE / MM_TO_PT;

        for (index, (page, &(page_id, content_id))) in
            self.pages.into_iter().zip(&page_ids).enumerate()
        {
            let mut writer = pdf.page(page_id);
            writer
                .media_box(media_box)
                .parent(tree_id)
                .contents(content_id);
            writer
                .resources()
                .fonts()
                .pair(FONT_REGULAR, regular_id)
                .pair(FONT_BOLD, bold_id)
                .pair(FONT_FOOTER, footer_id);
            writer.finish();

            let footer = format!("{}   -   [{}]", page.section, index + 1);
            let footer_width =
                footer.chars().count() as f32 * COURIER_ADVANCE * FOOTER_FONT_SIZE / MM_TO_PT;
            let footer_x = self.width - MARGIN_MM - footer_width;

            let mut content = page.content;
            show_text(
                &mut content,
                FONT_FOOTER,
                FOOTER_FONT_SIZE,
                footer_x,
                footer_baseline,
                &footer,
            );
            pdf.stream(content_id, &content.finish());
        }

        for (id, base_font) in [
            (regular_id, config.font.regular()),
            (bold_id, config.font.bold()),
            (footer_id, FOOTER_FONT),
        ] {
            pdf.type1_font(id)
                .base_font(Name(base_font.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        pdf.document_info(info_id)
            .title(TextStr(&config.title))
            .creator(TextStr("code2pdf"));

        pdf.finish()
    }
}

/// Writes `text` with its baseline at (`x`, `y`), both in millimetres from the
/// bottom-left corner.
fn show_text(content: &mut Content, font: Name<'_>, size: f32, x: f32, y: f32, text: &str) {
    content
        .begin_text()
        .set_font(font, size)
        .next_line(x * MM_TO_PT, y * MM_TO_PT)
        .show(Str(&encode_win_ansi(text)))
        .end_text();
}

/// Maps text onto WinAnsi bytes; characters outside Latin-1 become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7E | 0xA0..=0xFF => u32::from(c) as u8,
            0x00..=0x1F => b' ',
            _ => b'?',
        })
        .collect()
}

fn expand_tabs(line: &str) -> String {
    line.replace('\t', &" ".repeat(TAB_WIDTH))
}

/// Renders collected files into a PDF document.
pub struct PdfWriter {
    config: RenderConfig,
}

impl PdfWriter {
    /// Creates a writer with the given layout settings.
    #[must_use]
    pub const fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Renders the document and writes it to the configured output path.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created or written.
    pub fn write(&self, files: &[FileEntry]) -> Result<()> {
        let bytes = self.render(files);
        let path = &self.config.output_path;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        write_file_atomic(path, &bytes)?;

        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Renders the document to PDF bytes.
    #[must_use]
    pub fn render(&self, files: &[FileEntry]) -> Vec<u8> {
        self.layout(files).into_pdf(&self.config)
    }

    fn layout(&self, files: &[FileEntry]) -> Layout {
        let config = &self.config;
        let mut layout = Layout::new(config.landscape);

        layout.add_page(TOC_SECTION);
        layout.cell(MARGIN_MM, HEADER_HEIGHT_MM, FONT_BOLD, TITLE_FONT_SIZE, &config.title);
        layout.ln(20.0);

        layout.cell(
            MARGIN_MM,
            HEADER_HEIGHT_MM,
            FONT_BOLD,
            TOC_FONT_SIZE,
            "Table of Contents:",
        );
        layout.ln(HEADER_HEIGHT_MM);

        for (index, file) in files.iter().enumerate() {
            layout.ensure_room(LINE_HEIGHT_MM, TOC_SECTION);
            let line = format!(
                "{}. {}/{} ({}, Last Modified: {})",
                index + 1,
                config.title,
                file.relative_path,
                file.size_display(),
                file.modified_display()
            );
            layout.cell(MARGIN_MM, LINE_HEIGHT_MM, FONT_REGULAR, TOC_FONT_SIZE, &line);
            layout.ln(LINE_HEIGHT_MM);
        }

        for file in files {
            self.layout_file(&mut layout, file);
        }

        debug!("Laid out {} files on {} pages", files.len(), layout.pages.len());
        layout
    }

    fn layout_file(&self, layout: &mut Layout, file: &FileEntry) {
        let config = &self.config;
        let heading = format!("{}/{}", config.title, file.relative_path);
        let header_size = config.font_size + 2.0;
        let threshold = config.break_threshold();

        info!(
            "Importing {} ({}, Last Modified: {})",
            file.relative_path,
            file.size_display(),
            file.modified_display()
        );

        let mut page_in_file = 1;
        layout.add_page(format!("{heading} page {page_in_file}"));
        layout.cell(
            MARGIN_MM,
            HEADER_HEIGHT_MM,
            FONT_BOLD,
            header_size,
            &format!(
                "{heading} ({}, Last Modified: {})",
                file.size_display(),
                file.modified_display()
            ),
        );
        layout.ln(HEADER_HEIGHT_MM);

        for (index, line) in file.content.split('\n').enumerate() {
            let mut x = MARGIN_MM;
            if config.line_numbers {
                let number = format!("{:4} | ", index + 1);
                layout.cell(x, LINE_HEIGHT_MM, FONT_REGULAR, config.font_size, &number);
                x += LINE_NUMBER_WIDTH_MM;
            }

            let line = expand_tabs(line.strip_suffix('\r').unwrap_or(line));
            layout.cell(x, LINE_HEIGHT_MM, FONT_REGULAR, config.font_size, &line);
            layout.ln(LINE_HEIGHT_MM);

            if layout.y > threshold {
                page_in_file += 1;
                layout.add_page(format!("{heading} page {page_in_file}"));
                layout.cell(
                    MARGIN_MM,
                    HEADER_HEIGHT_MM,
                    FONT_BOLD,
                    header_size,
                    &format!("{heading} (continued)"),
                );
                layout.ln(HEADER_HEIGHT_MM);
            }
        }
    }
}

/// Writes a file via a temporary sibling and a rename, so an interrupted run
/// never leaves a truncated document at `path`.
///
/// The temporary file is created exclusively and removed again if any step
/// fails.
fn write_file_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(path);
    let mut temp_file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all())
        .map_err(|e| Error::io(&temp_path, e));

    drop(temp_file);

    let result =
        written.and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::io(path, e)));

    if result.is_err() {
        if let Err(e) = fs::remove_file(&temp_path) {
            debug!("Could not remove {}: {}", temp_path.display(), e);
        }
    }

    result
}

/// Hidden sibling of `path` named after the output file and the process.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
