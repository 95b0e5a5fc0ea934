//! Text/binary classification and per-file metadata.

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Number of leading bytes inspected when deciding between text and binary.
pub const SAMPLE_SIZE: usize = 8192;

const NULL_BYTE_THRESHOLD: f64 = 0.01;
const PRINTABLE_THRESHOLD: f64 = 0.70;

/// Label given to text files whose extension has no known language.
pub const FALLBACK_LANGUAGE: &str = "Text";

const MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static LANGUAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("go", "Go"),
        ("py", "Python"),
        ("rs", "Rust"),
        ("js", "JavaScript"),
        ("ts", "TypeScript"),
        ("html", "HTML"),
        ("css", "CSS"),
        ("java", "Java"),
        ("c", "C"),
        ("cpp", "C++"),
        ("h", "C/C++ Header"),
        ("rb", "Ruby"),
        ("php", "PHP"),
        ("sh", "Shell"),
        ("md", "Markdown"),
        ("json", "JSON"),
        ("xml", "XML"),
        ("yml", "YAML"),
        ("yaml", "YAML"),
        ("toml", "TOML"),
        ("sql", "SQL"),
        ("txt", "Text"),
    ]
    .into_iter()
    .collect()
});

/// A text file accepted for the output document.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the scanned root, `/`-separated
    pub relative_path: String,

    /// Full file content
    pub content: String,

    /// Size on disk in bytes
    pub size: u64,

    /// Last modification time
    pub modified: DateTime<Local>,

    /// Language label derived from the extension
    pub language: &'static str,
}

impl FileEntry {
    /// Human-readable size, e.g. `512 B` or `2.00 KB`.
    #[must_use]
    pub fn size_display(&self) -> String {
        format_size(self.size)
    }

    /// Modification time as `YYYY-MM-DD HH:MM:SS` in local time.
    #[must_use]
    pub fn modified_display(&self) -> String {
        self.modified.format(MODIFIED_FORMAT).to_string()
    }

    /// Returns the number of lines in the content.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Resolves extensions to language labels for a single run.
///
/// Known extensions come from a fixed table; anything else is remembered as
/// [`FALLBACK_LANGUAGE`] the first time it is seen.
#[derive(Debug, Default)]
pub struct LanguageMap {
    discovered: HashMap<String, &'static str>,
}

impl LanguageMap {
    /// Creates an empty per-run map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the language label for `path`, keyed on its lower-cased extension.
    pub fn label_for(&mut self, path: &Path) -> &'static str {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if let Some(&label) = LANGUAGES.get(ext.as_str()) {
            return label;
        }

        *self.discovered.entry(ext).or_insert(FALLBACK_LANGUAGE)
    }

    /// Extensions that were not in the fixed table but were seen this run.
    #[must_use]
    pub fn discovered(&self) -> usize {
        self.discovered.len()
    }
}

/// Decides whether `sample` (a complete file) is text.
#[must_use]
pub fn is_text_sample(sample: &[u8]) -> bool {
    sample_is_text(sample, false)
}

/// Text heuristic over a byte sample.
///
/// `truncated` is set when the sample stopped at the window boundary rather
/// than at end of file; a multi-byte sequence cut by the boundary is then not
/// counted as invalid.
fn sample_is_text(sample: &[u8], truncated: bool) -> bool {
    if sample.is_empty() {
        return true;
    }

    let len = sample.len() as f64;

    let nulls = memchr::memchr_iter(0, sample).count();
    if nulls as f64 / len > NULL_BYTE_THRESHOLD {
        return false;
    }

    if let Err(e) = std::str::from_utf8(sample) {
        if e.error_len().is_some() || !truncated {
            return false;
        }
    }

    let printable = sample
        .iter()
        .filter(|&&b| matches!(b, b' '..=b'~' | b'\t' | b'\n' | b'\r'))
        .count();

    printable as f64 / len >= PRINTABLE_THRESHOLD
}

/// Classifies a file by its first [`SAMPLE_SIZE`] bytes.
///
/// Unreadable files are reported as binary.
#[must_use]
pub fn is_text_file(path: &Path) -> bool {
    File::open(path)
        .and_then(|mut file| read_sample(&mut file))
        .is_ok_and(|(sample, truncated)| sample_is_text(&sample, truncated))
}

/// Classifies a file and, if it is text, returns its full content.
///
/// The sample and the content are read through the same handle.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_text_file(path: &Path) -> Result<Option<String>> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;

    let (sample, truncated) = read_sample(&mut file).map_err(|e| Error::io(path, e))?;
    if !sample_is_text(&sample, truncated) {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(0))
        .map_err(|e| Error::io(path, e))?;
    let mut bytes = Vec::with_capacity(sample.len());
    file.read_to_end(&mut bytes)
        .map_err(|e| Error::io(path, e))?;

    let content = String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());

    Ok(Some(content))
}

/// Reads up to [`SAMPLE_SIZE`] bytes; the flag is true if more bytes follow.
fn read_sample(file: &mut File) -> std::io::Result<(Vec<u8>, bool)> {
    let mut sample = Vec::with_capacity(SAMPLE_SIZE + 1);
    file.by_ref().take(SAMPLE_SIZE as u64 + 1).read_to_end(&mut sample)?;

    let truncated = sample.len() > SAMPLE_SIZE;
    sample.truncate(SAMPLE_SIZE);
    Ok((sample, truncated))
}

/// Formats a byte count with binary prefixes: `512 B`, `2.00 KB`, `1.50 MB`.
#[must_use]
pub fn format_size(size: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if size < UNIT {
        return format!("{size} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.2} {}B", size as f64 / div as f64, PREFIXES[exp])
}
