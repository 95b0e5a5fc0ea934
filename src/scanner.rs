//! Directory walk that applies ignore rules and collects text files.

use crate::{
    config::Config,
    error::Result,
    file::{read_text_file, FileEntry, LanguageMap},
    filter::{IgnoreRules, GITIGNORE_FILE, TOOL_IGNORE_FILE},
};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Counters collected while scanning.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// Files accepted into the document
    pub included: usize,

    /// Files and directories excluded by ignore rules or classification
    pub ignored: usize,

    /// Included files per language label
    pub languages: BTreeMap<String, usize>,
}

impl RunStats {
    fn record_included(&mut self, language: &str) {
        self.included += 1;
        *self.languages.entry(language.to_string()).or_default() += 1;
    }

    /// The `n` most frequent language labels, most frequent first.
    ///
    /// Ties are broken alphabetically so the order is stable.
    #[must_use]
    pub fn top_languages(&self, n: usize) -> Vec<(&str, usize)> {
        let mut counts: Vec<_> = self
            .languages
            .iter()
            .map(|(label, &count)| (label.as_str(), count))
            .collect();

        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts.truncate(n);
        counts
    }
}

/// Result of a scan: included files in walk order plus statistics.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Included files, in depth-first, name-sorted walk order
    pub files: Vec<FileEntry>,

    /// Counters for the run
    pub stats: RunStats,
}

/// Walks the root directory, applies ignore rules, and collects text files.
pub struct Scanner {
    root_dir: PathBuf,
    rules: IgnoreRules,
    languages: LanguageMap,
}

impl Scanner {
    /// Creates a scanner, loading ignore files from the configured root.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let rules = IgnoreRules::load(&config.root_dir);

        for source in [GITIGNORE_FILE, TOOL_IGNORE_FILE] {
            if rules.pattern_count(source) > 0 {
                info!("Respecting {} for file filtering", source);
            }
        }
        if rules.is_default_only() {
            info!("No ignore files found - processing all text files");
        }

        Self::with_rules(&config.root_dir, rules)
    }

    /// Creates a scanner with an explicit rule set.
    #[must_use]
    pub fn with_rules(root_dir: impl Into<PathBuf>, rules: IgnoreRules) -> Self {
        Self {
            root_dir: root_dir.into(),
            rules,
            languages: LanguageMap::new(),
        }
    }

    /// Scans the root directory.
    ///
    /// Directories matched by an ignore rule are not descended into and count
    /// once towards [`RunStats::ignored`]. Files that are ignored, binary or
    /// unreadable also count as ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory walk itself fails, e.g. a directory
    /// cannot be listed.
    pub fn scan(&mut self) -> Result<ScanOutput> {
        let mut files = Vec::new();
        let mut stats = RunStats::default();

        debug!("Starting scan of {}", self.root_dir.display());

        let mut walker = WalkDir::new(&self.root_dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            let relative_path = self.relative_path(entry.path());
            let is_dir = entry.file_type().is_dir();

            if let Some(hit) = self.rules.check(&relative_path) {
                stats.ignored += 1;
                if is_dir {
                    info!(
                        "Ignoring directory {} [{}: {}]",
                        relative_path, hit.provenance, hit.rule
                    );
                    walker.skip_current_dir();
                } else {
                    info!("Ignoring {} [{}: {}]", relative_path, hit.provenance, hit.rule);
                }
                continue;
            }

            if is_dir {
                continue;
            }

            match self.collect_file(&entry, relative_path) {
                Some(file) => {
                    stats.record_included(file.language);
                    files.push(file);
                }
                None => stats.ignored += 1,
            }
        }

        debug!(
            "Scan complete: {} included, {} ignored, {} unrecognized extensions",
            stats.included,
            stats.ignored,
            self.languages.discovered()
        );

        Ok(ScanOutput { files, stats })
    }

    /// Classifies and reads a single candidate file.
    fn collect_file(&mut self, entry: &DirEntry, relative_path: String) -> Option<FileEntry> {
        let path = entry.path();

        trace!("Processing file: {}", relative_path);

        let content = match read_text_file(path) {
            Ok(Some(content)) => content,
            Ok(None) => {
                info!("Skipping non-text file: {}", relative_path);
                return None;
            }
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", relative_path, e);
                return None;
            }
        };

        // Follows symlinks so size and mtime describe the content that was read.
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping {}: {}", relative_path, e);
                return None;
            }
        };

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Some(FileEntry {
            language: self.languages.label_for(path),
            relative_path,
            content,
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
        })
    }

    /// Root-relative, `/`-separated form of `path`.
    fn relative_path(&self, path: &Path) -> String {
        let relative = pathdiff::diff_paths(path, &self.root_dir)
            .unwrap_or_else(|| path.to_path_buf());

        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::format_size;
    use assert_fs::prelude::*;

    fn scan(root: &Path) -> ScanOutput {
        let config = Config::builder().root_dir(root).build().unwrap();
        Scanner::new(&config).scan().unwrap()
    }

    fn paths(output: &ScanOutput) -> Vec<&str> {
        output
            .files
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect()
    }

    #[test]
    fn test_text_binary_and_vcs_dir() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.go").write_str("package main\n").unwrap();
        temp.child("a.bin").write_binary(&[b'x', 0, b'y']).unwrap();
        temp.child(".git/config").write_str("[core]\n").unwrap();

        let output = scan(temp.path());

        assert_eq!(paths(&output), vec!["a.go"]);
        assert_eq!(output.stats.included, 1);
        assert!(output.stats.ignored >= 2);
        assert_eq!(output.files[0].language, "Go");
        assert_eq!(output.files[0].content, "package main\n");
        assert_eq!(output.files[0].size, 13);
    }

    #[test]
    fn test_ignored_directory_counts_once() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("target/\n").unwrap();
        temp.child("target/debug/a.o").write_str("obj").unwrap();
        temp.child("target/debug/b.o").write_str("obj").unwrap();
        temp.child("target/release/c.o").write_str("obj").unwrap();
        temp.child("src/main.rs").write_str("fn main() {}").unwrap();

        let output = scan(temp.path());

        assert_eq!(paths(&output), vec![".gitignore", "src/main.rs"]);
        assert_eq!(output.stats.ignored, 1);
    }

    #[test]
    fn test_ignored_files_are_counted() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("*.log\n").unwrap();
        temp.child(".code2pdf.ignore").write_str(".gitignore\n.code2pdf.ignore\n").unwrap();
        temp.child("app.log").write_str("log").unwrap();
        temp.child("logs/old.log").write_str("log").unwrap();
        temp.child("lib.py").write_str("print('hi')\n").unwrap();

        let output = scan(temp.path());

        assert_eq!(paths(&output), vec!["lib.py"]);
        assert_eq!(output.stats.ignored, 4);
    }

    #[test]
    fn test_walk_order_is_depth_first_and_sorted() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("b.rs").write_str("b").unwrap();
        temp.child("a/z.rs").write_str("z").unwrap();
        temp.child("a/b/c.rs").write_str("c").unwrap();
        temp.child("c.md").write_str("c").unwrap();

        let output = scan(temp.path());

        assert_eq!(paths(&output), vec!["a/b/c.rs", "a/z.rs", "b.rs", "c.md"]);
    }

    #[test]
    fn test_language_tally() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("one.rs").write_str("1").unwrap();
        temp.child("two.rs").write_str("2").unwrap();
        temp.child("three.RS").write_str("3").unwrap();
        temp.child("Makefile").write_str("all:\n").unwrap();
        temp.child("notes.txt").write_str("n").unwrap();
        temp.child("app.go").write_str("package app").unwrap();

        let output = scan(temp.path());

        assert_eq!(output.stats.included, 6);
        assert_eq!(output.stats.languages["Rust"], 3);
        assert_eq!(output.stats.languages["Text"], 2);
        assert_eq!(
            output.stats.top_languages(2),
            vec![("Rust", 3), ("Text", 2)]
        );
    }

    #[test]
    fn test_empty_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = scan(temp.path());

        assert!(output.files.is_empty());
        assert_eq!(output.stats, RunStats::default());
    }

    #[test]
    fn test_with_rules_uses_given_rules_only() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("*.rs\n").unwrap();
        temp.child("main.rs").write_str("fn main() {}").unwrap();

        let rules = IgnoreRules::new().with_patterns(TOOL_IGNORE_FILE, [".gitignore"]);
        let output = Scanner::with_rules(temp.path(), rules).scan().unwrap();

        assert_eq!(paths(&output), vec!["main.rs"]);
    }

    #[test]
    fn test_top_languages_ordering() {
        let mut stats = RunStats::default();
        for label in ["Go", "Rust", "Rust", "C", "Go", "YAML", "JSON", "TOML"] {
            stats.record_included(label);
        }

        let top = stats.top_languages(5);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0], ("Go", 2));
        assert_eq!(top[1], ("Rust", 2));
        assert_eq!(top[2], ("C", 1));
        assert_eq!(top[3], ("JSON", 1));
    }

    #[test]
    fn test_missing_root_is_walk_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let missing = temp.path().join("missing");

        let result = Scanner::with_rules(&missing, IgnoreRules::new()).scan();

        assert!(result.unwrap_err().is_walk());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_aborts() {
        use std::os::unix::fs::PermissionsExt;

        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("locked/secret.rs").write_str("x").unwrap();
        let locked = temp.child("locked");
        fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not restrict root.
        if fs::read_dir(locked.path()).is_ok() {
            fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o755)).unwrap();
            eprintln!("skipping test_unreadable_directory_aborts: directory is still listable");
            return;
        }

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let result = Scanner::new(&config).scan();

        fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.unwrap_err().is_walk());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_reports_target_metadata() {
        use std::os::unix::fs::symlink;

        let outside = assert_fs::TempDir::new().unwrap();
        let target = outside.child("long.rs");
        let content = "// padding line for the listing\n".repeat(120);
        target.write_str(&content).unwrap();

        let temp = assert_fs::TempDir::new().unwrap();
        symlink(target.path(), temp.path().join("link.rs")).unwrap();

        let output = scan(temp.path());

        assert_eq!(paths(&output), vec!["link.rs"]);
        let file = &output.files[0];
        assert_eq!(file.content, content);
        assert_eq!(file.size, content.len() as u64);
        assert_eq!(file.size_display(), format_size(content.len() as u64));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entries_are_skipped() {
        use std::os::unix::fs::symlink;

        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.rs").write_str("fn main() {}\n").unwrap();
        temp.child("real/lib.rs").write_str("pub fn f() {}\n").unwrap();
        symlink(temp.path().join("gone.rs"), temp.path().join("dangling.rs")).unwrap();
        symlink(temp.path().join("real"), temp.path().join("dir_link")).unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let output = Scanner::new(&config).scan().unwrap();

        assert_eq!(paths(&output), vec!["main.rs", "real/lib.rs"]);
        assert_eq!(output.stats.included, 2);
        assert_eq!(output.stats.ignored, 2);
    }
}
