//! Ignore-rule evaluation.
//!
//! Patterns come from three places, evaluated in a fixed order: the built-in
//! `.git/` exclusion, the root `.gitignore`, and the root `.code2pdf.ignore`.
//! The first pattern that matches decides, and the match reports which source
//! it came from.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the primary, VCS-style ignore file.
pub const GITIGNORE_FILE: &str = ".gitignore";

/// Name of the tool-specific ignore file, evaluated after [`GITIGNORE_FILE`].
pub const TOOL_IGNORE_FILE: &str = ".code2pdf.ignore";

const VCS_DIR_PATTERN: &str = ".git/";

/// Where an ignore pattern was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Built into the tool (the `.git/` exclusion).
    Default,
    /// Loaded from the named ignore file.
    File(String),
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("(default)"),
            Self::File(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
enum PatternKind {
    /// `!pattern`. Recognized, but re-inclusion is not supported: never matches.
    Negated,
    /// `dir/`, holds the pattern without its trailing slash.
    Directory(String),
    /// Plain text compared against the full path and the final segment.
    Exact,
    /// Contains `*`; anchored regex where `*` matches any sequence.
    Wildcard(Regex),
}

/// A single ignore rule together with the source it came from.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    raw: String,
    provenance: Provenance,
    kind: PatternKind,
}

impl IgnorePattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if a wildcard pattern cannot be compiled into a regex
    /// (only possible for pathologically large patterns).
    pub fn new(raw: impl Into<String>, provenance: Provenance) -> Result<Self> {
        let raw = raw.into();

        let kind = if raw.starts_with('!') {
            PatternKind::Negated
        } else if let Some(dir) = raw.strip_suffix('/') {
            PatternKind::Directory(dir.to_string())
        } else if raw.contains('*') {
            let expr = format!("^{}$", regex::escape(&raw).replace(r"\*", ".*"));
            let regex = Regex::new(&expr).map_err(|e| {
                Error::config(format!("Invalid ignore pattern '{raw}': {e}"))
            })?;
            PatternKind::Wildcard(regex)
        } else {
            PatternKind::Exact
        };

        Ok(Self {
            raw,
            provenance,
            kind,
        })
    }

    /// The pattern text exactly as it appeared in its source.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The source this pattern was loaded from.
    #[must_use]
    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Returns true if this is a `!` pattern.
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        matches!(self.kind, PatternKind::Negated)
    }

    /// Tests the pattern against a root-relative path (`/`-separated) and its
    /// final segment.
    #[must_use]
    pub fn matches(&self, path: &str, name: &str) -> bool {
        match &self.kind {
            PatternKind::Negated => false,
            PatternKind::Directory(dir) => {
                path == dir
                    || path
                        .strip_prefix(dir.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PatternKind::Exact => self.raw == path || self.raw == name,
            PatternKind::Wildcard(regex) => {
                self.raw == path || self.raw == name || regex.is_match(path) || regex.is_match(name)
            }
        }
    }
}

/// The rule that excluded a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreMatch<'a> {
    /// The pattern text that matched
    pub rule: &'a str,

    /// Where that pattern came from
    pub provenance: &'a Provenance,
}

/// Ordered collection of ignore patterns from every source.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    vcs: IgnorePattern,
    patterns: Vec<IgnorePattern>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreRules {
    /// Creates a rule set holding only the built-in `.git/` exclusion.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vcs: IgnorePattern {
                raw: VCS_DIR_PATTERN.to_string(),
                provenance: Provenance::Default,
                kind: PatternKind::Directory(".git".to_string()),
            },
            patterns: Vec::new(),
        }
    }

    /// Loads `.gitignore` then `.code2pdf.ignore` from `root`.
    ///
    /// Missing or unreadable files contribute no patterns.
    #[must_use]
    pub fn load(root: &Path) -> Self {
        [GITIGNORE_FILE, TOOL_IGNORE_FILE]
            .into_iter()
            .fold(Self::new(), |rules, name| {
                let lines = load_patterns(&root.join(name));
                rules.with_patterns(name, lines)
            })
    }

    /// Appends patterns from a named source. Sources added later have lower
    /// precedence than sources added earlier.
    #[must_use]
    pub fn with_patterns<I, S>(mut self, source: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            match IgnorePattern::new(line, Provenance::File(source.to_string())) {
                Ok(pattern) => {
                    if pattern.is_negated() {
                        debug!(
                            "Negation pattern '{}' in {} is not supported and never matches",
                            pattern.raw(),
                            source
                        );
                    }
                    self.patterns.push(pattern);
                }
                Err(e) => warn!("Skipping pattern from {}: {}", source, e),
            }
        }
        self
    }

    /// Number of patterns loaded from `source`.
    #[must_use]
    pub fn pattern_count(&self, source: &str) -> usize {
        self.patterns
            .iter()
            .filter(|p| matches!(p.provenance(), Provenance::File(name) if name == source))
            .count()
    }

    /// Returns true if no ignore file contributed any pattern.
    #[must_use]
    pub fn is_default_only(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the first rule matching `path`, or `None` if the path is kept.
    ///
    /// `path` is relative to the scanned root; a leading `./` is ignored.
    #[must_use]
    pub fn check(&self, path: &str) -> Option<IgnoreMatch<'_>> {
        let path = path.strip_prefix("./").unwrap_or(path);
        let name = path.rsplit('/').next().unwrap_or(path);

        std::iter::once(&self.vcs)
            .chain(&self.patterns)
            .find(|pattern| pattern.matches(path, name))
            .map(|pattern| IgnoreMatch {
                rule: pattern.raw(),
                provenance: pattern.provenance(),
            })
    }
}

/// Reads pattern lines from an ignore file.
///
/// Lines are trimmed; blank lines and `#` comments are dropped. A missing or
/// unreadable file yields no patterns.
#[must_use]
pub fn load_patterns(path: &Path) -> Vec<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No ignore file at {}", path.display());
            return Vec::new();
        }
        Err(e) => {
            warn!("Failed to read ignore file {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn pattern(raw: &str) -> IgnorePattern {
        IgnorePattern::new(raw, Provenance::File(GITIGNORE_FILE.to_string())).unwrap()
    }

    fn matches(raw: &str, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap();
        pattern(raw).matches(path, name)
    }

    #[test]
    fn test_directory_pattern() {
        assert!(matches("build/", "build"));
        assert!(matches("build/", "build/out.o"));
        assert!(matches("build/", "build/nested/deep.o"));
        assert!(!matches("build/", "buildtools/x"));
        assert!(!matches("build/", "src/build/out.o"));
    }

    #[test]
    fn test_exact_pattern() {
        assert!(matches("Cargo.lock", "Cargo.lock"));
        assert!(matches("Cargo.lock", "sub/Cargo.lock"));
        assert!(matches("src/gen.rs", "src/gen.rs"));
        assert!(!matches("src/gen.rs", "other/src/gen.rs"));
        assert!(!matches("gen", "generated.rs"));
    }

    #[test]
    fn test_wildcard_escapes_literals() {
        assert!(matches("*.min.js", "app.min.js"));
        assert!(matches("*.min.js", "sub/app.min.js"));
        assert!(!matches("*.min.js", "app.min.js.map"));
        assert!(!matches("*.min.js", "appxminxjs"));
        assert!(matches("data(1)*", "data(1).csv"));
        assert!(!matches("a+b*", "aab.txt"));
    }

    #[test]
    fn test_wildcard_spans_separators() {
        assert!(matches("src/*.rs", "src/main.rs"));
        assert!(matches("src/*.rs", "src/nested/mod.rs"));
        assert!(!matches("src/*.rs", "lib/main.rs"));
    }

    #[test]
    fn test_negation_never_matches() {
        let negated = pattern("!keep.txt");
        assert!(negated.is_negated());
        assert!(!negated.matches("keep.txt", "keep.txt"));
        assert!(!negated.matches("!keep.txt", "!keep.txt"));
    }

    #[test]
    fn test_vcs_dir_excluded_by_default() {
        let rules = IgnoreRules::new();

        let hit = rules.check(".git").unwrap();
        assert_eq!(hit.rule, ".git/");
        assert_eq!(hit.provenance, &Provenance::Default);
        assert!(rules.check(".git/config").is_some());
        assert!(rules.check("./.git/HEAD").is_some());
        assert!(rules.check(".github/workflows/ci.yml").is_none());
        assert!(rules.check("src/main.rs").is_none());
    }

    #[test]
    fn test_primary_source_wins() {
        let rules = IgnoreRules::new()
            .with_patterns(GITIGNORE_FILE, ["*.log"])
            .with_patterns(TOOL_IGNORE_FILE, ["debug.log"]);

        let hit = rules.check("debug.log").unwrap();
        assert_eq!(hit.rule, "*.log");
        assert_eq!(hit.provenance.to_string(), GITIGNORE_FILE);

        let rules = IgnoreRules::new()
            .with_patterns(GITIGNORE_FILE, ["target/"])
            .with_patterns(TOOL_IGNORE_FILE, ["*.pdf"]);
        let hit = rules.check("docs/manual.pdf").unwrap();
        assert_eq!(hit.provenance.to_string(), TOOL_IGNORE_FILE);
    }

    #[test]
    fn test_first_pattern_in_file_wins() {
        let rules = IgnoreRules::new().with_patterns(GITIGNORE_FILE, ["*.tmp", "scratch.tmp"]);
        assert_eq!(rules.check("scratch.tmp").unwrap().rule, "*.tmp");
    }

    #[test]
    fn test_load_patterns_skips_comments_and_blanks() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child(".gitignore");
        file.write_str("# build output\n\ntarget/\n   \n  *.log  \n#*.rs\n")
            .unwrap();

        assert_eq!(load_patterns(file.path()), vec!["target/", "*.log"]);
    }

    #[test]
    fn test_load_patterns_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        assert!(load_patterns(&temp.path().join("absent")).is_empty());
    }

    #[test]
    fn test_load_from_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("target/\n*.log\n").unwrap();
        temp.child(".code2pdf.ignore").write_str("docs/\n").unwrap();

        let rules = IgnoreRules::load(temp.path());
        assert_eq!(rules.pattern_count(GITIGNORE_FILE), 2);
        assert_eq!(rules.pattern_count(TOOL_IGNORE_FILE), 1);
        assert!(!rules.is_default_only());
        assert!(rules.check("docs/index.md").is_some());
        assert!(rules.check("src/lib.rs").is_none());
    }

    #[test]
    fn test_load_without_ignore_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = IgnoreRules::load(temp.path());

        assert!(rules.is_default_only());
        assert!(rules.check(".git/config").is_some());
    }
}
