//! Public types shared by the parser, store, coordinator and suppression editor.
//!
//! Hosts construct [`LintSettings`], hand out [`WindowId`]/[`DocumentId`]
//! handles through their [`View`](crate::View) implementation, and read
//! [`FileDiagnostics`] back out of the store to draw markers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Identity of one editor window (a group of documents opened together).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one open buffer, independent of its file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pylint message category.
///
/// Declaration order is the marker priority order and also the severity
/// rank: `Fatal` outranks everything, `Info` ranks lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Info,
    Refactor,
    Convention,
    Warning,
    Error,
    Fatal,
}

impl Category {
    /// Every category, in marker scan order.
    pub const ALL: [Category; 6] = [
        Self::Info,
        Self::Refactor,
        Self::Convention,
        Self::Warning,
        Self::Error,
        Self::Fatal,
    ];

    /// Parse the single-letter code pylint prints for `{C}`. Case-insensitive.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'I' => Some(Self::Info),
            'R' => Some(Self::Refactor),
            'C' => Some(Self::Convention),
            'W' => Some(Self::Warning),
            'E' => Some(Self::Error),
            'F' => Some(Self::Fatal),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Info => 'I',
            Self::Refactor => 'R',
            Self::Convention => 'C',
            Self::Warning => 'W',
            Self::Error => 'E',
            Self::Fatal => 'F',
        }
    }

    /// Rank used to order diagnostics on the same line; higher sorts first.
    #[must_use]
    pub fn severity_order(self) -> u8 {
        self as u8
    }

    /// Marker style scope, matching the icon set hosts usually ship.
    #[must_use]
    pub fn scope(self) -> &'static str {
        match self {
            Self::Info | Self::Refactor | Self::Convention => "info",
            Self::Warning => "warning",
            Self::Error | Self::Fatal => "error",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single finding reported by pylint.
///
/// Fields are private; the parser is the only producer outside tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-indexed line number.
    line: u32,
    category: Category,
    error_id: String,
    symbol: String,
    message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        line: u32,
        category: Category,
        error_id: String,
        symbol: String,
        message: String,
    ) -> Self {
        Self {
            line,
            category,
            error_id,
            symbol,
            message,
        }
    }

    /// 1-indexed line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Message id such as `C0103`.
    #[must_use]
    pub fn error_id(&self) -> &str {
        &self.error_id
    }

    /// Symbolic rule name such as `invalid-name`.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn severity_order(&self) -> u8 {
        self.category.severity_order()
    }
}

/// Diagnostics of one file, keyed by 1-indexed line.
///
/// Each line's list is ordered by severity, most severe first; equal ranks
/// keep the order pylint printed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiagnostics {
    lines: BTreeMap<u32, Vec<Diagnostic>>,
}

impl FileDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic to its line and restore the line's ordering.
    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        let items = self.lines.entry(diagnostic.line()).or_default();
        items.push(diagnostic);
        // `sort_by` is stable, so same-rank entries keep encounter order.
        items.sort_by(|a, b| b.severity_order().cmp(&a.severity_order()));
    }

    #[must_use]
    pub fn line(&self, line: u32) -> Option<&[Diagnostic]> {
        self.lines.get(&line).map(Vec::as_slice)
    }

    /// Lines in ascending order with their diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Diagnostic])> {
        self.lines.iter().map(|(line, items)| (*line, items.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines carrying at least one diagnostic.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total diagnostic count across all lines.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    /// Compact status string like "E:1 W:3 C:2"; empty when there is nothing.
    #[must_use]
    pub fn status_string(&self) -> String {
        let mut parts = Vec::new();
        for category in Category::ALL.iter().rev() {
            let count = self
                .lines
                .values()
                .flatten()
                .filter(|d| d.category() == *category)
                .count();
            if count > 0 {
                parts.push(format!("{}:{count}", category.code()));
            }
        }
        parts.join(" ")
    }
}

fn default_python_bin() -> String {
    "python".to_string()
}

/// Settings consumed by a lint run.
///
/// ```toml
/// [lint]
/// disable = ["C0111"]
/// ignore = ["invalid-name"]
/// extra_args = ["--max-line-length=100"]
/// pylint_bin = "/usr/local/bin/pylint"
/// python_bin = "python3"
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LintSettings {
    /// Message ids or symbols passed to pylint via `-d`.
    #[serde(default)]
    pub disable: Vec<String>,
    /// Message ids or symbols dropped from pylint's output after the run.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Extra arguments placed before the file path.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Explicit pylint executable. Autodiscovered through `python_bin` when unset.
    #[serde(default)]
    pub pylint_bin: Option<PathBuf>,
    /// Interpreter used to autodiscover pylint. Default: `python`.
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
    /// Upper bound on a single pylint invocation. Unbounded when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            disable: Vec::new(),
            ignore: Vec::new(),
            extra_args: Vec::new(),
            pylint_bin: None,
            python_bin: default_python_bin(),
            timeout_secs: None,
        }
    }
}

impl LintSettings {
    /// The ignore list, lower-cased for case-insensitive matching.
    #[must_use]
    pub fn ignore_list(&self) -> Vec<String> {
        self.ignore.iter().map(|s| s.to_lowercase()).collect()
    }
}
