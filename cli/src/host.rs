//! A [`View`] over a file on disk, for running without an editor.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use pylinter_lint::{Category, DocumentId, MarkerRegion, View, WindowId};
use tempfile::NamedTempFile;

#[derive(Debug)]
struct Buffer {
    lines: Vec<String>,
    eol: &'static str,
    trailing_newline: bool,
    dirty: bool,
}

impl Buffer {
    fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            eol: if text.contains("\r\n") { "\r\n" } else { "\n" },
            trailing_newline: text.ends_with('\n'),
            dirty: false,
        }
    }

    fn render(&self) -> String {
        let mut out = self.lines.join(self.eol);
        if self.trailing_newline {
            out.push_str(self.eol);
        }
        out
    }

    fn spans(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let mut start = 0;
        self.lines.iter().map(move |line| {
            let span = start..start + line.len();
            start = span.end + self.eol.len();
            span
        })
    }
}

/// The single document the command line operates on.
#[derive(Debug)]
pub struct FileView {
    path: PathBuf,
    buffer: Mutex<Buffer>,
    markers: Mutex<BTreeMap<Category, Vec<MarkerRegion>>>,
    errors: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FileView {
    pub fn open(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            buffer: Mutex::new(Buffer::parse(&text)),
            markers: Mutex::new(BTreeMap::new()),
            errors: Mutex::new(Vec::new()),
        })
    }

    /// Number of lines that carry a marker.
    pub fn marked_lines(&self) -> usize {
        lock(&self.markers).values().map(Vec::len).sum()
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    /// Write the buffer back if it was edited: temp file in the same
    /// directory, then rename over the original.
    pub fn save(&self) -> Result<bool> {
        let mut buffer = lock(&self.buffer);
        if !buffer.dirty {
            return Ok(false);
        }

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(buffer.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        buffer.dirty = false;
        Ok(true)
    }
}

impl View for FileView {
    fn document(&self) -> DocumentId {
        DocumentId::new(1)
    }

    fn window(&self) -> WindowId {
        WindowId::new(1)
    }

    fn file_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn set_status(&self, key: &str, text: &str) {
        tracing::trace!(key, text, "status");
    }

    fn erase_status(&self, _key: &str) {}

    fn line_span(&self, line: u32) -> Option<Range<usize>> {
        let idx = (line as usize).checked_sub(1)?;
        lock(&self.buffer).spans().nth(idx)
    }

    fn line_at(&self, offset: usize) -> Option<u32> {
        lock(&self.buffer)
            .spans()
            .position(|span| span.start <= offset && offset <= span.end)
            .and_then(|idx| u32::try_from(idx + 1).ok())
    }

    fn line_text(&self, line: u32) -> Option<String> {
        let idx = (line as usize).checked_sub(1)?;
        lock(&self.buffer).lines.get(idx).cloned()
    }

    fn replace_line(&self, line: u32, text: &str) {
        let Some(idx) = (line as usize).checked_sub(1) else {
            return;
        };
        let mut buffer = lock(&self.buffer);
        if let Some(slot) = buffer.lines.get_mut(idx) {
            *slot = text.to_string();
            buffer.dirty = true;
        }
    }

    fn draw_markers(&self, category: Category, regions: &[MarkerRegion]) {
        lock(&self.markers).insert(category, regions.to_vec());
    }

    fn error_message(&self, message: &str) {
        lock(&self.errors).push(message.to_string());
    }
}
