//! Diagnostics store: per-window, per-file results of the latest lint run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{Diagnostic, FileDiagnostics, WindowId};

type WindowDiagnostics = HashMap<PathBuf, Arc<FileDiagnostics>>;

/// Shared store of lint results.
///
/// Each file's diagnostics are an immutable `Arc` snapshot swapped in whole,
/// so a reader holding a snapshot never sees a half-written file map. Runs
/// replace a file's results; they never merge into them.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    windows: Mutex<HashMap<WindowId, WindowDiagnostics>>,
}

impl DiagnosticStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<WindowId, WindowDiagnostics>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace everything known about `path` in `window`.
    ///
    /// The last call wins, whichever run was requested first.
    pub fn replace_file(&self, window: WindowId, path: PathBuf, file: FileDiagnostics) {
        self.windows()
            .entry(window)
            .or_default()
            .insert(path, Arc::new(file));
    }

    /// Snapshot of one file's diagnostics.
    #[must_use]
    pub fn file(&self, window: WindowId, path: &Path) -> Option<Arc<FileDiagnostics>> {
        self.windows().get(&window)?.get(path).cloned()
    }

    /// Diagnostics recorded at `line`, or `None` if the file or line was never
    /// recorded.
    #[must_use]
    pub fn lookup(&self, window: WindowId, path: &Path, line: u32) -> Option<Vec<Diagnostic>> {
        let file = self.file(window, path)?;
        file.line(line).map(<[Diagnostic]>::to_vec)
    }

    /// Drop all results for a window the host has closed.
    pub fn forget_window(&self, window: WindowId) {
        if self.windows().remove(&window).is_some() {
            tracing::debug!(%window, "Dropped diagnostics for closed window");
        }
    }
}
