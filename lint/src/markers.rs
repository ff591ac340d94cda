//! Marker index: which drawn marker region belongs to which diagnostic line.
//!
//! Kept next to the [`DiagnosticStore`](crate::DiagnosticStore) so that
//! suppression can map a cursor offset back to a line without asking the
//! host for its marker geometry.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{Category, FileDiagnostics, WindowId};

/// A marker drawn over one line. Its style is the category it is filed
/// under in [`MarkerSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRegion {
    line: u32,
    span: Range<usize>,
}

impl MarkerRegion {
    #[must_use]
    pub fn new(line: u32, span: Range<usize>) -> Self {
        Self { line, span }
    }

    /// 1-indexed line the marker was drawn for.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Inclusive at both ends, so a cursor sitting at the end of the line
    /// still hits the marker.
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        self.span.start <= offset && offset <= self.span.end
    }
}

/// Marker regions of one file, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    by_category: BTreeMap<Category, Vec<MarkerRegion>>,
}

impl MarkerSet {
    /// Lay out one marker per diagnosed line. Lines the host cannot resolve
    /// (e.g. the buffer shrank since the run) get no marker.
    pub fn build<F>(file: &FileDiagnostics, mut line_span: F) -> Self
    where
        F: FnMut(u32) -> Option<Range<usize>>,
    {
        let mut by_category: BTreeMap<Category, Vec<MarkerRegion>> = BTreeMap::new();
        for (line, items) in file.iter() {
            let Some(top) = items.first() else { continue };
            let Some(span) = line_span(line) else {
                tracing::debug!(line, "No span for diagnosed line; marker skipped");
                continue;
            };
            by_category
                .entry(top.category())
                .or_default()
                .push(MarkerRegion::new(line, span));
        }
        Self { by_category }
    }

    #[must_use]
    pub fn regions(&self, category: Category) -> &[MarkerRegion] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First region containing `offset`, scanning categories in
    /// [`Category::ALL`] order.
    #[must_use]
    pub fn find(&self, offset: usize) -> Option<&MarkerRegion> {
        Category::ALL
            .iter()
            .find_map(|category| self.regions(*category).iter().find(|r| r.contains(offset)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_category.values().all(Vec::is_empty)
    }
}

/// Shared index of the marker sets most recently drawn per `(window, path)`.
#[derive(Debug, Default)]
pub struct MarkerIndex {
    sets: Mutex<HashMap<(WindowId, PathBuf), Arc<MarkerSet>>>,
}

impl MarkerIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> MutexGuard<'_, HashMap<(WindowId, PathBuf), Arc<MarkerSet>>> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, window: WindowId, path: PathBuf, set: MarkerSet) {
        self.sets().insert((window, path), Arc::new(set));
    }

    #[must_use]
    pub fn get(&self, window: WindowId, path: &Path) -> Option<Arc<MarkerSet>> {
        self.sets().get(&(window, path.to_path_buf())).cloned()
    }

    pub fn forget_window(&self, window: WindowId) {
        self.sets().retain(|(w, _), _| *w != window);
    }
}
