//! Capabilities the host editor provides to the lint subsystem.

use std::ops::Range;
use std::path::PathBuf;

use crate::markers::MarkerRegion;
use crate::types::{Category, DocumentId, WindowId};

/// One open document as seen by the lint subsystem.
///
/// Implementations wrap the host's buffer/view handle. Methods are called
/// from tokio tasks, hence `Send + Sync`; hosts with a single UI thread are
/// expected to marshal the calls themselves. Line numbers are 1-indexed,
/// offsets are byte offsets into the buffer.
pub trait View: Send + Sync {
    fn document(&self) -> DocumentId;

    fn window(&self) -> WindowId;

    /// Path on disk, `None` for buffers that were never saved.
    fn file_path(&self) -> Option<PathBuf>;

    /// Name of the syntax definition attached to the view, if any.
    fn syntax(&self) -> Option<String> {
        None
    }

    fn set_status(&self, key: &str, text: &str);

    fn erase_status(&self, key: &str);

    /// Byte range of `line`, without its line terminator.
    fn line_span(&self, line: u32) -> Option<Range<usize>>;

    /// Line containing `offset`.
    fn line_at(&self, offset: usize) -> Option<u32>;

    fn line_text(&self, line: u32) -> Option<String>;

    /// Replace the contents of `line`, keeping its line terminator.
    fn replace_line(&self, line: u32, text: &str);

    /// Draw (or clear, when `regions` is empty) the markers for one category.
    fn draw_markers(&self, category: Category, regions: &[MarkerRegion]);

    /// Blocking notice shown to the user.
    fn error_message(&self, message: &str);
}
