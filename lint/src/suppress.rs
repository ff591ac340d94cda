//! Inline suppression: append `# pylint: disable=...` for the messages
//! marked on the line under the cursor.

use crate::diagnostics::DiagnosticStore;
use crate::editor::View;
use crate::markers::MarkerIndex;

/// Directive pylint reads from a trailing comment.
pub const DISABLE_DIRECTIVE: &str = "pylint: disable=";

/// What [`suppress_at_cursor`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressOutcome {
    /// The cursor is not on a lint marker.
    NoMarker,
    /// Every symbol on the line is already disabled.
    NothingToAdd,
    /// `line` was rewritten to `text`.
    Applied { line: u32, text: String },
}

/// Disable the messages behind the marker at `offset`.
///
/// Marker spans are only as fresh as the last layout, so callers that edit
/// the buffer should lay markers out again after `Applied`.
pub fn suppress_at_cursor(
    view: &dyn View,
    store: &DiagnosticStore,
    markers: &MarkerIndex,
    offset: usize,
) -> SuppressOutcome {
    let Some(path) = view.file_path() else {
        return SuppressOutcome::NoMarker;
    };
    let window = view.window();

    let Some(set) = markers.get(window, &path) else {
        return SuppressOutcome::NoMarker;
    };
    let Some(region) = set.find(offset) else {
        return SuppressOutcome::NoMarker;
    };
    let line = region.line();
    // Spans are stale after an edit until markers are laid out again.
    if view.line_at(offset) != Some(line) {
        tracing::debug!(line, offset, "Marker is stale for cursor line");
        return SuppressOutcome::NoMarker;
    }
    let Some(diagnostics) = store.lookup(window, &path, line) else {
        return SuppressOutcome::NoMarker;
    };
    let Some(text) = view.line_text(line) else {
        return SuppressOutcome::NoMarker;
    };

    let symbols = diagnostics.iter().map(|d| d.symbol().to_string());
    match with_disabled(&text, symbols) {
        Some(new_text) => {
            tracing::debug!(line, text = %new_text, "Adding pylint suppression");
            view.replace_line(line, &new_text);
            SuppressOutcome::Applied {
                line,
                text: new_text,
            }
        }
        None => SuppressOutcome::NothingToAdd,
    }
}

/// `line` with `symbols` added to its disable directive, or `None` when
/// every symbol is already listed.
///
/// An existing directive is extended in place (after its last occurrence);
/// otherwise a new trailing comment is appended.
#[must_use]
pub fn with_disabled<I>(line: &str, symbols: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let trimmed = line.trim_end();

    let (already, separator): (Vec<&str>, &str) = match trimmed.rsplit_once(DISABLE_DIRECTIVE) {
        Some((_, listed)) => (listed.split(',').map(str::trim).collect(), ","),
        None => (Vec::new(), "  # pylint: disable="),
    };

    let mut missing: Vec<String> = Vec::new();
    for symbol in symbols {
        if !already.contains(&symbol.as_str()) && !missing.contains(&symbol) {
            missing.push(symbol);
        }
    }

    if missing.is_empty() {
        return None;
    }

    Some(format!("{trimmed}{separator}{}", missing.join(",")))
}
