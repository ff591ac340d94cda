//! Parser for pylint's `--msg-template` output.
//!
//! The runner asks pylint for one message per line in the shape
//! `path:line:C:msg_id:symbol:msg` (see [`MSG_TEMPLATE`]). Anything that does
//! not fit that shape is module banners, progress noise or something we do
//! not understand, and is skipped line by line.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Category, Diagnostic, FileDiagnostics};

/// Template handed to pylint so that [`parse_output`] can read its output.
pub const MSG_TEMPLATE: &str = "{path}:{line}:{C}:{msg_id}:{symbol}:{msg}";

/// Module banners look like `************* Module foo`.
const SEPARATOR_PREFIX: &str = "*************";

static MESSAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<file>.+?):(?P<line>[0-9]+):(?P<cat>[A-Z]):(?P<errid>[A-Z][0-9]+):(?P<symbol>[A-Z0-9\-]+):(?P<msg>.*)$",
    )
    .expect("valid pylint message regex")
});

/// Parse the full stdout of one pylint run.
///
/// `ignore` must already be lower-cased; a message is dropped when either its
/// id or its symbol (lower-cased) is listed. An output with no recognisable
/// messages yields an empty result.
#[must_use]
pub fn parse_output(output: &str, ignore: &[String]) -> FileDiagnostics {
    let mut file = FileDiagnostics::new();

    for line in output.trim().lines() {
        if line.starts_with(SEPARATOR_PREFIX) {
            continue;
        }

        let Some(diagnostic) = parse_line(line) else {
            tracing::trace!(line, "Skipping unrecognised pylint output line");
            continue;
        };

        if is_ignored(&diagnostic, ignore) {
            continue;
        }

        file.push(diagnostic);
    }

    file
}

fn is_ignored(diagnostic: &Diagnostic, ignore: &[String]) -> bool {
    let error_id = diagnostic.error_id().to_lowercase();
    let symbol = diagnostic.symbol().to_lowercase();
    ignore.iter().any(|i| *i == error_id || *i == symbol)
}

/// Parse a single message line. `None` for anything that is not a message.
fn parse_line(line: &str) -> Option<Diagnostic> {
    let caps = MESSAGE_LINE.captures(line)?;

    let line_num: u32 = caps["line"].parse().ok()?;
    let category = caps["cat"].chars().next().and_then(Category::from_code)?;

    Some(Diagnostic::new(
        line_num,
        category,
        caps["errid"].to_string(),
        caps["symbol"].to_string(),
        caps["msg"].trim().to_string(),
    ))
}
