use std::time::Duration;

/// Ways a lint run can fail.
///
/// None of these are fatal to the host; a failed run leaves the previous
/// diagnostics for the file in place.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// No pylint executable that meets the minimum version.
    #[error("no usable pylint executable (need >= {minimum})")]
    ToolUnavailable { minimum: String },

    /// Pylint wrote something other than informational notes to stderr.
    #[error("fatal pylint error:\n{stderr}")]
    ToolFatal { stderr: String },

    #[error("failed to run pylint: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("pylint did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl LintError {
    /// Whether the user should be told about this failure, rather than it
    /// only going to the log.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::ToolUnavailable { .. })
    }
}
