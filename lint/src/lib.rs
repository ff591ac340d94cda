//! Pylint integration for editor hosts: run on save, parse, store, suppress.

pub mod editor;
pub mod markers;
pub mod parser;
pub mod process;
pub mod resolve;
pub mod suppress;
pub mod types;

pub(crate) mod diagnostics;
pub(crate) mod runs;

mod coordinator;
mod error;

#[cfg(test)]
mod testing;

pub use coordinator::{PROGRESS_STATUS_KEY, RunCoordinator, RunOutcome, is_lintable};
pub use diagnostics::DiagnosticStore;
pub use editor::View;
pub use error::LintError;
pub use markers::{MarkerIndex, MarkerRegion, MarkerSet};
pub use process::{AnalyzerCommand, AnalyzerSpawner, ProcessOutput, TokioSpawner};
pub use resolve::{Executable, ExecutableResolver, PylintLocator, Version};
pub use runs::{ActiveRun, ActiveRuns, RunTicket};
pub use suppress::{DISABLE_DIRECTIVE, SuppressOutcome};
pub use types::{Category, Diagnostic, DocumentId, FileDiagnostics, LintSettings, WindowId};
