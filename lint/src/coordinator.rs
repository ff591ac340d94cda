//! RunCoordinator: public API consumed by the host editor.
//!
//! The host interacts with pylint through this single type. It owns the
//! diagnostics store, the marker index and the active-run registry, and is
//! shared behind an `Arc` by every view of every window.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::diagnostics::DiagnosticStore;
use crate::editor::View;
use crate::error::LintError;
use crate::markers::{MarkerIndex, MarkerSet};
use crate::parser::parse_output;
use crate::process::{AnalyzerCommand, AnalyzerSpawner};
use crate::resolve::{Executable, ExecutableResolver, Version};
use crate::runs::{ActiveRuns, RunTicket};
use crate::suppress::{SuppressOutcome, suppress_at_cursor};
use crate::types::{Category, DocumentId, FileDiagnostics, LintSettings, WindowId};

/// Status bar key used for the progress spinner.
pub const PROGRESS_STATUS_KEY: &str = "active_pylint";

const SPINNER_FRAMES: [char; 4] = ['◐', '◓', '◑', '◒'];

/// Default delay between spinner frames.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

const FATAL_NOTICE: &str = "Fatal pylint error, check console for details";

/// Result of a lint request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Pylint ran and the store now holds `count` diagnostics for the file.
    Completed { count: usize },
    /// Another request for the document was already queued; this one was
    /// folded into it.
    Coalesced,
    /// The view has no file on disk.
    NoFile,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether pylint should run for this view on save.
#[must_use]
pub fn is_lintable(view: &dyn View) -> bool {
    let is_py_file = view
        .file_path()
        .is_some_and(|p| p.extension().is_some_and(|ext| ext == "py"));
    let is_python_syntax = view
        .syntax()
        .is_some_and(|s| s.to_lowercase().contains("python"));
    is_py_file || is_python_syntax
}

pub struct RunCoordinator {
    settings: Mutex<Arc<LintSettings>>,
    resolver: Arc<dyn ExecutableResolver>,
    spawner: Arc<dyn AnalyzerSpawner>,
    /// Resolved on first use, paired with the settings it was resolved for.
    executable: Mutex<Option<(Arc<LintSettings>, Executable)>>,
    store: Arc<DiagnosticStore>,
    markers: Arc<MarkerIndex>,
    runs: Arc<ActiveRuns>,
    progress_interval: Duration,
}

impl RunCoordinator {
    #[must_use]
    pub fn new(
        settings: LintSettings,
        resolver: Arc<dyn ExecutableResolver>,
        spawner: Arc<dyn AnalyzerSpawner>,
    ) -> Self {
        Self {
            settings: Mutex::new(Arc::new(settings)),
            resolver,
            spawner,
            executable: Mutex::new(None),
            store: Arc::new(DiagnosticStore::new()),
            markers: Arc::new(MarkerIndex::new()),
            runs: Arc::new(ActiveRuns::new()),
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Override the spinner frame interval.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<DiagnosticStore> {
        &self.store
    }

    #[must_use]
    pub fn markers(&self) -> &Arc<MarkerIndex> {
        &self.markers
    }

    #[must_use]
    pub fn is_running(&self, document: DocumentId) -> bool {
        self.runs.is_running(document)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<LintSettings> {
        Arc::clone(&lock(&self.settings))
    }

    /// Swap in new settings. The executable is re-resolved on the next run,
    /// since `pylint_bin`/`python_bin` may have changed.
    pub fn reload_settings(&self, settings: LintSettings) {
        *lock(&self.settings) = Arc::new(settings);
        *lock(&self.executable) = None;
    }

    /// Host hook for "document saved". Runs pylint for lintable views and
    /// logs, rather than returns, any failure.
    pub async fn on_saved(&self, view: Arc<dyn View>) {
        if !is_lintable(view.as_ref()) {
            return;
        }
        if let Err(e) = self.run(view).await {
            tracing::debug!("Lint run ended without results: {e}");
        }
    }

    /// Host hook for "window closed".
    pub fn on_window_closed(&self, window: WindowId) {
        self.store.forget_window(window);
        self.markers.forget_window(window);
    }

    /// Lint the view's file and publish the results.
    ///
    /// Waits for a run already in flight for the same document. User-visible
    /// failures have already been reported through the view when this
    /// returns `Err`; the file's previous diagnostics stay in place.
    pub async fn run(&self, view: Arc<dyn View>) -> Result<RunOutcome, LintError> {
        let Some(path) = view.file_path() else {
            return Ok(RunOutcome::NoFile);
        };
        let document = view.document();
        let window = view.window();

        let Some(active) = self.runs.acquire(document).await else {
            tracing::debug!(%document, "Lint already queued; request coalesced");
            return Ok(RunOutcome::Coalesced);
        };

        view.erase_status(PROGRESS_STATUS_KEY);
        self.spawn_progress(Arc::clone(&view), document, active.ticket());

        match self.lint(&path).await {
            Ok(file) => {
                let count = file.total_count();
                tracing::debug!(
                    path = %path.display(),
                    count,
                    elapsed_ms = active.ticket().started_at().elapsed().as_millis() as u64,
                    "Lint finished"
                );
                self.store.replace_file(window, path.clone(), file);
                drop(active);
                self.render_markers(view.as_ref(), window, &path);
                Ok(RunOutcome::Completed { count })
            }
            Err(e) => {
                drop(active);
                if e.is_user_visible() {
                    tracing::error!(path = %path.display(), "{e}");
                    view.error_message(FATAL_NOTICE);
                } else {
                    tracing::warn!("{e}, not linting");
                }
                Err(e)
            }
        }
    }

    /// Disable the messages under the cursor. See [`suppress_at_cursor`].
    ///
    /// An edit shifts the spans of later lines, so markers are laid out
    /// again from the current buffer afterwards.
    pub fn suppress_at_cursor(&self, view: &dyn View, offset: usize) -> SuppressOutcome {
        let outcome = suppress_at_cursor(view, &self.store, &self.markers, offset);
        if matches!(outcome, SuppressOutcome::Applied { .. })
            && let Some(path) = view.file_path()
        {
            self.render_markers(view, view.window(), &path);
        }
        outcome
    }

    async fn lint(&self, path: &Path) -> Result<FileDiagnostics, LintError> {
        let settings = self.settings();
        let executable = self.executable(&settings).await?;
        let command = AnalyzerCommand::build(&executable, &settings, path);

        let spawned = self.spawner.spawn(command);
        let output = match settings.timeout_secs {
            Some(secs) => {
                let limit = Duration::from_secs(secs);
                tokio::time::timeout(limit, spawned)
                    .await
                    .map_err(|_| LintError::Timeout(limit))??
            }
            None => spawned.await?,
        };

        if !output.fatal_stderr_lines().is_empty() {
            return Err(LintError::ToolFatal {
                stderr: output.stderr,
            });
        }

        Ok(parse_output(&output.stdout, &settings.ignore_list()))
    }

    async fn executable(&self, settings: &Arc<LintSettings>) -> Result<Executable, LintError> {
        if let Some((resolved_for, exe)) = lock(&self.executable).as_ref()
            && Arc::ptr_eq(resolved_for, settings)
        {
            return Ok(exe.clone());
        }

        let resolver = Arc::clone(&self.resolver);
        let task_settings = Arc::clone(settings);
        let resolved = tokio::task::spawn_blocking(move || resolver.resolve(&task_settings))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Pylint resolution task failed: {e}");
                None
            });

        let exe = resolved.ok_or_else(|| LintError::ToolUnavailable {
            minimum: Version::minimum().to_string(),
        })?;
        // Settings reloaded mid-resolution: use the result for this run only.
        if Arc::ptr_eq(&self.settings(), settings) {
            *lock(&self.executable) = Some((Arc::clone(settings), exe.clone()));
        }
        Ok(exe)
    }

    fn render_markers(&self, view: &dyn View, window: WindowId, path: &Path) {
        let Some(file) = self.store.file(window, path) else {
            return;
        };
        let set = MarkerSet::build(&file, |line| view.line_span(line));
        for category in Category::ALL {
            view.draw_markers(category, set.regions(category));
        }
        self.markers.replace(window, path.to_path_buf(), set);
    }

    fn spawn_progress(&self, view: Arc<dyn View>, document: DocumentId, ticket: RunTicket) {
        let runs = Arc::clone(&self.runs);
        let interval = self.progress_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for frame in SPINNER_FRAMES.into_iter().cycle() {
                ticker.tick().await;
                if !runs.is_current(document, ticket) {
                    view.erase_status(PROGRESS_STATUS_KEY);
                    break;
                }
                view.set_status(PROGRESS_STATUS_KEY, &format!("Pylinting: {frame}"));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::process::ProcessOutput;
    use crate::testing::{FakeResolver, FakeSpawner, FakeView};

    const ONE_MESSAGE: &str = "foo.py:2:W:W0611:unused-import:Unused import os\n";

    fn coordinator(spawner: Arc<FakeSpawner>) -> RunCoordinator {
        RunCoordinator::new(
            LintSettings::default(),
            Arc::new(FakeResolver::available()),
            spawner,
        )
        .with_progress_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_run_publishes_and_draws_markers() {
        let spawner = Arc::new(FakeSpawner::stdout(ONE_MESSAGE));
        let coord = coordinator(Arc::clone(&spawner));
        let view = Arc::new(FakeView::new(1, "foo.py", "x = 1\nimport os\n"));

        let outcome = coord.run(view.clone()).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed { count: 1 });

        let items = coord
            .store()
            .lookup(view.window(), Path::new("foo.py"), 2)
            .unwrap();
        assert_eq!(items[0].symbol(), "unused-import");

        let drawn = view.drawn(Category::Warning);
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].span(), 6..15);
        assert!(!coord.is_running(view.document()));
    }

    #[tokio::test]
    async fn test_fatal_stderr_publishes_nothing() {
        let spawner = Arc::new(FakeSpawner::stdout(ONE_MESSAGE));
        let coord = coordinator(Arc::clone(&spawner));
        let view = Arc::new(FakeView::new(1, "foo.py", "x = 1\nimport os\n"));
        coord.run(view.clone()).await.unwrap();

        spawner.set_output(ProcessOutput {
            stdout: "foo.py:1:E:E0602:undefined-variable:new\n".to_string(),
            stderr: "Traceback (most recent call last):\n  File \"pylint\"\n".to_string(),
            exit_code: Some(1),
        });
        let err = coord.run(view.clone()).await.unwrap_err();
        assert!(matches!(err, LintError::ToolFatal { .. }));
        assert_eq!(view.errors().len(), 1);

        // Previous results are stale but untouched.
        let store = coord.store();
        assert!(store.lookup(view.window(), Path::new("foo.py"), 1).is_none());
        assert!(store.lookup(view.window(), Path::new("foo.py"), 2).is_some());
        assert!(!coord.is_running(view.document()));
    }

    #[tokio::test]
    async fn test_config_note_on_stderr_is_not_fatal() {
        let spawner = Arc::new(FakeSpawner::new(ProcessOutput {
            stdout: ONE_MESSAGE.to_string(),
            stderr: "Using config file /home/me/.pylintrc\n".to_string(),
            exit_code: Some(4),
        }));
        let coord = coordinator(spawner);
        let view = Arc::new(FakeView::new(1, "foo.py", "x\ny\n"));
        assert_eq!(
            coord.run(view.clone()).await.unwrap(),
            RunOutcome::Completed { count: 1 }
        );
        assert!(view.errors().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_tool_is_silent() {
        let coord = RunCoordinator::new(
            LintSettings::default(),
            Arc::new(FakeResolver::unavailable()),
            Arc::new(FakeSpawner::stdout(ONE_MESSAGE)),
        );
        let view = Arc::new(FakeView::new(1, "foo.py", "x\n"));
        let err = coord.run(view.clone()).await.unwrap_err();
        assert!(matches!(err, LintError::ToolUnavailable { .. }));
        assert!(view.errors().is_empty());
        assert!(coord.store().file(view.window(), Path::new("foo.py")).is_none());
    }

    #[tokio::test]
    async fn test_ignore_and_disable_settings_are_applied() {
        let spawner = Arc::new(FakeSpawner::stdout(
            "foo.py:1:C:C0103:invalid-name:x\nfoo.py:1:W:W0611:unused-import:y\n",
        ));
        let coord = RunCoordinator::new(
            LintSettings {
                disable: vec!["R0903".to_string()],
                ignore: vec!["Invalid-Name".to_string()],
                ..LintSettings::default()
            },
            Arc::new(FakeResolver::available()),
            Arc::clone(&spawner) as Arc<dyn AnalyzerSpawner>,
        );
        let view = Arc::new(FakeView::new(1, "foo.py", "x\n"));
        assert_eq!(
            coord.run(view).await.unwrap(),
            RunOutcome::Completed { count: 1 }
        );

        let args = spawner.last_args();
        assert!(args.windows(2).any(|w| w[0] == "-d" && w[1] == "R0903"));
        assert_eq!(args.last().map(String::as_str), Some("foo.py"));
    }

    #[tokio::test]
    async fn test_runs_for_one_document_never_overlap() {
        let spawner = Arc::new(FakeSpawner::stdout(ONE_MESSAGE).with_delay(Duration::from_millis(30)));
        let coord = coordinator(Arc::clone(&spawner));
        let view: Arc<dyn View> = Arc::new(FakeView::new(1, "foo.py", "x\nimport os\n"));

        let (a, b, c) = tokio::join!(
            coord.run(Arc::clone(&view)),
            coord.run(Arc::clone(&view)),
            coord.run(Arc::clone(&view)),
        );
        let outcomes = [a.unwrap(), b.unwrap(), c.unwrap()];

        assert_eq!(spawner.max_in_flight(), 1);
        assert_eq!(spawner.calls(), 2);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == RunOutcome::Coalesced)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_different_documents_run_concurrently() {
        let spawner = Arc::new(FakeSpawner::stdout(ONE_MESSAGE).with_delay(Duration::from_millis(30)));
        let coord = coordinator(Arc::clone(&spawner));
        let a: Arc<dyn View> = Arc::new(FakeView::new(1, "a.py", "x\n"));
        let b: Arc<dyn View> = Arc::new(FakeView::new(2, "b.py", "x\n"));

        let (ra, rb) = tokio::join!(coord.run(a), coord.run(b));
        ra.unwrap();
        rb.unwrap();
        assert_eq!(spawner.max_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_progress_spins_then_clears() {
        let spawner = Arc::new(FakeSpawner::stdout(ONE_MESSAGE).with_delay(Duration::from_millis(40)));
        let coord = coordinator(spawner);
        let view = Arc::new(FakeView::new(1, "foo.py", "x\n"));

        coord.run(view.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let history = view.status_history();
        assert!(history.iter().any(|s| s == "Pylinting: ◐"));
        assert!(history.iter().any(|s| s == "Pylinting: ◓"));
        assert!(view.status(PROGRESS_STATUS_KEY).is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let spawner = Arc::new(FakeSpawner::stdout(ONE_MESSAGE).with_delay(Duration::from_secs(5)));
        let coord = RunCoordinator::new(
            LintSettings {
                timeout_secs: Some(0),
                ..LintSettings::default()
            },
            Arc::new(FakeResolver::available()),
            spawner,
        );
        let view = Arc::new(FakeView::new(1, "foo.py", "x\n"));
        let err = coord.run(view.clone()).await.unwrap_err();
        assert!(matches!(err, LintError::Timeout(_)));
        assert_eq!(view.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_executable_is_cached_until_reload() {
        let resolver = Arc::new(FakeResolver::available());
        let coord = RunCoordinator::new(
            LintSettings::default(),
            Arc::clone(&resolver) as Arc<dyn ExecutableResolver>,
            Arc::new(FakeSpawner::stdout("")),
        );
        let view: Arc<dyn View> = Arc::new(FakeView::new(1, "foo.py", "x\n"));

        coord.run(Arc::clone(&view)).await.unwrap();
        coord.run(Arc::clone(&view)).await.unwrap();
        assert_eq!(resolver.calls(), 1);

        coord.reload_settings(LintSettings::default());
        coord.run(view).await.unwrap();
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn test_reload_during_resolution_is_not_overwritten() {
        let resolver = Arc::new(FakeResolver::echoing(Duration::from_millis(100)));
        let spawner = Arc::new(FakeSpawner::stdout(""));
        let coord = RunCoordinator::new(
            LintSettings {
                pylint_bin: Some(PathBuf::from("old")),
                ..LintSettings::default()
            },
            Arc::clone(&resolver) as Arc<dyn ExecutableResolver>,
            Arc::clone(&spawner) as Arc<dyn AnalyzerSpawner>,
        );
        let view: Arc<dyn View> = Arc::new(FakeView::new(1, "foo.py", "x\n"));

        let (first, ()) = tokio::join!(coord.run(Arc::clone(&view)), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            coord.reload_settings(LintSettings {
                pylint_bin: Some(PathBuf::from("new")),
                ..LintSettings::default()
            });
        });
        first.unwrap();
        assert_eq!(spawner.last_program(), PathBuf::from("old"));

        coord.run(view).await.unwrap();
        assert_eq!(spawner.last_program(), PathBuf::from("new"));
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn test_on_saved_skips_non_python() {
        let spawner = Arc::new(FakeSpawner::stdout(ONE_MESSAGE));
        let coord = coordinator(Arc::clone(&spawner));

        coord
            .on_saved(Arc::new(FakeView::new(1, "notes.txt", "x\n")))
            .await;
        assert_eq!(spawner.calls(), 0);

        coord
            .on_saved(Arc::new(
                FakeView::new(2, "script", "x\n").with_syntax("Packages/Python/Python.sublime-syntax"),
            ))
            .await;
        assert_eq!(spawner.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsaved_buffer_is_skipped() {
        let coord = coordinator(Arc::new(FakeSpawner::stdout(ONE_MESSAGE)));
        let view = Arc::new(FakeView::unsaved(1, "x\n"));
        assert_eq!(coord.run(view).await.unwrap(), RunOutcome::NoFile);
    }

    #[tokio::test]
    async fn test_suppress_after_run() {
        let spawner = Arc::new(FakeSpawner::stdout(
            "foo.py:2:W:W0611:unused-import:Unused import os\n\
             foo.py:2:C:C0410:multiple-imports:Multiple imports on one line\n",
        ));
        let coord = coordinator(spawner);
        let view = Arc::new(FakeView::new(1, "foo.py", "x = 1\nimport os, sys\n"));
        coord.run(view.clone()).await.unwrap();

        // Cursor in the middle of line 2.
        let outcome = coord.suppress_at_cursor(&*view, 10);
        assert_eq!(
            outcome,
            SuppressOutcome::Applied {
                line: 2,
                text: "import os, sys  # pylint: disable=unused-import,multiple-imports"
                    .to_string(),
            }
        );
        assert_eq!(
            view.line_text(2).unwrap(),
            "import os, sys  # pylint: disable=unused-import,multiple-imports"
        );

        // A second request has nothing new to add.
        assert_eq!(
            coord.suppress_at_cursor(&*view, 10),
            SuppressOutcome::NothingToAdd
        );
        // Line 1 has no marker.
        assert_eq!(
            coord.suppress_at_cursor(&*view, 2),
            SuppressOutcome::NoMarker
        );
    }

    #[tokio::test]
    async fn test_consecutive_suppressions_follow_shifted_lines() {
        let spawner = Arc::new(FakeSpawner::stdout(
            "foo.py:1:W:W0611:unused-import:Unused import os\n\
             foo.py:2:C:C0103:invalid-name:Invalid name\n\
             foo.py:3:C:C0301:line-too-long:Line too long\n",
        ));
        let coord = coordinator(spawner);
        let long = format!("y = '{}'", "a".repeat(60));
        let view = Arc::new(FakeView::new(
            1,
            "foo.py",
            &format!("import os\nx = 1\n{long}\n"),
        ));
        coord.run(view.clone()).await.unwrap();

        assert!(matches!(
            coord.suppress_at_cursor(&*view, 0),
            SuppressOutcome::Applied { line: 1, .. }
        ));

        // Line 1 grew, so line 2 now starts further along the buffer.
        let line_two = view.line_span(2).unwrap().start;
        assert_eq!(
            coord.suppress_at_cursor(&*view, line_two),
            SuppressOutcome::Applied {
                line: 2,
                text: "x = 1  # pylint: disable=invalid-name".to_string(),
            }
        );
        assert_eq!(view.line_text(3).unwrap(), long);
        assert_eq!(view.drawn(Category::Convention).len(), 2);
    }

    #[test]
    fn test_stale_marker_is_not_applied_to_another_line() {
        let coord = coordinator(Arc::new(FakeSpawner::stdout("")));
        let view = FakeView::new(1, "foo.py", "import os\nx = 1\n");
        let path = PathBuf::from("foo.py");
        coord.store().replace_file(
            view.window(),
            path.clone(),
            parse_output("foo.py:2:C:C0103:invalid-name:Invalid name\n", &[]),
        );
        // Laid out before line 1 was lengthened: line 2 used to start at 10.
        coord.markers().replace(
            view.window(),
            path,
            MarkerSet::build(
                &parse_output("foo.py:2:C:C0103:invalid-name:x\n", &[]),
                |line| (line == 2).then_some(10..15),
            ),
        );
        view.replace_line(1, "import os  # pylint: disable=unused-import");

        assert_eq!(coord.suppress_at_cursor(&view, 10), SuppressOutcome::NoMarker);
        assert_eq!(view.line_text(1).unwrap(), "import os  # pylint: disable=unused-import");
    }

    #[tokio::test]
    async fn test_window_close_forgets_results() {
        let coord = coordinator(Arc::new(FakeSpawner::stdout(ONE_MESSAGE)));
        let view = Arc::new(FakeView::new(1, "foo.py", "x\nimport os\n"));
        coord.run(view.clone()).await.unwrap();

        coord.on_window_closed(view.window());
        assert!(coord.store().file(view.window(), Path::new("foo.py")).is_none());
        assert!(coord.markers().get(view.window(), Path::new("foo.py")).is_none());
    }
}
