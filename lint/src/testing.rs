//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::editor::View;
use crate::markers::MarkerRegion;
use crate::process::{AnalyzerCommand, AnalyzerSpawner, ProcessOutput};
use crate::resolve::{Executable, ExecutableResolver, Version};
use crate::types::{Category, DocumentId, LintSettings, WindowId};

pub(crate) struct FakeView {
    document: DocumentId,
    path: Option<PathBuf>,
    syntax: Option<String>,
    lines: Mutex<Vec<String>>,
    status: Mutex<HashMap<String, String>>,
    status_history: Mutex<Vec<String>>,
    drawn: Mutex<HashMap<Category, Vec<MarkerRegion>>>,
    errors: Mutex<Vec<String>>,
}

impl FakeView {
    pub fn new(document: u64, path: &str, text: &str) -> Self {
        Self {
            document: DocumentId::new(document),
            path: Some(PathBuf::from(path)),
            syntax: None,
            lines: Mutex::new(text.lines().map(str::to_string).collect()),
            status: Mutex::new(HashMap::new()),
            status_history: Mutex::new(Vec::new()),
            drawn: Mutex::new(HashMap::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn unsaved(document: u64, text: &str) -> Self {
        Self {
            path: None,
            ..Self::new(document, "", text)
        }
    }

    pub fn with_syntax(mut self, syntax: &str) -> Self {
        self.syntax = Some(syntax.to_string());
        self
    }

    pub fn drawn(&self, category: Category) -> Vec<MarkerRegion> {
        self.drawn
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn status(&self, key: &str) -> Option<String> {
        self.status.lock().unwrap().get(key).cloned()
    }

    pub fn status_history(&self) -> Vec<String> {
        self.status_history.lock().unwrap().clone()
    }

    fn spans(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|line| {
                let span = start..start + line.len();
                start = span.end + 1;
                span
            })
            .collect()
    }
}

impl View for FakeView {
    fn document(&self) -> DocumentId {
        self.document
    }

    fn window(&self) -> WindowId {
        WindowId::new(1)
    }

    fn file_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn syntax(&self) -> Option<String> {
        self.syntax.clone()
    }

    fn set_status(&self, key: &str, text: &str) {
        self.status
            .lock()
            .unwrap()
            .insert(key.to_string(), text.to_string());
        self.status_history.lock().unwrap().push(text.to_string());
    }

    fn erase_status(&self, key: &str) {
        self.status.lock().unwrap().remove(key);
    }

    fn line_span(&self, line: u32) -> Option<Range<usize>> {
        self.spans().get((line as usize).checked_sub(1)?).cloned()
    }

    fn line_at(&self, offset: usize) -> Option<u32> {
        self.spans()
            .iter()
            .position(|span| span.start <= offset && offset <= span.end)
            .map(|idx| idx as u32 + 1)
    }

    fn line_text(&self, line: u32) -> Option<String> {
        self.lines
            .lock()
            .unwrap()
            .get((line as usize).checked_sub(1)?)
            .cloned()
    }

    fn replace_line(&self, line: u32, text: &str) {
        if let Some(slot) = self.lines.lock().unwrap().get_mut(line as usize - 1) {
            *slot = text.to_string();
        }
    }

    fn draw_markers(&self, category: Category, regions: &[MarkerRegion]) {
        self.drawn
            .lock()
            .unwrap()
            .insert(category, regions.to_vec());
    }

    fn error_message(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Returns canned output, optionally after a delay, and records how many
/// invocations overlapped.
pub(crate) struct FakeSpawner {
    output: Mutex<ProcessOutput>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    last_args: Mutex<Vec<String>>,
    last_program: Mutex<PathBuf>,
}

impl FakeSpawner {
    pub fn new(output: ProcessOutput) -> Self {
        Self {
            output: Mutex::new(output),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            last_args: Mutex::new(Vec::new()),
            last_program: Mutex::new(PathBuf::new()),
        }
    }

    pub fn stdout(stdout: &str) -> Self {
        Self::new(ProcessOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_output(&self, output: ProcessOutput) {
        *self.output.lock().unwrap() = output;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_args(&self) -> Vec<String> {
        self.last_args.lock().unwrap().clone()
    }

    pub fn last_program(&self) -> PathBuf {
        self.last_program.lock().unwrap().clone()
    }
}

impl AnalyzerSpawner for FakeSpawner {
    fn spawn(&self, command: AnalyzerCommand) -> BoxFuture<'static, std::io::Result<ProcessOutput>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_program.lock().unwrap() = command.program().to_path_buf();
        *self.last_args.lock().unwrap() = command
            .args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let output = self.output.lock().unwrap().clone();
        let delay = self.delay;
        let in_flight = Arc::clone(&self.in_flight);
        let max_in_flight = Arc::clone(&self.max_in_flight);
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(output)
        }
        .boxed()
    }
}

pub(crate) struct FakeResolver {
    executable: Option<Executable>,
    /// Resolve to the configured `pylint_bin`, after this long.
    echo_after: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn available() -> Self {
        Self {
            executable: Some(Executable::new(
                PathBuf::from("/usr/bin/pylint"),
                Version::new(vec![2, 17, 4]),
            )),
            echo_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            executable: None,
            echo_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn echoing(delay: Duration) -> Self {
        Self {
            executable: None,
            echo_after: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExecutableResolver for FakeResolver {
    fn resolve(&self, settings: &LintSettings) -> Option<Executable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.echo_after {
            std::thread::sleep(delay);
            let path = settings.pylint_bin.clone()?;
            return Some(Executable::new(path, Version::new(vec![2, 17, 4])));
        }
        self.executable.clone()
    }
}
