//! Locating a pylint executable and checking its version.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::types::LintSettings;

/// Oldest pylint that understands `--msg-template`.
pub const MIN_PYLINT_VERSION: [u64; 3] = [1, 1, 0];

static VERSION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)*").expect("valid version regex"));

const AUTODISCOVER_SCRIPT: &str = "import pylint; print(pylint.__path__[0])";

/// Dotted numeric version, compared component by component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(Vec<u64>);

impl Version {
    #[must_use]
    pub fn new(parts: Vec<u64>) -> Self {
        Self(parts)
    }

    /// First dotted number in `text`, e.g. `2.17.4` out of
    /// `"pylint 2.17.4\nastroid 2.15.5"`.
    #[must_use]
    pub fn find_in(text: &str) -> Option<Self> {
        let found = VERSION_NUMBER.find(text)?;
        let parts = found
            .as_str()
            .split('.')
            .map(str::parse)
            .collect::<Result<Vec<u64>, _>>()
            .ok()?;
        Some(Self(parts))
    }

    #[must_use]
    pub fn minimum() -> Self {
        Self(MIN_PYLINT_VERSION.to_vec())
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        *self >= Self::minimum()
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// A pylint executable that passed the version gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    path: PathBuf,
    version: Version,
}

impl Executable {
    #[must_use]
    pub fn new(path: PathBuf, version: Version) -> Self {
        Self { path, version }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }
}

/// Finds the executable a run should use. Blocking; callers run it off the
/// async executor.
pub trait ExecutableResolver: Send + Sync {
    fn resolve(&self, settings: &LintSettings) -> Option<Executable>;
}

/// Default resolver: the configured `pylint_bin`, else whatever pylint the
/// configured Python interpreter has installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PylintLocator;

impl ExecutableResolver for PylintLocator {
    fn resolve(&self, settings: &LintSettings) -> Option<Executable> {
        if let Some(bin) = &settings.pylint_bin {
            match checked_executable(bin) {
                Ok(exe) => {
                    tracing::info!(path = %exe.path().display(), version = %exe.version(), "Using configured pylint");
                    return Some(exe);
                }
                Err(e) => {
                    tracing::warn!("Configured pylint_bin {} unusable, trying autodiscover: {e:#}", bin.display());
                }
            }
        }

        tracing::info!(python = %settings.python_bin, "Autodiscovering pylint");
        match autodiscover(&settings.python_bin) {
            Ok(exe) => {
                tracing::info!(path = %exe.path().display(), version = %exe.version(), "Using autodiscovered pylint");
                Some(exe)
            }
            Err(e) => {
                tracing::warn!("Pylint autodiscover failed: {e:#}");
                if let Ok(python) = which::which(&settings.python_bin) {
                    tracing::warn!("Maybe pylint isn't installed for {}", python.display());
                }
                None
            }
        }
    }
}

/// Resolve `bin` (bare names go through `PATH`) and gate it on its version.
fn checked_executable(bin: &Path) -> Result<Executable> {
    let path = which::which(bin).with_context(|| format!("{} not found", bin.display()))?;
    let version = query_version(&path)?;
    if !version.is_supported() {
        bail!(
            "{} is version {version}, need >= {}",
            path.display(),
            Version::minimum()
        );
    }
    Ok(Executable::new(path, version))
}

fn query_version(bin: &Path) -> Result<Version> {
    let output = Command::new(bin)
        .arg("--version")
        .output()
        .with_context(|| format!("running {} --version", bin.display()))?;
    if !output.status.success() {
        bail!("{} --version exited with {}", bin.display(), output.status);
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Version::find_in(&text).with_context(|| format!("no version number in {text:?}"))
}

fn autodiscover(python_bin: &str) -> Result<Executable> {
    let output = Command::new(python_bin)
        .args(["-c", AUTODISCOVER_SCRIPT])
        .output()
        .with_context(|| format!("running {python_bin}"))?;
    if !output.status.success() {
        bail!(
            "{python_bin} could not import pylint: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let module_dir = String::from_utf8_lossy(&output.stdout);
    checked_executable(&pylint_bin_from_module(Path::new(module_dir.trim())))
}

/// `<prefix>/lib/pythonX.Y/site-packages/pylint` → `<prefix>/bin/pylint`.
fn pylint_bin_from_module(module_dir: &Path) -> PathBuf {
    normalize_path(&module_dir.join("../../../../bin/pylint"))
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for c in path.components() {
        match c {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}
