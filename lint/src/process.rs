//! Building and spawning the pylint command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::process::Command;

use crate::parser::MSG_TEMPLATE;
use crate::resolve::Executable;
use crate::types::LintSettings;

/// Stderr lines starting with this are informational, not failures.
const INFORMATIONAL_STDERR_PREFIX: &str = "Using config file";

/// A fully resolved pylint invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl AnalyzerCommand {
    /// `<bin> -r no --msg-template <tpl> [-d <list>] [<extra>...] <file>`
    #[must_use]
    pub fn build(executable: &Executable, settings: &LintSettings, file: &Path) -> Self {
        let mut args: Vec<OsString> = vec![
            "-r".into(),
            "no".into(),
            "--msg-template".into(),
            MSG_TEMPLATE.into(),
        ];
        if !settings.disable.is_empty() {
            args.push("-d".into());
            args.push(settings.disable.join(",").into());
        }
        args.extend(settings.extra_args.iter().map(OsString::from));
        args.push(file.as_os_str().to_owned());

        Self {
            program: executable.path().to_path_buf(),
            args,
        }
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

/// Everything a finished pylint process produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// Stderr lines that indicate pylint itself failed.
    ///
    /// Pylint's exit status encodes which message categories were emitted,
    /// so it says nothing about whether the run worked; stderr does.
    #[must_use]
    pub fn fatal_stderr_lines(&self) -> Vec<&str> {
        self.stderr
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with(INFORMATIONAL_STDERR_PREFIX))
            .collect()
    }
}

/// Runs an [`AnalyzerCommand`] to completion and collects its output.
///
/// The returned future owns the child; dropping it before completion must
/// kill the process.
pub trait AnalyzerSpawner: Send + Sync {
    fn spawn(&self, command: AnalyzerCommand) -> BoxFuture<'static, std::io::Result<ProcessOutput>>;
}

/// Spawns pylint as a real child process via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl AnalyzerSpawner for TokioSpawner {
    fn spawn(&self, command: AnalyzerCommand) -> BoxFuture<'static, std::io::Result<ProcessOutput>> {
        async move {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            tracing::debug!(program = %command.program.display(), args = ?command.args, "Spawning pylint");
            let output = cmd.output().await?;

            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            })
        }
        .boxed()
    }
}
