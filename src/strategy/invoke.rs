//! External engine invocations: one subprocess, one hard timeout.
//!
//! Both subprocess strategies funnel through [`EngineInvocation`] so the
//! process-control rules live in one place: the child is spawned with
//! piped stdio, killed if the future is dropped, and terminated at the
//! wall-clock deadline. A timeout is an ordinary per-item failure — no
//! retry, no escalation.

use crate::error::ConvertError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// An ephemeral description of one external engine run.
#[derive(Debug)]
pub struct EngineInvocation {
    /// Engine name used in errors and logs.
    pub engine: &'static str,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Variables set on top of the inherited environment.
    pub envs: Vec<(OsString, OsString)>,
    /// Working directory; `None` inherits the process's.
    pub current_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl EngineInvocation {
    pub fn new(engine: &'static str, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            engine,
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run to completion or to the deadline, capturing stdio.
    ///
    /// A non-zero exit is *not* an error here: LibreOffice in particular
    /// exits non-zero on warnings while still producing output, so each
    /// strategy judges the exit status against what landed on disk.
    pub async fn run(self) -> Result<Output, ConvertError> {
        debug!(
            engine = self.engine,
            program = %self.program.display(),
            args = ?self.args,
            "invoking external engine"
        );

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| ConvertError::EngineFailed {
            engine: self.engine,
            detail: format!("failed to start '{}': {e}", self.program.display()),
        })?;

        let secs = self.timeout.as_secs();
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConvertError::EngineTimeout {
                engine: self.engine,
                secs,
            })?
            .map_err(|e| ConvertError::EngineFailed {
                engine: self.engine,
                detail: e.to_string(),
            })?;

        debug!(
            engine = self.engine,
            status = %output.status,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "engine finished"
        );
        Ok(output)
    }
}

/// Prepend `dir` to the inherited `PATH` value.
pub(crate) fn prepend_path(dir: &std::path::Path) -> OsString {
    let mut value = OsString::from(dir);
    value.push(":");
    value.push(std::env::var_os("PATH").unwrap_or_default());
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_a_fast_process() {
        let output = EngineInvocation::new("echo", "echo", Duration::from_secs(5))
            .arg("hello")
            .run()
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn missing_binary_is_an_engine_failure() {
        let err = EngineInvocation::new(
            "ghost",
            "/definitely/not/a/real/binary",
            Duration::from_secs(1),
        )
        .run()
        .await
        .unwrap_err();
        assert!(matches!(err, ConvertError::EngineFailed { engine: "ghost", .. }));
    }

    #[tokio::test]
    async fn slow_process_hits_the_deadline() {
        let err = EngineInvocation::new("sleeper", "sleep", Duration::from_millis(200))
            .arg("5")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::EngineTimeout { engine: "sleeper", secs: 0 }
        ));
    }
}
