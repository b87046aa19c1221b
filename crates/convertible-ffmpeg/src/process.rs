//! Builder for executing external tool commands.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::request::OutputSink;
use crate::{Error, Result};

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use convertible_ffmpeg::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> convertible_ffmpeg::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "quiet", "-show_format", "-of", "json"])
///     .arg("/path/to/video.mkv")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time. `None` waits indefinitely.
    pub fn timeout(&mut self, d: Option<Duration>) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Shell-like rendering of the invocation, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if spawning fails, the process times out,
    /// or it exits with a non-zero status (message includes stderr).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let name = self.program_name();

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::execution(format!("failed to spawn {name}: {e}")))?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| Error::execution(format!("{name} timed out after {limit:?}")))?,
            None => child.wait_with_output().await,
        };
        let output =
            waited.map_err(|e| Error::execution(format!("I/O error waiting for {name}: {e}")))?;

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(Error::execution(format!(
                "{name} exited with status {}: {}",
                output.status,
                tool_output.stderr.trim()
            )));
        }

        Ok(tool_output)
    }

    /// Execute the command, feeding each stderr line to `on_stderr` and
    /// copying stdout into `sink` when one is given.
    ///
    /// Returns the exit status; a non-zero status is not an error here so the
    /// caller can build its own message from what it saw on stderr.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if spawning fails, the timeout expires
    /// (the process is killed), or reading/writing the pipes fails.
    pub async fn execute_streaming(
        &self,
        sink: Option<OutputSink>,
        on_stderr: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ExitStatus> {
        let name = self.program_name();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(if sink.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::execution(format!("failed to spawn {name}: {e}")))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let copy = async move {
            if let (Some(mut stdout), Some(mut sink)) = (stdout, sink) {
                tokio::io::copy(&mut stdout, &mut sink).await?;
                sink.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let read = async {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Some(line) = lines.next_line().await? {
                    on_stderr(&line);
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let work = async {
            let (copied, read) = tokio::join!(copy, read);
            let status = child.wait().await;
            (copied, read, status)
        };

        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.ok(),
            None => Some(work.await),
        };
        let Some((copied, read, status)) = finished else {
            if let Err(e) = child.kill().await {
                tracing::warn!("failed to kill {name}: {e}");
            }
            return Err(Error::execution(format!(
                "{name} timed out after {:?}",
                self.timeout.unwrap_or_default()
            )));
        };

        let status =
            status.map_err(|e| Error::execution(format!("I/O error waiting for {name}: {e}")))?;
        read.map_err(|e| Error::execution(format!("failed to read {name} output: {e}")))?;
        if status.success() {
            copied.map_err(|e| Error::execution(format!("failed to write output: {e}")))?;
        }

        Ok(status)
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.:/=,%+@".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_spaces() {
        let mut cmd = ToolCommand::new(PathBuf::from("ffmpeg"));
        cmd.args(["-i", "my movie.avi", "-vf", "scale=1280:-2", "out.mp4"]);
        assert_eq!(
            cmd.command_line(),
            "ffmpeg -i 'my movie.avi' -vf scale=1280:-2 out.mp4"
        );
    }

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("failed to spawn"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be killed well before 10 seconds.
        let mut lines = Vec::new();
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Some(Duration::from_millis(100)))
            .execute_streaming(None, &mut |line: &str| lines.push(line.to_string()))
            .await;
        if let Err(err) = result {
            assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
        }
    }

    #[tokio::test]
    async fn streaming_collects_stderr_and_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.txt");
        let file = tokio::fs::File::create(&out_path).await.unwrap();

        let mut lines = Vec::new();
        let result = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo data; echo one >&2; echo two >&2"])
            .execute_streaming(Some(Box::new(file)), &mut |line: &str| {
                lines.push(line.to_string())
            })
            .await;

        // Skip where no POSIX shell exists.
        if let Ok(status) = result {
            assert!(status.success());
            assert_eq!(lines, vec!["one", "two"]);
            let written = std::fs::read_to_string(&out_path).unwrap();
            assert_eq!(written.trim(), "data");
        }
    }

    #[tokio::test]
    async fn streaming_reports_failure_status() {
        let mut lines = Vec::new();
        let result = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo bad >&2; exit 3"])
            .execute_streaming(None, &mut |line: &str| lines.push(line.to_string()))
            .await;
        if let Ok(status) = result {
            assert_eq!(status.code(), Some(3));
            assert_eq!(lines, vec!["bad"]);
        }
    }
}
