//! Subprocess executor for command stages.
//!
//! Spawns an external generator, writes one JSON request to its stdin and
//! parses its stdout as NDJSON, one value per non-empty line.

use crate::stages::base::StageError;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_stream::Stream;

/// Number of trailing stderr bytes quoted in an exit-status error.
const STDERR_TAIL: usize = 2048;

/// A fully specified process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Run `invocation`, feeding it `request`, and stream its stdout lines as JSON.
    ///
    /// The stream yields `StageError::MalformedOutput` for a line that is not
    /// valid JSON and ends with `StageError::Execution` when the process
    /// cannot be spawned or exits unsuccessfully.
    pub fn execute(
        invocation: Invocation,
        request: serde_json::Value,
    ) -> Pin<Box<dyn Stream<Item = Result<serde_json::Value, StageError>> + Send>> {
        let stream = async_stream::stream! {
            let mut cmd = Command::new(&invocation.program);
            cmd.args(&invocation.args);
            if let Some(dir) = &invocation.working_dir {
                cmd.current_dir(dir);
            }
            cmd.stdin(Stdio::piped());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.kill_on_drop(true);

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    yield Err(StageError::Execution(format!(
                        "Failed to spawn command '{}': {}",
                        invocation.program, e
                    )));
                    return;
                }
            };

            let (Some(mut stdin), Some(stdout), Some(mut stderr)) =
                (child.stdin.take(), child.stdout.take(), child.stderr.take())
            else {
                yield Err(StageError::Execution(
                    "Failed to capture process pipes".to_string()
                ));
                return;
            };

            // Write the request concurrently so a child that streams output
            // before reading stdin cannot deadlock on a full pipe.
            let body = request.to_string();
            let writer = tokio::spawn(async move {
                // A child that never reads stdin closes the pipe; not an error.
                let _ = stdin.write_all(body.as_bytes()).await;
                let _ = stdin.write_all(b"\n").await;
                let _ = stdin.shutdown().await;
            });
            let stderr_reader = tokio::spawn(async move {
                let mut buffer = Vec::new();
                let _ = stderr.read_to_end(&mut buffer).await;
                buffer
            });

            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<serde_json::Value>(&line) {
                            Ok(value) => yield Ok(value),
                            Err(e) => yield Err(StageError::MalformedOutput(format!(
                                "Failed to parse JSON: {} (line: {})",
                                e, line
                            ))),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(StageError::Execution(format!("Failed to read stdout: {}", e)));
                        break;
                    }
                }
            }

            let _ = writer.await;
            let stderr_bytes = stderr_reader.await.unwrap_or_default();

            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    let stderr_text = String::from_utf8_lossy(&stderr_bytes);
                    let tail = tail_chars(stderr_text.trim(), STDERR_TAIL);
                    yield Err(StageError::Execution(format!(
                        "Command '{}' exited with {}: {}",
                        invocation.program, status, tail
                    )));
                }
                Err(e) => {
                    yield Err(StageError::Execution(format!(
                        "Failed to wait for command '{}': {}",
                        invocation.program, e
                    )));
                }
            }
        };

        Box::pin(stream)
    }
}

fn tail_chars(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
