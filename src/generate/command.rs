use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt as _;

use super::TextGenerator;
use crate::error::GenerateError;

const ENGINE: &str = "command";

/// Runs an external program with the prompt on stdin and takes its stdout as the recap.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

#[async_trait]
impl TextGenerator for CommandGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        tracing::info!(engine = ENGINE, command = %self.program, "generate recap");

        match tokio::time::timeout(self.timeout, self.run(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(failed(format!(
                "command timed out after {}s: {}",
                self.timeout.as_secs(),
                self.program
            ))),
        }
    }
}

impl CommandGenerator {
    async fn run(&self, prompt: &str) -> Result<String, GenerateError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| failed(format!("spawn {}: {err}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| failed("open command stdin".to_owned()))?;
        // Stdout must be drained while the prompt is written, or a filter blocks on a full pipe.
        let input = prompt.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| failed(format!("wait command: {err}")))?;
        match writer.await {
            Ok(Ok(())) => {}
            // The program may exit without reading all of its input.
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(err)) => return Err(failed(format!("write command stdin: {err}"))),
            Err(err) => return Err(failed(format!("stdin writer task: {err}"))),
        }

        if !output.status.success() {
            return Err(failed(format!(
                "command failed: {} ({})",
                self.program, output.status
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| failed("command stdout is not valid UTF-8".to_owned()))?;
        if stdout.trim().is_empty() {
            return Err(GenerateError::EmptyOutput { engine: ENGINE });
        }
        Ok(stdout)
    }
}

fn failed(message: String) -> GenerateError {
    GenerateError::Request {
        engine: ENGINE,
        message,
    }
}
