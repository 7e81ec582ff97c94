//! Local process provider: prompt on stdin, completion on stdout

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::GenerationError;

/// Runs a local program (e.g. `ollama run mistral`) once per completion
pub struct CommandLlm {
    program: String,
    args: Vec<String>,
}

impl CommandLlm {
    pub fn new(program: String, args: Vec<String>) -> Self {
        info!("Command LLM provider: {} {}", program, args.join(" "));
        Self { program, args }
    }

    /// Spawn the program, feed it `prompt` and collect stdout.
    ///
    /// The child is killed if this future is dropped, so an outer timeout
    /// never leaves a stray process behind.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(GenerationError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading is judged by its exit status below
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(GenerationError::Transport(format!("failed to write prompt: {}", e)));
                }
            }
            // Dropping stdin closes the pipe so the child sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::Transport(format!("failed to read output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("{} exited with {:?}: {}", self.program, output.status.code(), stderr);
            return Err(GenerationError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
