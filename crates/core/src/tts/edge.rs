use crate::tts::{AudioHandle, SpeechSynthesizer, SynthesisRequest, TtsError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;

/// Synthesizer backed by an external helper binary, invoked once per
/// attempt as `<program> <output> <voice> <text> <rate> <pitch>`.
#[derive(Clone, Debug)]
pub struct EdgeTtsClient {
    program: PathBuf,
}

impl EdgeTtsClient {
    #[must_use]
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

impl SpeechSynthesizer for EdgeTtsClient {
    fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> BoxFuture<'_, Result<AudioHandle, TtsError>> {
        let program = self.program.clone();

        async move {
            tracing::debug!(
                voice = %request.voice.as_str(),
                rate = %request.rate,
                pitch = %request.pitch,
                output = %request.output.display(),
                "spawning synthesis helper"
            );

            let child = Command::new(&program)
                .arg(&request.output)
                .arg(request.voice.as_str())
                .arg(&request.text)
                .arg(&request.rate)
                .arg(&request.pitch)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    let path = program.display();
                    TtsError::Spawn(format!("{path}: {e}"))
                })?;

            // Dropping the wait future on timeout kills the child via
            // kill_on_drop.
            let output = match timeout(request.timeout, child.wait_with_output()).await {
                Ok(result) => result
                    .map_err(|e| TtsError::Other(format!("synthesis helper failed: {e}")))?,
                Err(_) => return Err(TtsError::TimedOut(request.timeout)),
            };

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let detail = if stderr.trim().is_empty() {
                    stdout.trim().to_owned()
                } else {
                    stderr.trim().to_owned()
                };
                return Err(TtsError::Failed {
                    status: output.status,
                    detail,
                });
            }

            // A zero exit without the artifact still counts as a failed
            // attempt.
            match tokio::fs::metadata(&request.output).await {
                Ok(_) => Ok(AudioHandle::new(request.output)),
                Err(_) => Err(TtsError::ArtifactMissing(request.output)),
            }
        }
        .boxed()
    }
}
