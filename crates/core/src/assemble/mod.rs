use crate::tts::AudioHandle;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

/// Deadline for the final concatenation call.
pub const CONCAT_TIMEOUT: Duration = Duration::from_secs(300);

const MANIFEST_NAME: &str = "concat.txt";

#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    #[error("no segment artifacts to assemble")]
    NoSegments,
    #[error("failed to launch transcoder: {0}")]
    Spawn(String),
    #[error("transcoder exited with {status}: {detail}")]
    TranscoderFailed {
        status: std::process::ExitStatus,
        detail: String,
    },
    #[error("concatenation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("transcoder produced no artifact at {}", .0.display())]
    OutputMissing(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Capability interface over the external audio transcoder's
/// lossless-copy concatenation mode.
pub trait Concatenator: Send + Sync {
    fn concatenate(
        &self,
        handles: Vec<AudioHandle>,
        output: PathBuf,
    ) -> BoxFuture<'_, Result<(), AssemblyError>>;
}

/// Final artifact, flagged when the transcoder failed and only the
/// first segment could be delivered.
#[derive(Debug, PartialEq, Eq)]
pub enum Assembly {
    Full(AudioHandle),
    Degraded(AudioHandle),
}

impl Assembly {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub fn into_artifact(self) -> AudioHandle {
        match self {
            Self::Full(handle) | Self::Degraded(handle) => handle,
        }
    }
}

/// Joins the ordered segment artifacts into one file at `output`.
///
/// A single handle is copied straight through without invoking the
/// transcoder. On transcoder failure the first segment's artifact is
/// delivered instead and the result is marked degraded; assembly
/// itself only errors when even that copy is impossible.
pub async fn assemble<C>(
    concatenator: &C,
    handles: Vec<AudioHandle>,
    output: PathBuf,
) -> Result<Assembly, AssemblyError>
where
    C: Concatenator + ?Sized,
{
    match handles.len() {
        0 => Err(AssemblyError::NoSegments),
        1 => {
            tokio::fs::copy(handles[0].path(), &output).await?;
            Ok(Assembly::Full(AudioHandle::new(output)))
        }
        count => match concatenator.concatenate(handles.clone(), output.clone()).await {
            Ok(()) => {
                for handle in &handles {
                    let _ = tokio::fs::remove_file(handle.path()).await;
                }
                info!(segments = count, output = %output.display(), "concatenated segments");
                Ok(Assembly::Full(AudioHandle::new(output)))
            }
            Err(e) => {
                warn!(error = %e, "concatenation failed, falling back to first segment");
                tokio::fs::copy(handles[0].path(), &output).await?;
                Ok(Assembly::Degraded(AudioHandle::new(output)))
            }
        },
    }
}

/// Escapes a path for the transcoder's `file '<path>'` manifest syntax.
/// Backslashes are normalized to forward slashes and embedded single
/// quotes become `'\''`.
fn escape_manifest_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', "'\\''")
}

fn manifest_contents(handles: &[AudioHandle]) -> String {
    let mut contents = String::new();
    for handle in handles {
        contents.push_str("file '");
        contents.push_str(&escape_manifest_path(handle.path()));
        contents.push_str("'\n");
    }
    contents
}

/// Concatenator invoking ffmpeg's concat demuxer in stream-copy mode.
#[derive(Clone, Debug)]
pub struct FfmpegConcatenator {
    program: PathBuf,
}

impl FfmpegConcatenator {
    #[must_use]
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

impl Concatenator for FfmpegConcatenator {
    fn concatenate(
        &self,
        handles: Vec<AudioHandle>,
        output: PathBuf,
    ) -> BoxFuture<'_, Result<(), AssemblyError>> {
        use futures::FutureExt;

        let program = self.program.clone();

        async move {
            let manifest_dir = handles
                .first()
                .and_then(|h| h.path().parent().map(Path::to_path_buf))
                .unwrap_or_else(std::env::temp_dir);
            let manifest = manifest_dir.join(MANIFEST_NAME);
            tokio::fs::write(&manifest, manifest_contents(&handles)).await?;

            tracing::debug!(
                segments = handles.len(),
                manifest = %manifest.display(),
                "running transcoder concat"
            );

            let result = run_concat(&program, &manifest, &output).await;
            let _ = tokio::fs::remove_file(&manifest).await;
            result?;

            if tokio::fs::metadata(&output).await.is_err() {
                return Err(AssemblyError::OutputMissing(output));
            }
            Ok(())
        }
        .boxed()
    }
}

async fn run_concat(program: &Path, manifest: &Path, output: &Path) -> Result<(), AssemblyError> {
    let child = Command::new(program)
        .arg("-f")
        .arg("concat")
        .arg("-safe")
        .arg("0")
        .arg("-i")
        .arg(manifest)
        .arg("-c")
        .arg("copy")
        .arg("-y")
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AssemblyError::Spawn(format!("{}: {e}", program.display())))?;

    let result = match timeout(CONCAT_TIMEOUT, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => return Err(AssemblyError::TimedOut(CONCAT_TIMEOUT)),
    };

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(AssemblyError::TranscoderFailed {
            status: result.status,
            detail: stderr.trim().to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[derive(Clone)]
    struct ByteJoinConcatenator;

    impl Concatenator for ByteJoinConcatenator {
        fn concatenate(
            &self,
            handles: Vec<AudioHandle>,
            output: PathBuf,
        ) -> BoxFuture<'_, Result<(), AssemblyError>> {
            async move {
                let mut joined = Vec::new();
                for handle in &handles {
                    joined.extend(tokio::fs::read(handle.path()).await?);
                }
                tokio::fs::write(&output, joined).await?;
                Ok(())
            }
            .boxed()
        }
    }

    #[derive(Clone)]
    struct FailingConcatenator;

    impl Concatenator for FailingConcatenator {
        fn concatenate(
            &self,
            _handles: Vec<AudioHandle>,
            _output: PathBuf,
        ) -> BoxFuture<'_, Result<(), AssemblyError>> {
            async { Err(AssemblyError::Spawn("transcoder unavailable".into())) }.boxed()
        }
    }

    #[derive(Clone)]
    struct PanickingConcatenator;

    impl Concatenator for PanickingConcatenator {
        fn concatenate(
            &self,
            _handles: Vec<AudioHandle>,
            _output: PathBuf,
        ) -> BoxFuture<'_, Result<(), AssemblyError>> {
            panic!("transcoder must not be called for a single segment");
        }
    }

    async fn write_segments(dir: &Path, payloads: &[&str]) -> Vec<AudioHandle> {
        let mut handles = Vec::new();
        for (i, payload) in payloads.iter().enumerate() {
            let path = dir.join(format!("seg{i}.mp3"));
            tokio::fs::write(&path, payload.as_bytes()).await.unwrap();
            handles.push(AudioHandle::new(path));
        }
        handles
    }

    #[tokio::test]
    async fn multiple_segments_are_joined_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let handles = write_segments(dir.path(), &["one", "two", "three"]).await;
        let output = dir.path().join("final.mp3");

        let assembly = assemble(&ByteJoinConcatenator, handles, output.clone())
            .await
            .unwrap();

        assert!(!assembly.is_degraded());
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"onetwothree");
    }

    #[tokio::test]
    async fn intermediates_are_removed_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let handles = write_segments(dir.path(), &["a", "b"]).await;
        let first = handles[0].path().to_path_buf();
        let output = dir.path().join("final.mp3");

        assemble(&ByteJoinConcatenator, handles, output).await.unwrap();

        assert!(tokio::fs::metadata(&first).await.is_err());
    }

    #[tokio::test]
    async fn transcoder_failure_falls_back_to_first_segment() {
        let dir = tempfile::tempdir().unwrap();
        let handles = write_segments(dir.path(), &["first", "second"]).await;
        let output = dir.path().join("final.mp3");

        let assembly = assemble(&FailingConcatenator, handles, output.clone())
            .await
            .unwrap();

        assert!(assembly.is_degraded());
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn single_segment_skips_the_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let handles = write_segments(dir.path(), &["solo"]).await;
        let output = dir.path().join("final.mp3");

        let assembly = assemble(&PanickingConcatenator, handles, output.clone())
            .await
            .unwrap();

        assert!(!assembly.is_degraded());
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"solo");
    }

    #[tokio::test]
    async fn empty_handle_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("final.mp3");
        let result = assemble(&ByteJoinConcatenator, Vec::new(), output).await;
        assert!(matches!(result, Err(AssemblyError::NoSegments)));
    }

    #[test]
    fn manifest_paths_are_escaped() {
        assert_eq!(
            escape_manifest_path(Path::new(r"C:\temp\seg0.mp3")),
            "C:/temp/seg0.mp3"
        );
        assert_eq!(
            escape_manifest_path(Path::new("/tmp/it's here.mp3")),
            "/tmp/it'\\''s here.mp3"
        );
    }

    #[test]
    fn manifest_lists_one_file_per_line() {
        let handles = vec![
            AudioHandle::new(PathBuf::from("/tmp/a.mp3")),
            AudioHandle::new(PathBuf::from("/tmp/b.mp3")),
        ];
        assert_eq!(
            manifest_contents(&handles),
            "file '/tmp/a.mp3'\nfile '/tmp/b.mp3'\n"
        );
    }
}
