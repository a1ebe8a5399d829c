use crate::assemble::{assemble, AssemblyError, Concatenator};
use crate::config::{AppConfig, ChunkThreshold, MAX_TEXT_CHARS};
use crate::emotion::Emotion;
use crate::progress::{ProgressTracker, EVICTION_GRACE};
use crate::segment::{chunk_segments, parse_segments, TextSegment};
use crate::tts::{
    format_pitch, format_rate, AudioHandle, SpeechSynthesizer, SynthesisRequest, VoiceId,
    PREVIEW_TIMEOUT, SEGMENT_TIMEOUT,
};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Attempts per segment before the whole task fails.
pub const MAX_ATTEMPTS: u32 = 10;
/// Fixed text spoken by the preview interface.
pub const PREVIEW_TEXT: &str = "Hello, this is a voice preview.";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no text provided")]
    EmptyText,
    #[error("text too long: {len} characters exceeds the {max} character limit")]
    TextTooLong { len: usize, max: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(
        "synthesis failed for segment {index} (emotion: {emotion}) after {attempts} attempts: {detail}"
    )]
    Synthesis {
        index: usize,
        emotion: Emotion,
        attempts: u32,
        detail: String,
    },
    #[error("preview synthesis failed: {0}")]
    Preview(String),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One end-to-end generation request.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub text: String,
    pub voice: VoiceId,
    /// Defaults to a timestamp-derived id when absent.
    pub task_id: Option<String>,
}

/// A request after validation and segmentation, ready to drive.
#[derive(Clone, Debug)]
pub struct SynthesisTask {
    pub task_id: String,
    pub segments: Vec<TextSegment>,
}

impl SynthesisTask {
    pub fn total(&self) -> usize {
        self.segments.len()
    }
}

/// Successful generation outcome. `degraded` is set when concatenation
/// failed and only the first segment's audio was delivered.
#[derive(Debug)]
pub struct Generation {
    pub task_id: String,
    pub artifact: AudioHandle,
    pub segments: usize,
    pub degraded: bool,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub chunk_threshold: ChunkThreshold,
    pub max_text_chars: usize,
    pub eviction_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: ChunkThreshold::default(),
            max_text_chars: MAX_TEXT_CHARS,
            eviction_grace: EVICTION_GRACE,
        }
    }
}

impl PipelineConfig {
    pub fn from_app(app: &AppConfig) -> Self {
        Self {
            chunk_threshold: app.chunk_threshold,
            ..Default::default()
        }
    }
}

/// Inter-segment pacing wait, keyed by the zero-based segment position.
/// The first segment is never paced.
pub fn pacing_delay(index: usize) -> Duration {
    const BASE_MS: u64 = 800;
    const STEP_MS: u64 = 100;
    const STEP_CAP_MS: u64 = 1_200;
    const MAX_MS: u64 = 2_000;

    let extra = (index as u64).saturating_mul(STEP_MS).min(STEP_CAP_MS);
    Duration::from_millis((BASE_MS + extra).min(MAX_MS))
}

/// Exponential backoff before retry number `retry` (zero-based), capped
/// at 20 seconds.
pub fn backoff_delay(retry: u32) -> Duration {
    let secs = 2u64.saturating_mul(1u64 << retry.min(10));
    Duration::from_secs(secs.min(20))
}

pub fn validate_text(text: &str, max_chars: usize) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(ValidationError::TextTooLong {
            len,
            max: max_chars,
        });
    }
    Ok(())
}

/// Timestamp-derived task id (milliseconds since the UNIX epoch), used
/// when a request carries none. Callers that poll progress should mint
/// the id themselves and pass it in.
pub fn default_task_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis().to_string()
}

fn text_preview(text: &str) -> String {
    text.chars().take(48).collect()
}

/// Drives one generation end to end: parse, chunk, synthesize each
/// segment in order under pacing and retry, then assemble.
pub struct Pipeline<S, C> {
    pub synthesizer: S,
    pub concatenator: C,
    pub progress: ProgressTracker,
    pub config: PipelineConfig,
}

impl<S, C> Pipeline<S, C>
where
    S: SpeechSynthesizer,
    C: Concatenator,
{
    pub async fn generate(
        &self,
        request: GenerationRequest,
        output: &Path,
    ) -> Result<Generation, GenerationError> {
        validate_text(&request.text, self.config.max_text_chars)?;

        let task_id = request.task_id.clone().unwrap_or_else(default_task_id);
        let segments = chunk_segments(
            parse_segments(&request.text),
            self.config.chunk_threshold.chars(),
        );
        let task = SynthesisTask { task_id, segments };

        info!(
            task_id = %task.task_id,
            voice = %request.voice.as_str(),
            segments = task.total(),
            chars = request.text.chars().count(),
            "starting generation"
        );

        self.progress.start(&task.task_id, task.total()).await;
        let outcome = self.run_task(&task, &request.voice, output).await;
        self.progress.finish(&task.task_id, self.config.eviction_grace);

        match &outcome {
            Ok(generation) => info!(
                task_id = %generation.task_id,
                degraded = generation.degraded,
                output = %output.display(),
                "generation finished"
            ),
            Err(e) => warn!(task_id = %task.task_id, error = %e, "generation failed"),
        }
        outcome
    }

    /// Single-attempt preview synthesis: fixed text, neutral prosody,
    /// short deadline, no retries.
    pub async fn preview(
        &self,
        voice: &VoiceId,
        output: &Path,
    ) -> Result<AudioHandle, GenerationError> {
        info!(voice = %voice.as_str(), "generating voice preview");
        let request = SynthesisRequest {
            output: output.to_path_buf(),
            voice: voice.clone(),
            text: PREVIEW_TEXT.to_owned(),
            rate: format_rate(0),
            pitch: format_pitch(0),
            timeout: PREVIEW_TIMEOUT,
        };
        self.synthesizer
            .synthesize(request)
            .await
            .map_err(|e| GenerationError::Preview(e.to_string()))
    }

    async fn run_task(
        &self,
        task: &SynthesisTask,
        voice: &VoiceId,
        output: &Path,
    ) -> Result<Generation, GenerationError> {
        // Per-task scratch dir; dropped (and cleaned) on every exit path.
        let workdir = tempfile::Builder::new().prefix("emotts-").tempdir()?;

        let handles = self.synthesize_all(task, voice, workdir.path()).await?;
        let assembly = assemble(&self.concatenator, handles, output.to_path_buf()).await?;

        let degraded = assembly.is_degraded();
        Ok(Generation {
            task_id: task.task_id.clone(),
            artifact: assembly.into_artifact(),
            segments: task.total(),
            degraded,
        })
    }

    async fn synthesize_all(
        &self,
        task: &SynthesisTask,
        voice: &VoiceId,
        workdir: &Path,
    ) -> Result<Vec<AudioHandle>, GenerationError> {
        let mut handles = Vec::with_capacity(task.total());

        for segment in &task.segments {
            if segment.order > 0 {
                let delay = pacing_delay(segment.order);
                debug!(
                    segment = segment.order,
                    delay_ms = delay.as_millis() as u64,
                    "pacing before next synthesis call"
                );
                sleep(delay).await;
            }

            let prosody = segment.emotion.prosody();
            let request = SynthesisRequest {
                output: workdir.join(format!("seg{:04}.mp3", segment.order)),
                voice: voice.clone(),
                text: segment.text.clone(),
                rate: format_rate(prosody.rate_delta_percent),
                pitch: format_pitch(prosody.pitch_delta_percent),
                timeout: SEGMENT_TIMEOUT,
            };
            debug!(
                segment = segment.order,
                emotion = %segment.emotion,
                rate = %request.rate,
                pitch = %request.pitch,
                text = %text_preview(&segment.text),
                "synthesizing segment"
            );

            let handle = self.synthesize_with_retry(request, segment).await?;
            self.progress.update(&task.task_id, segment.order + 1).await;
            handles.push(handle);
        }

        Ok(handles)
    }

    /// Bounded retry loop for one segment. Every attempt failure is
    /// absorbed until the attempt budget runs out, which is fatal for
    /// the whole task.
    async fn synthesize_with_retry(
        &self,
        request: SynthesisRequest,
        segment: &TextSegment,
    ) -> Result<AudioHandle, GenerationError> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let wait = backoff_delay(attempt - 1);
                warn!(
                    segment = segment.order,
                    attempt = attempt + 1,
                    max_attempts = MAX_ATTEMPTS,
                    wait_s = wait.as_secs(),
                    "retrying segment synthesis"
                );
                sleep(wait).await;
            }

            match self.synthesizer.synthesize(request.clone()).await {
                Ok(handle) => {
                    if attempt > 0 {
                        debug!(
                            segment = segment.order,
                            attempt = attempt + 1,
                            "segment synthesis recovered"
                        );
                    }
                    return Ok(handle);
                }
                Err(e) => {
                    debug!(segment = segment.order, error = %e, "synthesis attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(GenerationError::Synthesis {
            index: segment.order,
            emotion: segment.emotion,
            attempts: MAX_ATTEMPTS,
            detail: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_owned()),
        })
    }
}
