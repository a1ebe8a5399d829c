mod edge;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use edge::EdgeTtsClient;

/// Deadline for one segment synthesis call.
pub const SEGMENT_TIMEOUT: Duration = Duration::from_secs(90);
/// Deadline for a voice preview call.
pub const PREVIEW_TIMEOUT: Duration = Duration::from_secs(15);
/// Conversion factor from a pitch percentage delta to Hz.
pub const PITCH_HZ_PER_PERCENT: f64 = 1.0;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceId(pub String);

impl VoiceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VoiceId {
    fn default() -> Self {
        Self(crate::config::DEFAULT_VOICE.to_owned())
    }
}

/// One synthesis attempt: write audio for `text` spoken by `voice` to
/// `output`, modulated by the pre-derived `rate` (`±N%`) and `pitch`
/// (`±NHz`) strings, within `timeout`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub output: PathBuf,
    pub voice: VoiceId,
    pub text: String,
    pub rate: String,
    pub pitch: String,
    pub timeout: Duration,
}

/// Opaque reference to one segment's synthesized audio artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioHandle {
    path: PathBuf,
}

impl AudioHandle {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TtsError {
    #[error("failed to launch synthesis helper: {0}")]
    Spawn(String),
    #[error("synthesis helper exited with {status}: {detail}")]
    Failed {
        status: std::process::ExitStatus,
        detail: String,
    },
    #[error("synthesis timed out after {0:?}")]
    TimedOut(Duration),
    #[error("no audio artifact at {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("{0}")]
    Other(String),
}

/// Capability interface over the external speech-synthesis engine.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, request: SynthesisRequest)
        -> BoxFuture<'_, Result<AudioHandle, TtsError>>;
}

/// Formats a rate delta as the `±N%` string the synthesis helper expects.
pub fn format_rate(delta_percent: i32) -> String {
    format!("{delta_percent:+}%")
}

/// Formats a pitch delta as the helper's absolute `±NHz` form.
pub fn format_pitch(delta_percent: i32) -> String {
    pitch_from_percent(&format_rate(delta_percent))
}

/// Converts a `±N%` pitch delta into `±NHz`, preserving the sign.
/// Anything unparseable falls back to the baseline `+0Hz`.
pub fn pitch_from_percent(percent: &str) -> String {
    let body = percent.trim().trim_end_matches('%');
    let negative = body.starts_with('-');
    match body.trim_start_matches(['+', '-']).parse::<u32>() {
        Ok(magnitude) => {
            let hz = (f64::from(magnitude) * PITCH_HZ_PER_PERCENT).round() as i64;
            format!("{}{hz}Hz", if negative { '-' } else { '+' })
        }
        Err(_) => "+0Hz".to_owned(),
    }
}
