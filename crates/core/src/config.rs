use crate::tts::VoiceId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_VOICE: &str = "en-US-AriaNeural";
pub const DEFAULT_CHUNK_THRESHOLD: usize = 500;
pub const DEFAULT_SYNTH_PROGRAM: &str = "emotts-synth";
pub const DEFAULT_FFMPEG_PROGRAM: &str = "ffmpeg";
pub const MAX_TEXT_CHARS: usize = 100_000;
pub const ENV_SYNTH_PROGRAM: &str = "EMOTTS_SYNTH_BIN";
pub const ENV_FFMPEG_PROGRAM: &str = "EMOTTS_FFMPEG";
pub const ENV_VOICE: &str = "EMOTTS_VOICE";

/// Character limit above which a segment is split into chunks.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkThreshold(usize);

impl ChunkThreshold {
    pub fn new(chars: usize) -> Result<Self, ConfigError> {
        if chars == 0 {
            return Err(ConfigError::ZeroChunkThreshold);
        }
        Ok(Self(chars))
    }

    pub fn chars(&self) -> usize {
        self.0
    }
}

impl Default for ChunkThreshold {
    fn default() -> Self {
        Self(DEFAULT_CHUNK_THRESHOLD)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub voice: VoiceId,
    pub synth_program: PathBuf,
    pub ffmpeg_program: PathBuf,
    pub chunk_threshold: ChunkThreshold,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("voice id must not be empty")]
    EmptyVoice,
    #[error("chunk threshold must be > 0 characters")]
    ZeroChunkThreshold,
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_voice(cli_value: Option<String>, env: &impl Env) -> Result<VoiceId, ConfigError> {
    let raw = resolve_string_with_default(cli_value, ENV_VOICE, env, DEFAULT_VOICE);
    if raw.trim().is_empty() {
        return Err(ConfigError::EmptyVoice);
    }
    Ok(VoiceId(raw))
}

pub fn resolve_program(
    cli_value: Option<PathBuf>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> PathBuf {
    match cli_value {
        Some(v) => v,
        None => env
            .var(env_key)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default)),
    }
}
