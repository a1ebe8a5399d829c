use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotion labels recognized in `[marker]` annotations.
///
/// Anything outside this set normalizes to `Neutral`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Excited,
    Sad,
    Angry,
    Calm,
    Whisper,
    Surprised,
    Fearful,
    Disgusted,
    Neutral,
    Serious,
    Questioning,
    Storytelling,
}

/// Additive prosody deltas from the synthesis baseline.
///
/// Pitch: +1% is roughly 1-2Hz off baseline (male ~120Hz, female ~220Hz).
/// Rate: +1% is 1% more syllables per second. Volume: +1dB is one
/// perceptible loudness step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProsodySpec {
    pub pitch_delta_percent: i32,
    pub rate_delta_percent: i32,
    pub volume_delta_db: i32,
}

impl ProsodySpec {
    pub const fn new(pitch: i32, rate: i32, volume: i32) -> Self {
        Self {
            pitch_delta_percent: pitch,
            rate_delta_percent: rate,
            volume_delta_db: volume,
        }
    }
}

impl Emotion {
    /// Case-insensitive lookup; unrecognized labels map to `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "happy" => Self::Happy,
            "excited" => Self::Excited,
            "sad" => Self::Sad,
            "angry" => Self::Angry,
            "calm" => Self::Calm,
            "whisper" => Self::Whisper,
            "surprised" => Self::Surprised,
            "fearful" => Self::Fearful,
            "disgusted" => Self::Disgusted,
            "neutral" => Self::Neutral,
            "serious" => Self::Serious,
            "questioning" => Self::Questioning,
            "storytelling" => Self::Storytelling,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Excited => "excited",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Calm => "calm",
            Self::Whisper => "whisper",
            Self::Surprised => "surprised",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Neutral => "neutral",
            Self::Serious => "serious",
            Self::Questioning => "questioning",
            Self::Storytelling => "storytelling",
        }
    }

    /// Fixed prosody table, one entry per label.
    pub const fn prosody(&self) -> ProsodySpec {
        match self {
            Self::Happy => ProsodySpec::new(7, 12, 6),
            Self::Excited => ProsodySpec::new(10, 18, 9),
            Self::Sad => ProsodySpec::new(-6, -12, -7),
            Self::Angry => ProsodySpec::new(4, 15, 12),
            Self::Calm => ProsodySpec::new(-2, -8, -4),
            Self::Whisper => ProsodySpec::new(-4, -10, -15),
            Self::Surprised => ProsodySpec::new(12, 8, 7),
            Self::Fearful => ProsodySpec::new(8, 20, 5),
            Self::Disgusted => ProsodySpec::new(-5, -6, 6),
            Self::Neutral => ProsodySpec::new(0, 0, 0),
            Self::Serious => ProsodySpec::new(-4, 2, 3),
            Self::Questioning => ProsodySpec::new(9, 5, 4),
            Self::Storytelling => ProsodySpec::new(3, -5, 5),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
