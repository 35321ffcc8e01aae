// Sounds - Built-in synthesized clicks and preset sample pairs
//
// A timbre is looked up by id through a `SoundCatalog`. Built-in sounds are
// always available; sample pairs come from a scanned directory.

pub mod loader;
pub mod scanner;

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::sink::FrequencyTier;
use crate::synth::oscillator::WaveformType;

pub use loader::{SampleBuffer, load_wav};
pub use scanner::{DirectoryCatalog, scan_sound_dir};

/// Timbre selected when nothing else is configured
pub const DEFAULT_TIMBRE: &str = "live-square";

/// Sound error types
#[derive(Debug, Error)]
pub enum SoundError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Unsupported sound: {0}")]
    Unsupported(String),
}

/// Synthesized click definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSound {
    pub id: &'static str,
    pub name: &'static str,
    pub waveform: WaveformType,
    pub hi_hz: f32,
    pub second_hi_hz: f32,
    pub lo_hz: f32,
    /// Per-sound loudness correction
    pub level: f32,
}

impl LiveSound {
    pub fn frequency(&self, tier: FrequencyTier) -> f32 {
        match tier {
            FrequencyTier::High => self.hi_hz,
            FrequencyTier::SecondHigh => self.second_hi_hz,
            FrequencyTier::Low => self.lo_hz,
        }
    }

    pub fn descriptor(&self) -> SoundDescriptor {
        SoundDescriptor {
            id: self.id.to_string(),
            name: self.name.to_string(),
            timbre: Timbre::Live(*self),
        }
    }
}

const fn live(
    id: &'static str,
    name: &'static str,
    waveform: WaveformType,
    level: f32,
) -> LiveSound {
    LiveSound {
        id,
        name,
        waveform,
        hi_hz: 800.0,
        second_hi_hz: 660.0,
        lo_hz: 440.0,
        level,
    }
}

pub const LIVE_SOUNDS: [LiveSound; 4] = [
    live("live-triangle", "Live Triangle", WaveformType::Triangle, 1.0),
    live("live-square", "Live Square", WaveformType::Square, 0.5),
    live("live-sine", "Live Sine", WaveformType::Sine, 1.0),
    live("live-sawtooth", "Live Sawtooth", WaveformType::Sawtooth, 0.6),
];

/// How a sound is produced
#[derive(Debug, Clone, PartialEq)]
pub enum Timbre {
    Live(LiveSound),
    /// Accent file and normal file of a preset pair
    Sample { hi: PathBuf, lo: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundDescriptor {
    pub id: String,
    pub name: String,
    pub timbre: Timbre,
}

impl SoundDescriptor {
    pub fn is_live(&self) -> bool {
        matches!(self.timbre, Timbre::Live(_))
    }
}

/// Lookup of sounds by id
pub trait SoundCatalog: Send {
    fn resolve(&self, id: &str) -> Option<SoundDescriptor>;

    /// Every sound, built-in ones first
    fn sounds(&self) -> Vec<SoundDescriptor>;
}

/// Catalog holding only the built-in synthesized sounds
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl SoundCatalog for BuiltinCatalog {
    fn resolve(&self, id: &str) -> Option<SoundDescriptor> {
        LIVE_SOUNDS
            .iter()
            .find(|sound| sound.id == id)
            .map(LiveSound::descriptor)
    }

    fn sounds(&self) -> Vec<SoundDescriptor> {
        LIVE_SOUNDS.iter().map(LiveSound::descriptor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_sound_table() {
        assert_eq!(LIVE_SOUNDS.len(), 4);
        assert_eq!(LIVE_SOUNDS[1].id, DEFAULT_TIMBRE);

        for sound in &LIVE_SOUNDS {
            assert_eq!(sound.hi_hz, 800.0);
            assert_eq!(sound.second_hi_hz, 660.0);
            assert_eq!(sound.lo_hz, 440.0);
            assert!(sound.id.ends_with(sound.waveform.name()));
        }

        let levels: Vec<f32> = LIVE_SOUNDS.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![1.0, 0.5, 1.0, 0.6]);
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = BuiltinCatalog;

        let square = catalog.resolve("live-square").unwrap();
        assert!(square.is_live());
        assert_eq!(square.name, "Live Square");

        assert!(catalog.resolve("perc-can").is_none());
        assert_eq!(catalog.sounds().len(), 4);
    }
}
