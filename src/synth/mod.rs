// Module synthèse - Enveloppes, oscillateurs et voix des clics

pub mod envelope;
pub mod oscillator;
pub mod voice;
pub mod voice_manager;

pub use envelope::{
    EnvelopeMapper, EnvelopeParams, ExponentialDecay, GainRange, StressConfig, VoiceRole,
};
pub use oscillator::{Oscillator, SimpleOscillator, WaveformType};
pub use voice_manager::VoiceManager;
