// MyMusic Metronome - Library exports for tests and benchmarks

pub mod audio;
pub mod messaging;
pub mod sequencer;
pub mod settings;
pub mod sound;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::engine::ClickEngine;
pub use audio::sink::{AudioSink, FrequencyTier, NullSink, ToneParams};
pub use messaging::channels::{create_command_channel, create_notification_channel};
pub use messaging::{Command, Notification, Notifier};
pub use sequencer::{
    BeatEvent, Clock, ManualClock, MetronomeController, MetronomeError, MetronomeResult,
    MetronomeRunner, MetronomeState, RunnerHandle, SubdivisionTable, SubdivisionType,
    SystemClock, Tempo, TimeSignature, TimingScheduler,
};
pub use settings::{MetronomeSettings, SettingsStore};
pub use sound::scanner::DirectoryCatalog;
pub use sound::{BuiltinCatalog, SoundCatalog, SoundDescriptor};
pub use synth::envelope::{EnvelopeMapper, StressConfig, VoiceRole};
