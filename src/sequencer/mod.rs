// Sequencer module
// Subdivision patterns, beat expansion and the metronome state machine

pub mod metronome;
pub mod runner;
pub mod scheduler;
pub mod subdivision;
pub mod timeline;
pub mod timer;

pub use metronome::{BPM_DEBOUNCE_MS, BeatHook, MetronomeController, MetronomeState};
pub use runner::{MetronomeRunner, RunnerHandle, RunnerStatus};
pub use scheduler::{
    BeatEvent, BeatListener, CallbackError, TimingScheduler, UnknownSubdivisionPolicy,
};
pub use subdivision::{SubdivisionPattern, SubdivisionTable, SubdivisionType};
pub use timeline::{BPM_MAX, BPM_MIN, Tempo, TimeSignature};
pub use timer::{Clock, ManualClock, SystemClock, TimerHandle, TimerQueue};

/// Metronome error types
#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown subdivision: {0}")]
    UnknownSubdivision(String),

    #[error("Audio backend unavailable: {0}")]
    AudioBackendUnavailable(String),

    #[error("Beat callback failed at main beat {main_beat}, sub-beat {sub_beat}: {message}")]
    CallbackFailure {
        main_beat: u32,
        sub_beat: usize,
        message: String,
    },

    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    #[error("Invalid subdivision pattern: {0}")]
    InvalidPattern(String),
}

/// Result type for metronome operations
pub type MetronomeResult<T> = Result<T, MetronomeError>;
