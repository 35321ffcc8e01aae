// Timeline - Tempo and time signature of the metronome
// Both are clamped into the ranges the metronome supports

use std::fmt;

use super::{MetronomeError, MetronomeResult};

/// Slowest supported tempo
pub const BPM_MIN: u32 = 20;
/// Fastest supported tempo
pub const BPM_MAX: u32 = 240;
/// Fewest beats per bar
pub const BEATS_PER_BAR_MIN: u32 = 1;
/// Most beats per bar
pub const BEATS_PER_BAR_MAX: u32 = 6;

/// Time signature, counted in quarter-note beats per bar (1/4 .. 6/4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    beats_per_bar: u32,
}

impl TimeSignature {
    /// Create a time signature, clamping into 1..=6
    pub fn new(beats_per_bar: u32) -> Self {
        Self {
            beats_per_bar: beats_per_bar.clamp(BEATS_PER_BAR_MIN, BEATS_PER_BAR_MAX),
        }
    }

    /// Create a time signature from an untyped value (UI slider, stored record)
    ///
    /// Fractional or non-finite values are rejected, integers are clamped.
    pub fn from_value(value: f64) -> MetronomeResult<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(MetronomeError::InvalidArgument(format!(
                "time signature must be an integer, got {value}"
            )));
        }
        let clamped = value.clamp(BEATS_PER_BAR_MIN as f64, BEATS_PER_BAR_MAX as f64);
        Ok(Self::new(clamped as u32))
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self::new(4)
    }

    /// Common 3/4 time signature (waltz)
    pub fn three_four() -> Self {
        Self::new(3)
    }

    /// Number of main beats per bar
    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/4", self.beats_per_bar)
    }
}

/// Tempo in BPM (Beats Per Minute), integral and clamped to 20..=240
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    bpm: u32,
}

impl Tempo {
    /// Creates a new tempo, clamping into the supported range
    pub fn new(bpm: u32) -> Self {
        Self {
            bpm: bpm.clamp(BPM_MIN, BPM_MAX),
        }
    }

    /// Creates a tempo from an untyped value, rounding then clamping
    ///
    /// NaN maps to the slowest tempo.
    pub fn from_value(bpm: f64) -> Self {
        if bpm.is_nan() {
            return Self::new(BPM_MIN);
        }
        let clamped = bpm.round().clamp(BPM_MIN as f64, BPM_MAX as f64);
        Self::new(clamped as u32)
    }

    /// Get BPM value
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Duration of one main beat in milliseconds
    pub fn beat_duration_ms(&self) -> f64 {
        60_000.0 / self.bpm as f64
    }

    /// Duration of one bar in milliseconds at given time signature
    pub fn bar_duration_ms(&self, time_signature: &TimeSignature) -> f64 {
        self.beat_duration_ms() * time_signature.beats_per_bar() as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(68)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}
