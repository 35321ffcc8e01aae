// Envelope mapping - Sub-beat event → voice role, gain and fade
//
// Pure functions only. The controller calls `EnvelopeMapper::map` once per
// sub-beat and hands the result to the audio sink. `ExponentialDecay` is the
// per-sample gain ramp the tone voices apply over the fade duration.

use crate::audio::dsp_utils::ms_to_samples;
use crate::sequencer::{BPM_MAX, BeatEvent};

/// Longest fade applied to a click
pub const MAX_FADE_MS: f64 = 500.0;

/// Shortest fade: one sixteenth at the fastest tempo
pub const MIN_FADE_MS: f64 = 60_000.0 / (BPM_MAX as f64 * 4.0);

/// Exponential ramps stop here instead of at zero
pub const DECAY_FLOOR: f32 = 0.01;

/// Clamp applied by the tone backend before the timbre level
pub const TONE_GAIN_MIN: f64 = 0.5;
pub const TONE_GAIN_MAX: f64 = 2.5;

/// Which click a sub-beat plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceRole {
    /// First sub-beat of the bar
    Accent,
    /// First sub-beat of the other main beats
    SecondaryAccent,
    Normal,
}

/// Accent switches, owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    pub stress_first_beat: bool,
    pub stress_first_sub_beat: bool,
}

impl StressConfig {
    pub fn new(stress_first_beat: bool, stress_first_sub_beat: bool) -> Self {
        Self {
            stress_first_beat,
            stress_first_sub_beat,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Parameters of one click, derived per event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub role: VoiceRole,
    pub gain: f64,
    pub fade_duration_ms: f64,
}

/// Output gain range of one playback backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRange {
    pub min: f64,
    pub max: f64,
}

impl GainRange {
    /// Synthesized tones
    pub const SYNTH: GainRange = GainRange {
        min: 0.01,
        max: 2.0,
    };

    /// Preloaded sample buffers
    pub const SAMPLE: GainRange = GainRange {
        min: 1.0,
        max: 60.0,
    };

    /// Map a logical volume in [1, 100] to a linear gain
    ///
    /// `10^(log10(min) + log10(v)/2 * (log10(max) - log10(min)))`. The `/2`
    /// is kept as is; existing sound levels were tuned against it.
    pub fn gain_for(&self, volume: f64) -> f64 {
        let volume = volume.clamp(1.0, 100.0);
        let log_min = self.min.log10();
        let log_max = self.max.log10();
        10f64.powf(log_min + (volume.log10() / 2.0) * (log_max - log_min))
    }
}

/// Turns sub-beat events into click parameters for one backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeMapper {
    range: GainRange,
}

impl EnvelopeMapper {
    pub fn new(range: GainRange) -> Self {
        Self { range }
    }

    pub fn synth() -> Self {
        Self::new(GainRange::SYNTH)
    }

    pub fn sample() -> Self {
        Self::new(GainRange::SAMPLE)
    }

    pub fn range(&self) -> GainRange {
        self.range
    }

    /// First matching rule wins
    pub fn resolve_role(event: &BeatEvent, stress: &StressConfig) -> VoiceRole {
        let first_main = event.is_first_main_beat;
        let first_sub = event.is_first_sub_beat;

        if first_main && first_sub && stress.stress_first_beat {
            VoiceRole::Accent
        } else if first_sub && !first_main && stress.stress_first_sub_beat {
            VoiceRole::SecondaryAccent
        } else if first_main
            && first_sub
            && stress.stress_first_sub_beat
            && !stress.stress_first_beat
        {
            // Bar accent disabled, the downbeat still gets the sub-beat accent
            VoiceRole::SecondaryAccent
        } else {
            VoiceRole::Normal
        }
    }

    pub fn fade_duration_ms(event_duration_ms: f64) -> f64 {
        event_duration_ms.clamp(MIN_FADE_MS, MAX_FADE_MS)
    }

    pub fn gain(&self, volume: f64) -> f64 {
        self.range.gain_for(volume)
    }

    pub fn map(&self, event: &BeatEvent, stress: &StressConfig, volume: f64) -> EnvelopeParams {
        EnvelopeParams {
            role: Self::resolve_role(event, stress),
            gain: self.gain(volume),
            fade_duration_ms: Self::fade_duration_ms(event.duration_ms),
        }
    }
}

/// Final tone gain: mapped gain clamped to [0.5, 2.5], scaled by the timbre level
pub fn tone_gain(mapped_gain: f64, level: f32) -> f32 {
    (mapped_gain.clamp(TONE_GAIN_MIN, TONE_GAIN_MAX) * level as f64) as f32
}

/// Exponential gain ramp from a start level down to `DECAY_FLOOR`
///
/// Runs for exactly the fade duration, then reports itself finished.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialDecay {
    value: f32,
    multiplier: f32,
    remaining_samples: u32,
}

impl ExponentialDecay {
    pub fn new(start_gain: f32, fade_ms: f32, sample_rate: f32) -> Self {
        let samples = ms_to_samples(fade_ms, sample_rate);
        if start_gain <= 0.0 || samples == 0 {
            return Self::idle();
        }

        let multiplier = (DECAY_FLOOR / start_gain).powf(1.0 / samples as f32);
        Self {
            value: start_gain,
            multiplier,
            remaining_samples: samples,
        }
    }

    pub fn idle() -> Self {
        Self {
            value: 0.0,
            multiplier: 0.0,
            remaining_samples: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining_samples > 0
    }

    /// Current gain, then advance one sample
    pub fn process(&mut self) -> f32 {
        if self.remaining_samples == 0 {
            return 0.0;
        }
        let out = self.value;
        self.value *= self.multiplier;
        self.remaining_samples -= 1;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn event(first_main: bool, first_sub: bool) -> BeatEvent {
        BeatEvent {
            main_beat_index: if first_main { 0 } else { 1 },
            is_first_main_beat: first_main,
            sub_beat_index: if first_sub { 0 } else { 1 },
            is_first_sub_beat: first_sub,
            duration_ms: 250.0,
            ratio: 0.5,
            time_offset_ms: 0.0,
        }
    }

    #[test]
    fn test_role_accent_on_downbeat() {
        let stress = StressConfig::new(true, true);
        assert_eq!(
            EnvelopeMapper::resolve_role(&event(true, true), &stress),
            VoiceRole::Accent
        );
        // Sub-beat stress off does not matter for rule 1
        let stress = StressConfig::new(true, false);
        assert_eq!(
            EnvelopeMapper::resolve_role(&event(true, true), &stress),
            VoiceRole::Accent
        );
    }

    #[test]
    fn test_role_secondary_on_other_main_beats() {
        let stress = StressConfig::new(false, true);
        assert_eq!(
            EnvelopeMapper::resolve_role(&event(false, true), &stress),
            VoiceRole::SecondaryAccent
        );
    }

    #[test]
    fn test_role_downbeat_falls_back_to_secondary() {
        let stress = StressConfig::new(false, true);
        assert_eq!(
            EnvelopeMapper::resolve_role(&event(true, true), &stress),
            VoiceRole::SecondaryAccent
        );
    }

    #[test]
    fn test_role_normal_otherwise() {
        let all = StressConfig::new(true, true);
        let none = StressConfig::new(false, false);

        assert_eq!(EnvelopeMapper::resolve_role(&event(true, false), &all), VoiceRole::Normal);
        assert_eq!(EnvelopeMapper::resolve_role(&event(false, false), &all), VoiceRole::Normal);
        assert_eq!(EnvelopeMapper::resolve_role(&event(true, true), &none), VoiceRole::Normal);
        assert_eq!(EnvelopeMapper::resolve_role(&event(false, true), &none), VoiceRole::Normal);
    }

    #[test]
    fn test_gain_curve_endpoints() {
        let synth = GainRange::SYNTH;
        assert!((synth.gain_for(1.0) - 0.01).abs() < EPSILON);
        assert!((synth.gain_for(100.0) - 2.0).abs() < EPSILON);

        let sample = GainRange::SAMPLE;
        assert!((sample.gain_for(1.0) - 1.0).abs() < EPSILON);
        assert!((sample.gain_for(100.0) - 60.0).abs() < EPSILON);
    }

    #[test]
    fn test_gain_curve_midpoint() {
        // log10(10) / 2 = 0.5, geometric mean of the range
        let gain = GainRange::SAMPLE.gain_for(10.0);
        assert!((gain - 60f64.sqrt()).abs() < 1e-9);

        let gain = GainRange::SYNTH.gain_for(10.0);
        assert!((gain - (0.01f64 * 2.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_gain_monotonic() {
        let mut last = 0.0;
        for v in 1..=100 {
            let gain = GainRange::SYNTH.gain_for(v as f64);
            assert!(gain > last);
            last = gain;
        }
    }

    #[test]
    fn test_fade_clamp() {
        assert_eq!(MIN_FADE_MS, 62.5);
        assert_eq!(EnvelopeMapper::fade_duration_ms(10.0), 62.5);
        assert_eq!(EnvelopeMapper::fade_duration_ms(250.0), 250.0);
        assert_eq!(EnvelopeMapper::fade_duration_ms(3000.0), 500.0);
    }

    #[test]
    fn test_map() {
        let params = EnvelopeMapper::synth().map(&event(true, true), &StressConfig::default(), 100.0);
        assert_eq!(params.role, VoiceRole::Accent);
        assert!((params.gain - 2.0).abs() < EPSILON);
        assert_eq!(params.fade_duration_ms, 250.0);
    }

    #[test]
    fn test_tone_gain_clamp() {
        assert_eq!(tone_gain(0.01, 1.0), 0.5);
        assert_eq!(tone_gain(2.0, 0.5), 1.0);
        assert_eq!(tone_gain(10.0, 1.0), 2.5);
    }

    #[test]
    fn test_exponential_decay_reaches_floor() {
        let mut decay = ExponentialDecay::new(1.0, 100.0, 1000.0);
        assert!(decay.is_active());

        let first = decay.process();
        assert_eq!(first, 1.0);

        let mut last = first;
        let mut count = 1;
        while decay.is_active() {
            let value = decay.process();
            assert!(value < last);
            assert!(value > 0.0);
            last = value;
            count += 1;
        }

        assert_eq!(count, 100);
        // One step above the floor
        assert!(last > DECAY_FLOOR && last < 0.011);
        assert_eq!(decay.process(), 0.0);
    }

    #[test]
    fn test_exponential_decay_idle_on_zero_gain() {
        let decay = ExponentialDecay::new(0.0, 100.0, 44100.0);
        assert!(!decay.is_active());
    }
}
