// Voices - Un clic en cours de lecture

use std::sync::Arc;

use super::envelope::ExponentialDecay;
use super::oscillator::{Oscillator, SimpleOscillator, WaveformType};
use crate::sound::SampleBuffer;

/// Synthesized click: oscillator shaped by an exponential decay
pub struct ToneVoice {
    oscillator: SimpleOscillator,
    decay: ExponentialDecay,
    /// Age counter for voice stealing priority (higher = newer)
    age: u64,
}

impl ToneVoice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            oscillator: SimpleOscillator::new(WaveformType::default(), sample_rate),
            decay: ExponentialDecay::idle(),
            age: 0,
        }
    }

    pub fn trigger(
        &mut self,
        waveform: WaveformType,
        frequency_hz: f32,
        gain: f32,
        fade_ms: f32,
        sample_rate: f32,
        age: u64,
    ) {
        self.oscillator.set_waveform(waveform);
        self.oscillator.set_frequency(frequency_hz);
        self.oscillator.reset();
        self.decay = ExponentialDecay::new(gain, fade_ms, sample_rate);
        self.age = age;
    }

    pub fn is_active(&self) -> bool {
        self.decay.is_active()
    }

    pub fn get_age(&self) -> u64 {
        self.age
    }

    pub fn next_sample(&mut self) -> f32 {
        if !self.decay.is_active() {
            return 0.0;
        }
        let gain = self.decay.process();
        self.oscillator.next_sample() * gain
    }
}

/// Preloaded sample played once at a fixed gain
///
/// The buffer is resampled on the fly with linear interpolation when its
/// rate differs from the output rate.
pub struct SampleVoice {
    buffer: Option<Arc<SampleBuffer>>,
    position: f64,
    step: f64,
    gain: f32,
    age: u64,
}

impl SampleVoice {
    pub fn new() -> Self {
        Self {
            buffer: None,
            position: 0.0,
            step: 1.0,
            gain: 0.0,
            age: 0,
        }
    }

    pub fn trigger(&mut self, buffer: Arc<SampleBuffer>, gain: f32, output_rate: f32, age: u64) {
        self.step = if output_rate > 0.0 {
            buffer.sample_rate as f64 / output_rate as f64
        } else {
            1.0
        };
        self.buffer = Some(buffer);
        self.position = 0.0;
        self.gain = gain;
        self.age = age;
    }

    pub fn is_active(&self) -> bool {
        self.buffer
            .as_ref()
            .is_some_and(|b| (self.position as usize) < b.samples.len())
    }

    pub fn get_age(&self) -> u64 {
        self.age
    }

    pub fn next_sample(&mut self) -> f32 {
        let Some(buffer) = &self.buffer else {
            return 0.0;
        };

        let index = self.position as usize;
        let Some(&current) = buffer.samples.get(index) else {
            self.buffer = None;
            return 0.0;
        };
        let next = buffer.samples.get(index + 1).copied().unwrap_or(0.0);
        let frac = (self.position - index as f64) as f32;

        self.position += self.step;
        (current + (next - current) * frac) * self.gain
    }
}

impl Default for SampleVoice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1000.0;

    #[test]
    fn test_tone_voice_lifecycle() {
        let mut voice = ToneVoice::new(SAMPLE_RATE);
        assert!(!voice.is_active());
        assert_eq!(voice.next_sample(), 0.0);

        voice.trigger(WaveformType::Square, 100.0, 1.0, 50.0, SAMPLE_RATE, 1);
        assert!(voice.is_active());

        // Square wave starts high at full gain
        assert_eq!(voice.next_sample(), 1.0);
        for _ in 0..49 {
            voice.next_sample();
        }
        assert!(!voice.is_active());
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn test_sample_voice_same_rate() {
        let buffer = Arc::new(SampleBuffer::new(vec![0.5, -0.5, 0.25], 1000));
        let mut voice = SampleVoice::new();
        voice.trigger(buffer, 2.0, SAMPLE_RATE, 1);

        assert_eq!(voice.next_sample(), 1.0);
        assert_eq!(voice.next_sample(), -1.0);
        assert_eq!(voice.next_sample(), 0.5);
        assert!(!voice.is_active());
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn test_sample_voice_interpolates() {
        // Half-rate buffer: every other output sample is interpolated
        let buffer = Arc::new(SampleBuffer::new(vec![0.0, 1.0], 500));
        let mut voice = SampleVoice::new();
        voice.trigger(buffer, 1.0, SAMPLE_RATE, 1);

        assert_eq!(voice.next_sample(), 0.0);
        assert!((voice.next_sample() - 0.5).abs() < 1e-6);
        assert_eq!(voice.next_sample(), 1.0);
    }
}
