// Voice Manager - Fixed pool of click voices mixed into one signal

use std::sync::Arc;

use super::oscillator::WaveformType;
use super::voice::{SampleVoice, ToneVoice};
use crate::sound::SampleBuffer;

const MAX_TONE_VOICES: usize = 8;
const MAX_SAMPLE_VOICES: usize = 8;

pub struct VoiceManager {
    tones: [ToneVoice; MAX_TONE_VOICES],
    samples: [SampleVoice; MAX_SAMPLE_VOICES],
    sample_rate: f32,
    /// Age counter incremented on each trigger for voice stealing priority
    age_counter: u64,
}

impl VoiceManager {
    pub fn new(sample_rate: f32) -> Self {
        // Pre-allocate all voices
        Self {
            tones: std::array::from_fn(|_| ToneVoice::new(sample_rate)),
            samples: std::array::from_fn(|_| SampleVoice::new()),
            sample_rate,
            age_counter: 0,
        }
    }

    fn next_age(&mut self) -> u64 {
        self.age_counter = self.age_counter.wrapping_add(1);
        self.age_counter
    }

    pub fn play_tone(&mut self, waveform: WaveformType, frequency_hz: f32, gain: f32, fade_ms: f32) {
        let age = self.next_age();
        let index = free_or_oldest(self.tones.iter().map(|v| (v.is_active(), v.get_age())));
        self.tones[index].trigger(waveform, frequency_hz, gain, fade_ms, self.sample_rate, age);
    }

    pub fn play_sample(&mut self, buffer: Arc<SampleBuffer>, gain: f32) {
        let age = self.next_age();
        let index = free_or_oldest(self.samples.iter().map(|v| (v.is_active(), v.get_age())));
        self.samples[index].trigger(buffer, gain, self.sample_rate, age);
    }

    pub fn next_sample(&mut self) -> f32 {
        let tones: f32 = self.tones.iter_mut().map(|v| v.next_sample()).sum();
        let samples: f32 = self.samples.iter_mut().map(|v| v.next_sample()).sum();
        tones + samples
    }

    pub fn active_voice_count(&self) -> usize {
        self.tones.iter().filter(|v| v.is_active()).count()
            + self.samples.iter().filter(|v| v.is_active()).count()
    }
}

/// First idle voice, otherwise the oldest one
fn free_or_oldest(voices: impl Iterator<Item = (bool, u64)>) -> usize {
    let mut oldest_index = 0;
    let mut oldest_age = u64::MAX;

    for (i, (active, age)) in voices.enumerate() {
        if !active {
            return i;
        }
        if age < oldest_age {
            oldest_age = age;
            oldest_index = i;
        }
    }

    oldest_index
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44100.0;

    #[test]
    fn test_voice_allocation() {
        let mut vm = VoiceManager::new(SAMPLE_RATE);
        assert_eq!(vm.active_voice_count(), 0);

        vm.play_tone(WaveformType::Sine, 800.0, 1.0, 100.0);
        vm.play_tone(WaveformType::Sine, 440.0, 1.0, 100.0);
        assert_eq!(vm.active_voice_count(), 2);

        vm.play_sample(Arc::new(SampleBuffer::new(vec![0.1; 64], 44100)), 1.0);
        assert_eq!(vm.active_voice_count(), 3);
    }

    #[test]
    fn test_voices_finish_after_fade() {
        let mut vm = VoiceManager::new(SAMPLE_RATE);
        vm.play_tone(WaveformType::Triangle, 800.0, 1.0, 100.0);

        // 100ms = 4410 samples
        for _ in 0..4410 {
            vm.next_sample();
        }
        assert_eq!(vm.active_voice_count(), 0);
    }

    #[test]
    fn test_voice_stealing() {
        let mut vm = VoiceManager::new(SAMPLE_RATE);

        for _ in 0..MAX_TONE_VOICES + 3 {
            vm.play_tone(WaveformType::Square, 440.0, 1.0, 500.0);
        }

        assert_eq!(vm.active_voice_count(), MAX_TONE_VOICES);
    }

    #[test]
    fn test_free_or_oldest() {
        assert_eq!(free_or_oldest([(true, 5), (false, 9), (true, 1)].into_iter()), 1);
        assert_eq!(free_or_oldest([(true, 5), (true, 2), (true, 7)].into_iter()), 1);
    }

    #[test]
    fn test_silence_when_idle() {
        let mut vm = VoiceManager::new(SAMPLE_RATE);
        for _ in 0..100 {
            assert_eq!(vm.next_sample(), 0.0);
        }
    }
}
