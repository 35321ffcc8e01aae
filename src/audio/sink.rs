// Audio sink - Where the controller sends its clicks
//
// Both calls are fire-and-forget: the controller never waits on audio and
// never looks at what the sink did with a request.

use crate::sound::{SoundDescriptor, SoundError};
use crate::synth::envelope::VoiceRole;
use crate::synth::oscillator::WaveformType;

/// Pitch slot of a synthesized click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyTier {
    High,
    SecondHigh,
    Low,
}

impl FrequencyTier {
    pub fn for_role(role: VoiceRole) -> Self {
        match role {
            VoiceRole::Accent => FrequencyTier::High,
            VoiceRole::SecondaryAccent => FrequencyTier::SecondHigh,
            VoiceRole::Normal => FrequencyTier::Low,
        }
    }
}

/// One synthesized click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    pub tier: FrequencyTier,
    pub frequency_hz: f32,
    pub waveform: WaveformType,
    /// Final linear gain, timbre level included
    pub gain: f32,
    pub fade_ms: f32,
}

pub trait AudioSink {
    fn play_tone(&mut self, role: VoiceRole, params: ToneParams);

    /// Play the preloaded sample for `role` (accent file for `Accent`,
    /// normal file otherwise)
    fn play_sample(&mut self, role: VoiceRole, gain: f32);

    /// Load whatever a sound needs before its first trigger
    fn prepare_sample(&mut self, _sound: &SoundDescriptor) -> Result<(), SoundError> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Sink that drops every click, used when no audio device is available
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play_tone(&mut self, _role: VoiceRole, _params: ToneParams) {}

    fn play_sample(&mut self, _role: VoiceRole, _gain: f32) {}

    fn name(&self) -> &str {
        "null"
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn play_tone(&mut self, role: VoiceRole, params: ToneParams) {
        (**self).play_tone(role, params)
    }

    fn play_sample(&mut self, role: VoiceRole, gain: f32) {
        (**self).play_sample(role, gain)
    }

    fn prepare_sample(&mut self, sound: &SoundDescriptor) -> Result<(), SoundError> {
        (**self).prepare_sample(sound)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_role() {
        assert_eq!(FrequencyTier::for_role(VoiceRole::Accent), FrequencyTier::High);
        assert_eq!(
            FrequencyTier::for_role(VoiceRole::SecondaryAccent),
            FrequencyTier::SecondHigh
        );
        assert_eq!(FrequencyTier::for_role(VoiceRole::Normal), FrequencyTier::Low);
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink: Box<dyn AudioSink> = Box::new(NullSink);
        sink.play_tone(
            VoiceRole::Accent,
            ToneParams {
                tier: FrequencyTier::High,
                frequency_hz: 800.0,
                waveform: WaveformType::Sine,
                gain: 1.0,
                fade_ms: 100.0,
            },
        );
        sink.play_sample(VoiceRole::Normal, 10.0);
        assert_eq!(sink.name(), "null");
    }
}
