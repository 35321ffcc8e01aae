// Oscillateurs - Formes d'onde des clics synthétisés

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

pub trait Oscillator {
    fn next_sample(&mut self) -> f32;
    fn set_frequency(&mut self, freq: f32);
    fn reset(&mut self);
}

/// Waveform of a built-in sound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WaveformType {
    Sine,
    #[default]
    Square,
    Sawtooth,
    Triangle,
}

impl WaveformType {
    pub const ALL: [WaveformType; 4] = [
        WaveformType::Triangle,
        WaveformType::Square,
        WaveformType::Sine,
        WaveformType::Sawtooth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WaveformType::Sine => "sine",
            WaveformType::Square => "square",
            WaveformType::Sawtooth => "sawtooth",
            WaveformType::Triangle => "triangle",
        }
    }
}

impl fmt::Display for WaveformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WaveformType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaveformType::ALL
            .into_iter()
            .find(|w| w.name() == s)
            .ok_or_else(|| format!("Unknown waveform: {}", s))
    }
}

pub struct SimpleOscillator {
    waveform: WaveformType,
    frequency: f32,
    phase: f32,
    phase_increment: f32,
    sample_rate: f32,
}

impl SimpleOscillator {
    pub fn new(waveform: WaveformType, sample_rate: f32) -> Self {
        Self {
            waveform,
            frequency: 0.0,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        }
    }

    pub fn waveform(&self) -> WaveformType {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Change la forme d'onde sans toucher à la fréquence ni à la phase
    pub fn set_waveform(&mut self, waveform: WaveformType) {
        self.waveform = waveform;
    }
}

impl Oscillator for SimpleOscillator {
    fn next_sample(&mut self) -> f32 {
        let sample = match self.waveform {
            WaveformType::Sine => (self.phase * 2.0 * PI).sin(),
            WaveformType::Square => {
                if self.phase < 0.5 { 1.0 } else { -1.0 }
            }
            WaveformType::Sawtooth => (self.phase * 2.0) - 1.0,
            WaveformType::Triangle => {
                if self.phase < 0.5 {
                    (self.phase * 4.0) - 1.0
                } else {
                    3.0 - (self.phase * 4.0)
                }
            }
        };

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }

    fn set_frequency(&mut self, freq: f32) {
        self.frequency = freq;
        self.phase_increment = freq / self.sample_rate;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
