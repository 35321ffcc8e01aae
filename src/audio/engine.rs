// Moteur audio - Rendu des clics dans le callback CPAL
//
// # Format Support
//
// Le stream est créé dans le format préféré du device (F32, I16 ou U16).
// Tout le mixage se fait en f32 ; la conversion vers le format du device se
// fait à l'écriture via `FromSample<f32>`, sans allocation.
//
// # Threading
//
// Le thread du métronome pousse des `ClickCommand` dans un ringbuf ; le
// callback les dépile au début de chaque buffer et les joue immédiatement.
// Le `Stream` n'est pas Send sur toutes les plateformes : le moteur doit être
// créé sur le thread qui l'utilise.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::audio::dsp_utils::finish_sample;
use crate::audio::sink::{AudioSink, ToneParams};
use crate::messaging::{Notification, NotificationCategory, Notifier};
use crate::sequencer::{MetronomeError, MetronomeResult};
use crate::sound::{SampleBuffer, SoundDescriptor, SoundError, Timbre, load_wav};
use crate::synth::envelope::VoiceRole;
use crate::synth::oscillator::WaveformType;
use crate::synth::voice_manager::VoiceManager;

const CLICK_QUEUE_CAPACITY: usize = 64;

/// Click request sent to the audio callback
pub enum ClickCommand {
    Tone {
        waveform: WaveformType,
        frequency_hz: f32,
        gain: f32,
        fade_ms: f32,
    },
    Sample {
        buffer: Arc<SampleBuffer>,
        gain: f32,
    },
}

/// Accent and normal buffers of the current preset sound
#[derive(Default)]
struct PresetBuffers {
    hi: Option<Arc<SampleBuffer>>,
    lo: Option<Arc<SampleBuffer>>,
}

pub struct ClickEngine {
    _stream: Stream,
    tx: HeapProd<ClickCommand>,
    sample_rate: f32,
    device_name: String,
    presets: PresetBuffers,
}

impl ClickEngine {
    /// Open the default output device and start rendering
    pub fn new(notifier: Notifier) -> MetronomeResult<Self> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or_else(|| {
            MetronomeError::AudioBackendUnavailable("No audio device found".to_string())
        })?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported_config = device.default_output_config().map_err(|e| {
            MetronomeError::AudioBackendUnavailable(format!("Configuration error: {}", e))
        })?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        log::info!(
            target: "metronome::audio",
            "Device audio: {device_name} ({sample_format:?}, {sample_rate} Hz, {channels} ch)"
        );

        let (tx, rx) = HeapRb::<ClickCommand>::new(CLICK_QUEUE_CAPACITY).split();
        let voices = VoiceManager::new(sample_rate);

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, channels, rx, voices, notifier.clone())
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, channels, rx, voices, notifier.clone())
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, channels, rx, voices, notifier.clone())
            }
            _ => {
                return Err(MetronomeError::AudioBackendUnavailable(format!(
                    "Unsupported sample format: {:?}. Supported formats: F32, I16, U16",
                    sample_format
                )));
            }
        }?;

        stream.play().map_err(|e| {
            MetronomeError::AudioBackendUnavailable(format!("Error starting stream: {}", e))
        })?;

        notifier.notify(Notification::info(
            NotificationCategory::Audio,
            format!("Audio connected: {} Hz", sample_rate),
        ));

        Ok(Self {
            _stream: stream,
            tx,
            sample_rate,
            device_name,
            presets: PresetBuffers::default(),
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn send(&mut self, command: ClickCommand) {
        if self.tx.try_push(command).is_err() {
            log::warn!(target: "metronome::audio", "click queue full, click dropped");
        }
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut rx: HeapCons<ClickCommand>,
        mut voices: VoiceManager,
        notifier: Notifier,
    ) -> MetronomeResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // ========== SACRED ZONE ==========
                    // No allocations, No I/O, No blocking locks
                    while let Some(command) = rx.try_pop() {
                        match command {
                            ClickCommand::Tone {
                                waveform,
                                frequency_hz,
                                gain,
                                fade_ms,
                            } => voices.play_tone(waveform, frequency_hz, gain, fade_ms),
                            ClickCommand::Sample { buffer, gain } => {
                                voices.play_sample(buffer, gain)
                            }
                        }
                    }

                    for frame in data.chunks_mut(channels) {
                        let sample = finish_sample(voices.next_sample());
                        // mono → tous les canaux
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = <T as Sample>::from_sample(sample);
                        }
                    }
                    // ========== SACRED ZONE END ==========
                },
                move |err| {
                    // Hors callback audio : I/O autorisées
                    notifier.notify(Notification::error(
                        NotificationCategory::Audio,
                        format!("Audio stream error: {}", err),
                    ));
                },
                None,
            )
            .map_err(|e| {
                MetronomeError::AudioBackendUnavailable(format!("Error in stream creation: {}", e))
            })
    }
}

impl AudioSink for ClickEngine {
    fn play_tone(&mut self, _role: VoiceRole, params: ToneParams) {
        self.send(ClickCommand::Tone {
            waveform: params.waveform,
            frequency_hz: params.frequency_hz,
            gain: params.gain,
            fade_ms: params.fade_ms,
        });
    }

    fn play_sample(&mut self, role: VoiceRole, gain: f32) {
        let buffer = match role {
            VoiceRole::Accent => self.presets.hi.clone(),
            VoiceRole::SecondaryAccent | VoiceRole::Normal => self.presets.lo.clone(),
        };

        match buffer {
            Some(buffer) => self.send(ClickCommand::Sample { buffer, gain }),
            None => log::trace!(target: "metronome::audio", "no preset loaded, click skipped"),
        }
    }

    fn prepare_sample(&mut self, sound: &SoundDescriptor) -> Result<(), SoundError> {
        // Un preset qui échoue au chargement reste muet
        self.presets = PresetBuffers::default();
        self.presets = match &sound.timbre {
            Timbre::Sample { hi, lo } => PresetBuffers {
                hi: Some(Arc::new(load_wav(hi)?)),
                lo: Some(Arc::new(load_wav(lo)?)),
            },
            Timbre::Live(_) => PresetBuffers::default(),
        };
        Ok(())
    }

    fn name(&self) -> &str {
        &self.device_name
    }
}
