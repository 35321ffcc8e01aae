// Metronome - State machine driving the main beat and its sub-beats
//
// The controller owns tempo, time signature, subdivision and the voice
// settings. It keeps two kinds of timers: its own (the periodic main beat and
// the bpm debounce) and the scheduler's pending sub-beats. `poll` fires
// whatever is due on either queue in time order, so the whole thing runs on
// one thread without ever blocking.

use std::sync::Arc;

use super::scheduler::{
    BeatEvent, BeatListener, CallbackError, TimingScheduler, UnknownSubdivisionPolicy,
};
use super::subdivision::{SubdivisionTable, SubdivisionType};
use super::timeline::{Tempo, TimeSignature};
use super::timer::{Clock, TimerHandle, TimerQueue};
use super::{MetronomeError, MetronomeResult};
use crate::audio::sink::{AudioSink, FrequencyTier, ToneParams};
use crate::messaging::{Notification, NotificationCategory, Notifier};
use crate::settings::MetronomeSettings;
use crate::sound::{
    BuiltinCatalog, DEFAULT_TIMBRE, LIVE_SOUNDS, SoundCatalog, SoundDescriptor, Timbre,
};
use crate::synth::envelope::{EnvelopeMapper, StressConfig, tone_gain};

/// Quiet period before a tempo change restarts the beat
pub const BPM_DEBOUNCE_MS: f64 = 50.0;

/// Consumer callback run for every sub-beat, before the click is played
pub type BeatHook = Box<dyn FnMut(&BeatEvent) -> Result<(), CallbackError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetronomeState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlTask {
    MainBeat,
    DebouncedRestart,
}

/// Everything needed to turn a sub-beat into a click
struct VoiceSettings {
    stress: StressConfig,
    /// Logical volume, 1..=100
    volume: f64,
    /// Set by a volume of 0 or less, cleared by any positive volume
    volume_silenced: bool,
    muted: bool,
    timbre: SoundDescriptor,
    synth: EnvelopeMapper,
    sample: EnvelopeMapper,
}

impl VoiceSettings {
    fn is_silent(&self) -> bool {
        self.muted || self.volume_silenced
    }
}

/// Per-beat listener borrowing the parts of the controller the scheduler does not own
struct BeatDispatch<'a, S: AudioSink> {
    sink: &'a mut S,
    hook: Option<&'a mut BeatHook>,
    voice: &'a VoiceSettings,
    sub_beat: &'a mut usize,
}

impl<S: AudioSink> BeatListener for BeatDispatch<'_, S> {
    fn on_beat(&mut self, event: &BeatEvent) -> Result<(), CallbackError> {
        *self.sub_beat = event.sub_beat_index;

        let hook_result = match self.hook.as_mut() {
            Some(hook) => hook(event),
            None => Ok(()),
        };

        if !self.voice.is_silent() {
            let voice = self.voice;
            match &voice.timbre.timbre {
                Timbre::Live(sound) => {
                    let params = voice.synth.map(event, &voice.stress, voice.volume);
                    let tier = FrequencyTier::for_role(params.role);
                    self.sink.play_tone(
                        params.role,
                        ToneParams {
                            tier,
                            frequency_hz: sound.frequency(tier),
                            waveform: sound.waveform,
                            gain: tone_gain(params.gain, sound.level),
                            fade_ms: params.fade_duration_ms as f32,
                        },
                    );
                }
                Timbre::Sample { .. } => {
                    let params = voice.sample.map(event, &voice.stress, voice.volume);
                    self.sink.play_sample(params.role, params.gain as f32);
                }
            }
        }

        hook_result
    }
}

pub struct MetronomeController<C: Clock, S: AudioSink> {
    clock: C,
    sink: S,
    catalog: Box<dyn SoundCatalog>,
    scheduler: TimingScheduler,
    timers: TimerQueue<ControlTask>,
    /// Periodic tick handle and its deadline
    main_beat_timer: Option<(TimerHandle, f64)>,
    debounce_timer: Option<TimerHandle>,
    notifier: Notifier,
    hook: Option<BeatHook>,

    state: MetronomeState,
    tempo: Tempo,
    time_signature: TimeSignature,
    subdivision: SubdivisionType,
    voice: VoiceSettings,

    /// Main-beat period armed by the last start
    period_ms: f64,
    main_beat: u32,
    sub_beat: usize,
    restart_count: u64,
    disposed: bool,
}

impl<C: Clock, S: AudioSink> MetronomeController<C, S> {
    pub fn new(clock: C, sink: S) -> Self {
        let timbre = LIVE_SOUNDS
            .iter()
            .find(|s| s.id == DEFAULT_TIMBRE)
            .unwrap_or(&LIVE_SOUNDS[0])
            .descriptor();
        let tempo = Tempo::default();

        Self {
            clock,
            sink,
            catalog: Box::new(BuiltinCatalog),
            scheduler: TimingScheduler::new(SubdivisionTable::shared()),
            timers: TimerQueue::new(),
            main_beat_timer: None,
            debounce_timer: None,
            notifier: Notifier::silent(),
            hook: None,
            state: MetronomeState::Stopped,
            tempo,
            time_signature: TimeSignature::default(),
            subdivision: SubdivisionType::default(),
            voice: VoiceSettings {
                stress: StressConfig::default(),
                volume: 65.0,
                volume_silenced: false,
                muted: false,
                timbre,
                synth: EnvelopeMapper::synth(),
                sample: EnvelopeMapper::sample(),
            },
            period_ms: tempo.beat_duration_ms(),
            main_beat: 0,
            sub_beat: 0,
            restart_count: 0,
            disposed: false,
        }
    }

    pub fn with_catalog(mut self, catalog: Box<dyn SoundCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_table(mut self, table: Arc<SubdivisionTable>) -> Self {
        let policy = self.scheduler.policy();
        self.scheduler = TimingScheduler::new(table).with_policy(policy);
        self.scheduler.set_notifier(self.notifier.clone());
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.scheduler.set_notifier(notifier.clone());
        self.notifier = notifier;
        self
    }

    pub fn set_beat_hook(&mut self, hook: Option<BeatHook>) {
        self.hook = hook;
    }

    pub fn set_unknown_subdivision_policy(&mut self, policy: UnknownSubdivisionPolicy) {
        self.scheduler.set_policy(policy);
    }

    // ---- Transport ----

    pub fn start(&mut self) {
        if self.disposed || self.state == MetronomeState::Running {
            return;
        }

        self.state = MetronomeState::Running;
        self.main_beat = 0;
        self.sub_beat = 0;
        self.period_ms = self.tempo.beat_duration_ms();

        let now = self.clock.now_ms();
        self.perform_main_beat(now);
        self.arm_main_beat(now + self.period_ms);

        log::info!(
            target: "metronome::controller",
            "started: {} bpm, {}, {}",
            self.tempo.bpm(),
            self.time_signature,
            self.subdivision
        );
    }

    pub fn stop(&mut self) {
        if self.state == MetronomeState::Stopped {
            return;
        }

        if let Some((handle, _)) = self.main_beat_timer.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = self.debounce_timer.take() {
            self.timers.cancel(handle);
        }
        self.scheduler.cancel_pending();
        self.state = MetronomeState::Stopped;

        log::info!(target: "metronome::controller", "stopped");
    }

    pub fn restart(&mut self) {
        self.stop();
        self.start();
        self.restart_count += 1;
        log::debug!(target: "metronome::controller", "restarted (#{})", self.restart_count);
    }

    /// Fire every timer that is due, in time order. Returns how many fired.
    ///
    /// On equal deadlines the pending sub-beat goes before the main-beat tick.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;

        loop {
            let sub_due = self.scheduler.next_due_ms().filter(|&t| t <= now);
            let control_due = self.timers.next_due_ms().filter(|&t| t <= now);

            match (sub_due, control_due) {
                (Some(sub), Some(control)) if sub <= control => self.fire_sub_beat(now),
                (Some(_), None) => self.fire_sub_beat(now),
                (_, Some(_)) => self.fire_control(now),
                (None, None) => break,
            }
            fired += 1;
        }

        fired
    }

    /// Earliest pending deadline on either queue
    pub fn next_deadline_ms(&self) -> Option<f64> {
        match (self.scheduler.next_due_ms(), self.timers.next_due_ms()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stop and release everything; the controller stays inert afterwards
    pub fn dispose(&mut self) {
        self.stop();
        self.timers.cancel_all();
        self.scheduler.dispose();
        self.disposed = true;
        log::debug!(target: "metronome::controller", "disposed");
    }

    // ---- Setters ----

    /// Store the clamped tempo now, restart 50ms after the last call of a burst
    pub fn set_bpm(&mut self, bpm: f64) {
        self.tempo = Tempo::from_value(bpm);
        log::info!(target: "metronome::controller", "BPM set to {}", self.tempo.bpm());

        if let Some(handle) = self.debounce_timer.take() {
            self.timers.cancel(handle);
        }

        if self.state == MetronomeState::Running {
            let now = self.clock.now_ms();
            self.debounce_timer = Some(self.timers.schedule(
                now,
                BPM_DEBOUNCE_MS,
                ControlTask::DebouncedRestart,
            ));
        }
    }

    /// Fails on a fractional value, leaving the state untouched
    pub fn set_time_signature(&mut self, beats_per_bar: f64) -> MetronomeResult<()> {
        let time_signature = TimeSignature::from_value(beats_per_bar)?;
        self.time_signature = time_signature;
        log::info!(target: "metronome::controller", "time signature set to {}", time_signature);

        if self.state == MetronomeState::Running {
            self.restart();
        }
        Ok(())
    }

    /// Takes effect at the next main beat; the beat grid keeps running
    pub fn set_subdivision(&mut self, subdivision: SubdivisionType) {
        self.subdivision = subdivision;
        log::info!(target: "metronome::controller", "subdivision set to {}", subdivision);

        if self.state == MetronomeState::Running {
            self.scheduler.cancel_pending();
        }
    }

    pub fn set_subdivision_by_name(&mut self, name: &str) -> MetronomeResult<()> {
        let subdivision = name.parse::<SubdivisionType>()?;
        self.set_subdivision(subdivision);
        Ok(())
    }

    /// Clamp to 1..=100; 0 or less also silences the clicks until a positive volume
    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            log::warn!(target: "metronome::controller", "ignoring NaN volume");
            return;
        }
        self.voice.volume_silenced = volume <= 0.0;
        self.voice.volume = volume.clamp(1.0, 100.0);
    }

    pub fn mute(&mut self) {
        self.set_muted(true);
    }

    pub fn unmute(&mut self) {
        self.set_muted(false);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.voice.muted = muted;
    }

    pub fn set_stress(&mut self, stress: StressConfig) {
        self.voice.stress = stress;
    }

    pub fn set_stress_first_beat(&mut self, enabled: bool) {
        self.voice.stress.stress_first_beat = enabled;
    }

    pub fn set_stress_first_sub_beat(&mut self, enabled: bool) {
        self.voice.stress.stress_first_sub_beat = enabled;
    }

    /// Switch sound; unknown ids leave the current sound in place
    ///
    /// A preset that fails to load is still selected (its clicks stay silent)
    /// and the failure is reported.
    pub fn set_timbre(&mut self, id: &str) -> MetronomeResult<()> {
        let sound = self
            .catalog
            .resolve(id)
            .ok_or_else(|| MetronomeError::UnknownSound(id.to_string()))?;

        if let Err(e) = self.sink.prepare_sample(&sound) {
            self.notifier.notify(Notification::error(
                NotificationCategory::Audio,
                format!("Failed to load sound {}: {}", sound.id, e),
            ));
        }

        log::info!(target: "metronome::controller", "timbre set to {}", sound.id);
        self.voice.timbre = sound;
        Ok(())
    }

    // ---- Accessors ----

    pub fn state(&self) -> MetronomeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MetronomeState::Running
    }

    pub fn bpm(&self) -> u32 {
        self.tempo.bpm()
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn subdivision(&self) -> SubdivisionType {
        self.subdivision
    }

    pub fn volume(&self) -> f64 {
        self.voice.volume
    }

    pub fn is_muted(&self) -> bool {
        self.voice.muted
    }

    pub fn is_volume_silenced(&self) -> bool {
        self.voice.volume_silenced
    }

    pub fn stress(&self) -> StressConfig {
        self.voice.stress
    }

    pub fn timbre(&self) -> &SoundDescriptor {
        &self.voice.timbre
    }

    pub fn catalog(&self) -> &dyn SoundCatalog {
        self.catalog.as_ref()
    }

    /// Index of the last triggered main beat within the bar
    pub fn main_beat(&self) -> u32 {
        self.main_beat
    }

    /// Index of the last fired sub-beat within its main beat
    pub fn sub_beat(&self) -> usize {
        self.sub_beat
    }

    /// Restarts performed since creation (tempo and time signature changes)
    pub fn restart_count(&self) -> u64 {
        self.restart_count
    }

    pub fn pending_sub_beats(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Deadline of the next main-beat tick, if armed
    pub fn next_main_beat_ms(&self) -> Option<f64> {
        self.main_beat_timer.map(|(_, due_ms)| due_ms)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ---- Settings snapshot ----

    pub fn settings(&self) -> MetronomeSettings {
        MetronomeSettings {
            bpm: self.tempo.bpm(),
            time_signature: self.time_signature.beats_per_bar(),
            subdivision: self.subdivision,
            timbre: self.voice.timbre.id.clone(),
            volume: if self.voice.volume_silenced { 0.0 } else { self.voice.volume },
            is_muted: self.voice.muted,
            stress_first_beat: self.voice.stress.stress_first_beat,
            stress_first_sub_beat: self.voice.stress.stress_first_sub_beat,
        }
    }

    /// Adopt a validated record through the regular setters
    ///
    /// Every field is applied; a rejected one is reported and the first
    /// failure is returned after the others have been adopted.
    pub fn apply_settings(&mut self, settings: &MetronomeSettings) -> MetronomeResult<()> {
        self.set_bpm(settings.bpm as f64);
        let signature = self.set_time_signature(settings.time_signature as f64);
        if let Err(e) = &signature {
            self.notifier.report(e);
        }
        self.set_subdivision(settings.subdivision);
        self.set_volume(settings.volume);
        self.set_muted(settings.is_muted);
        self.set_stress(StressConfig::new(
            settings.stress_first_beat,
            settings.stress_first_sub_beat,
        ));

        let timbre = self.set_timbre(&settings.timbre);
        if let Err(e) = &timbre {
            self.notifier.report(e);
        }
        signature.and(timbre)
    }

    // ---- Internals ----

    fn arm_main_beat(&mut self, due_ms: f64) {
        let handle = self.timers.schedule_at(due_ms, ControlTask::MainBeat);
        self.main_beat_timer = Some((handle, due_ms));
    }

    fn perform_main_beat(&mut self, anchor_ms: f64) {
        let mut dispatch = BeatDispatch {
            sink: &mut self.sink,
            hook: self.hook.as_mut(),
            voice: &self.voice,
            sub_beat: &mut self.sub_beat,
        };

        if let Err(e) = self.scheduler.trigger_subdivision(
            anchor_ms,
            self.period_ms,
            self.main_beat,
            self.subdivision,
            &mut dispatch,
        ) {
            log::debug!(
                target: "metronome::controller",
                "main beat {} skipped: {}",
                self.main_beat,
                e
            );
        }
    }

    fn fire_sub_beat(&mut self, now_ms: f64) {
        let mut dispatch = BeatDispatch {
            sink: &mut self.sink,
            hook: self.hook.as_mut(),
            voice: &self.voice,
            sub_beat: &mut self.sub_beat,
        };
        self.scheduler.fire_next_due(now_ms, &mut dispatch);
    }

    fn fire_control(&mut self, now_ms: f64) {
        let Some((due_ms, _, task)) = self.timers.pop_due(now_ms) else {
            return;
        };

        match task {
            ControlTask::MainBeat => {
                self.main_beat_timer = None;
                if self.state != MetronomeState::Running {
                    return;
                }

                self.main_beat = (self.main_beat + 1) % self.time_signature.beats_per_bar();
                self.perform_main_beat(due_ms);

                let mut next_ms = due_ms + self.period_ms;
                if next_ms <= now_ms {
                    // Fell behind by more than a period: drop the missed beats
                    let missed = ((now_ms - next_ms) / self.period_ms).floor() + 1.0;
                    next_ms += missed * self.period_ms;
                    log::warn!(
                        target: "metronome::controller",
                        "timer late by {:.1}ms, {} main beats dropped",
                        now_ms - due_ms,
                        missed
                    );
                }
                self.arm_main_beat(next_ms);
            }
            ControlTask::DebouncedRestart => {
                self.debounce_timer = None;
                if self.state == MetronomeState::Running {
                    self.restart();
                }
            }
        }
    }
}
