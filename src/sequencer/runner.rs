// Runner - Drives a controller on its own thread
//
// The controller is built inside the thread (audio streams are not always
// Send), then the loop drains commands, polls, and parks until the next
// timer deadline. Sending a command unparks the thread, so a command never
// waits for a beat to be processed.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ringbuf::traits::{Consumer, Producer};

use super::metronome::{BeatHook, MetronomeController, MetronomeState};
use super::timer::{Clock, SystemClock};
use crate::audio::sink::AudioSink;
use crate::messaging::{Command, CommandConsumer, CommandProducer, Notifier, create_command_channel};
use crate::settings::MetronomeSettings;
use crate::sound::{BuiltinCatalog, SoundCatalog};

const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Longest sleep when nothing is scheduled
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Last state published by the metronome thread
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerStatus {
    pub state: MetronomeState,
    pub main_beat: u32,
    pub sub_beat: usize,
    pub settings: MetronomeSettings,
}

type SharedStatus = Arc<Mutex<RunnerStatus>>;

fn publish<C: Clock, S: AudioSink>(status: &SharedStatus, controller: &MetronomeController<C, S>) {
    if let Ok(mut status) = status.lock() {
        status.state = controller.state();
        status.main_beat = controller.main_beat();
        status.sub_beat = controller.sub_beat();
        status.settings = controller.settings();
    }
}

/// Configuration of the metronome thread
pub struct MetronomeRunner {
    settings: MetronomeSettings,
    catalog: Box<dyn SoundCatalog>,
    notifier: Notifier,
    hook: Option<BeatHook>,
}

impl MetronomeRunner {
    pub fn new(settings: MetronomeSettings) -> Self {
        Self {
            settings,
            catalog: Box::new(BuiltinCatalog),
            notifier: Notifier::silent(),
            hook: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Box<dyn SoundCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_hook(mut self, hook: BeatHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Start the thread; `make_sink` runs on it to open the audio output
    pub fn spawn<F, S>(self, make_sink: F) -> std::io::Result<RunnerHandle>
    where
        F: FnOnce(&Notifier) -> S + Send + 'static,
        S: AudioSink + 'static,
    {
        let (tx, rx) = create_command_channel(COMMAND_QUEUE_CAPACITY);
        let status = Arc::new(Mutex::new(RunnerStatus {
            state: MetronomeState::Stopped,
            main_beat: 0,
            sub_beat: 0,
            settings: self.settings.clone(),
        }));
        let thread_status = Arc::clone(&status);

        let thread = thread::Builder::new()
            .name("metronome".to_string())
            .spawn(move || {
                let sink = make_sink(&self.notifier);
                log::info!(target: "metronome::runner", "audio output: {}", sink.name());

                let mut controller = MetronomeController::new(SystemClock::new(), sink)
                    .with_catalog(self.catalog)
                    .with_notifier(self.notifier.clone());
                controller.set_beat_hook(self.hook);

                if let Err(e) = controller.apply_settings(&self.settings) {
                    log::warn!(target: "metronome::runner", "settings partly applied: {e}");
                }

                publish(&thread_status, &controller);
                run_loop(controller, rx, &self.notifier, &thread_status)
            })?;

        Ok(RunnerHandle { tx, thread, status })
    }
}

fn run_loop<S: AudioSink>(
    mut controller: MetronomeController<SystemClock, S>,
    mut rx: CommandConsumer,
    notifier: &Notifier,
    status: &SharedStatus,
) -> MetronomeSettings {
    loop {
        let mut changed = false;
        while let Some(command) = rx.try_pop() {
            if matches!(command, Command::Quit) {
                let settings = controller.settings();
                controller.dispose();
                publish(status, &controller);
                log::info!(target: "metronome::runner", "quit");
                return settings;
            }
            apply_command(&mut controller, command, notifier);
            changed = true;
        }

        if controller.poll() > 0 || changed {
            publish(status, &controller);
        }

        let wait = match controller.next_deadline_ms() {
            Some(due_ms) => {
                let remaining_ms = (due_ms - controller.clock().now_ms()).max(0.0);
                Duration::from_secs_f64(remaining_ms / 1000.0).min(IDLE_WAIT)
            }
            None => IDLE_WAIT,
        };
        if !wait.is_zero() {
            thread::park_timeout(wait);
        }
    }
}

fn apply_command<C: Clock, S: AudioSink>(
    controller: &mut MetronomeController<C, S>,
    command: Command,
    notifier: &Notifier,
) {
    let result = match command {
        Command::Start => {
            controller.start();
            Ok(())
        }
        Command::Stop => {
            controller.stop();
            Ok(())
        }
        Command::SetBpm(bpm) => {
            controller.set_bpm(bpm);
            Ok(())
        }
        Command::SetTimeSignature(beats) => controller.set_time_signature(beats),
        Command::SetSubdivision(subdivision) => {
            controller.set_subdivision(subdivision);
            Ok(())
        }
        Command::SetVolume(volume) => {
            controller.set_volume(volume);
            Ok(())
        }
        Command::SetMuted(muted) => {
            controller.set_muted(muted);
            Ok(())
        }
        Command::SetStress(stress) => {
            controller.set_stress(stress);
            Ok(())
        }
        Command::SetTimbre(id) => controller.set_timbre(&id),
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        notifier.report(&e);
    }
}

/// Control side of a running metronome thread
pub struct RunnerHandle {
    tx: CommandProducer,
    thread: JoinHandle<MetronomeSettings>,
    status: SharedStatus,
}

impl RunnerHandle {
    /// Queue a command and wake the thread. Returns false if the queue is full.
    pub fn send(&mut self, command: Command) -> bool {
        let sent = self.tx.try_push(command).is_ok();
        if !sent {
            log::warn!(target: "metronome::runner", "command queue full, command dropped");
        }
        self.thread.thread().unpark();
        sent
    }

    /// Snapshot of the state as of the last command or beat
    pub fn status(&self) -> Option<RunnerStatus> {
        self.status.lock().ok().map(|status| status.clone())
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop the thread and return the settings it ended with
    pub fn quit(mut self) -> thread::Result<MetronomeSettings> {
        let mut command = Command::Quit;
        loop {
            match self.tx.try_push(command) {
                Ok(()) => break,
                Err(rejected) => {
                    command = rejected;
                    self.thread.thread().unpark();
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
        self.thread.thread().unpark();
        self.thread.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::NullSink;
    use crate::sequencer::{BeatEvent, CallbackError, SubdivisionType};
    use std::time::Instant;

    #[test]
    fn test_quit_returns_final_settings() {
        let mut handle = MetronomeRunner::new(MetronomeSettings::default())
            .spawn(|_: &Notifier| NullSink)
            .unwrap();

        assert!(handle.send(Command::SetBpm(132.0)));
        assert!(handle.send(Command::SetSubdivision(SubdivisionType::Triplet)));
        assert!(handle.send(Command::SetTimeSignature(3.5))); // rejected, reported

        let settings = handle.quit().unwrap();
        assert_eq!(settings.bpm, 132);
        assert_eq!(settings.subdivision, SubdivisionType::Triplet);
        assert_eq!(settings.time_signature, 4);
    }

    #[test]
    fn test_start_fires_hook_on_runner_thread() {
        let beats = Arc::new(Mutex::new(Vec::new()));
        let beats_hook = Arc::clone(&beats);
        let hook = move |event: &BeatEvent| -> Result<(), CallbackError> {
            beats_hook.lock().unwrap().push(event.main_beat_index);
            Ok(())
        };

        let mut handle = MetronomeRunner::new(MetronomeSettings::default())
            .with_hook(Box::new(hook))
            .spawn(|_: &Notifier| NullSink)
            .unwrap();

        handle.send(Command::Start);
        let settings = handle.quit().unwrap();

        // Commands are handled in order, so the first beat fired before Quit
        assert_eq!(beats.lock().unwrap().first(), Some(&0));
        assert_eq!(settings, MetronomeSettings::default());
    }

    #[test]
    fn test_initial_settings_are_applied() {
        let initial = MetronomeSettings {
            bpm: 200,
            timbre: "live-sawtooth".to_string(),
            is_muted: true,
            ..Default::default()
        };

        let handle = MetronomeRunner::new(initial.clone())
            .spawn(|_: &Notifier| NullSink)
            .unwrap();
        assert_eq!(handle.quit().unwrap(), initial);
    }

    #[test]
    fn test_status_follows_commands() {
        let mut handle = MetronomeRunner::new(MetronomeSettings::default())
            .spawn(|_: &Notifier| NullSink)
            .unwrap();

        handle.send(Command::SetBpm(90.0));
        handle.send(Command::Start);

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut status = handle.status().unwrap();
        while status.state != MetronomeState::Running && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
            status = handle.status().unwrap();
        }

        assert_eq!(status.state, MetronomeState::Running);
        assert_eq!(status.settings.bpm, 90);
        assert!(!handle.is_finished());

        handle.send(Command::Stop);
        handle.quit().unwrap();
    }
}
