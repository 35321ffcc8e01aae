// Timing scheduler - Expands one main beat into timed sub-beat events
//
// Sub-beat 0 fires synchronously inside `trigger_subdivision`, anchoring the
// main beat to the call instant. The others wait in a timer queue at their
// offset from that instant until the owner polls them out. A new expansion
// always clears what is left of the previous one first, so two expansions are
// never pending together.

use std::sync::Arc;

use super::subdivision::{SubdivisionPattern, SubdivisionTable, SubdivisionType};
use super::timer::TimerQueue;
use super::{MetronomeError, MetronomeResult};
use crate::messaging::Notifier;

/// One sub-beat firing. Built by the scheduler, handed to the listener, dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    pub main_beat_index: u32,
    pub is_first_main_beat: bool,
    pub sub_beat_index: usize,
    pub is_first_sub_beat: bool,
    /// Length of this sub-beat
    pub duration_ms: f64,
    /// Share of the main beat taken by this sub-beat
    pub ratio: f64,
    /// Offset from the main-beat trigger instant
    pub time_offset_ms: f64,
}

/// Error type returned by consumer callbacks
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer of sub-beat events
pub trait BeatListener {
    fn on_beat(&mut self, event: &BeatEvent) -> Result<(), CallbackError>;
}

impl<F> BeatListener for F
where
    F: FnMut(&BeatEvent) -> Result<(), CallbackError>,
{
    fn on_beat(&mut self, event: &BeatEvent) -> Result<(), CallbackError> {
        self(event)
    }
}

/// What to do when the requested subdivision is missing from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownSubdivisionPolicy {
    /// Report and skip the whole main beat
    #[default]
    Skip,
    /// Report and play the beat as a plain quarter note
    FallbackToQuarter,
}

/// Lay out the sub-beats of one main beat
pub fn expand(
    pattern: &SubdivisionPattern,
    main_beat_duration_ms: f64,
    main_beat_index: u32,
) -> impl Iterator<Item = BeatEvent> + '_ {
    let mut offset_ms = 0.0;
    pattern
        .ratios
        .iter()
        .enumerate()
        .map(move |(sub_beat_index, &ratio)| {
            let duration_ms = ratio * main_beat_duration_ms;
            let event = BeatEvent {
                main_beat_index,
                is_first_main_beat: main_beat_index == 0,
                sub_beat_index,
                is_first_sub_beat: sub_beat_index == 0,
                duration_ms,
                ratio,
                time_offset_ms: offset_ms,
            };
            offset_ms += duration_ms;
            event
        })
}

pub struct TimingScheduler {
    table: Arc<SubdivisionTable>,
    pending: TimerQueue<BeatEvent>,
    policy: UnknownSubdivisionPolicy,
    notifier: Notifier,
    disposed: bool,
}

impl TimingScheduler {
    pub fn new(table: Arc<SubdivisionTable>) -> Self {
        Self {
            table,
            pending: TimerQueue::new(),
            policy: UnknownSubdivisionPolicy::default(),
            notifier: Notifier::silent(),
            disposed: false,
        }
    }

    pub fn with_policy(mut self, policy: UnknownSubdivisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: UnknownSubdivisionPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> UnknownSubdivisionPolicy {
        self.policy
    }

    pub fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    pub fn table(&self) -> &Arc<SubdivisionTable> {
        &self.table
    }

    /// Trigger a main beat and schedule all of its sub-beats
    ///
    /// Returns the number of sub-beats in the expansion. On an unknown
    /// subdivision under `Skip` nothing fires and the error is both reported
    /// and returned.
    pub fn trigger_subdivision(
        &mut self,
        now_ms: f64,
        main_beat_duration_ms: f64,
        main_beat_index: u32,
        subdivision: SubdivisionType,
        listener: &mut dyn BeatListener,
    ) -> MetronomeResult<usize> {
        self.cancel_pending();

        if self.disposed {
            log::debug!(target: "metronome::scheduler", "trigger ignored, scheduler disposed");
            return Ok(0);
        }

        log::debug!(
            target: "metronome::scheduler",
            "MAIN BEAT #{main_beat_index} | duration {main_beat_duration_ms:.2}ms | {subdivision}"
        );

        let table = Arc::clone(&self.table);
        let pattern = match (table.get(subdivision), self.policy) {
            (Some(pattern), _) => pattern,
            (None, UnknownSubdivisionPolicy::FallbackToQuarter) => {
                let error = MetronomeError::UnknownSubdivision(subdivision.to_string());
                self.notifier.report(&error);
                table
                    .get(SubdivisionType::Quarter)
                    .ok_or(error)?
            }
            (None, UnknownSubdivisionPolicy::Skip) => {
                let error = MetronomeError::UnknownSubdivision(subdivision.to_string());
                self.notifier.report(&error);
                return Err(error);
            }
        };

        for event in expand(pattern, main_beat_duration_ms, main_beat_index) {
            log::trace!(
                target: "metronome::scheduler",
                "SCHEDULED sub-beat {}.{} | offset {:.2}ms | duration {:.2}ms",
                event.main_beat_index,
                event.sub_beat_index,
                event.time_offset_ms,
                event.duration_ms
            );

            if event.is_first_sub_beat {
                self.dispatch(&event, listener);
            } else {
                self.pending.schedule(now_ms, event.time_offset_ms, event);
            }
        }

        Ok(pattern.len())
    }

    /// Deadline of the next pending sub-beat
    pub fn next_due_ms(&self) -> Option<f64> {
        self.pending.next_due_ms()
    }

    /// Fire the earliest pending sub-beat if it is due. Returns whether one fired.
    pub fn fire_next_due(&mut self, now_ms: f64, listener: &mut dyn BeatListener) -> bool {
        match self.pending.pop_due(now_ms) {
            Some((_, _, event)) => {
                self.dispatch(&event, listener);
                true
            }
            None => false,
        }
    }

    /// Fire every sub-beat due at `now_ms`, in offset order
    pub fn fire_due(&mut self, now_ms: f64, listener: &mut dyn BeatListener) -> usize {
        let mut fired = 0;
        while self.fire_next_due(now_ms, listener) {
            fired += 1;
        }
        fired
    }

    /// Drop every sub-beat that has not fired yet
    pub fn cancel_pending(&mut self) {
        if !self.pending.is_empty() {
            log::trace!(
                target: "metronome::scheduler",
                "cleared {} pending sub-beats",
                self.pending.len()
            );
        }
        self.pending.cancel_all();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancel pending work and refuse further expansions
    pub fn dispose(&mut self) {
        self.cancel_pending();
        self.disposed = true;
        log::debug!(target: "metronome::scheduler", "disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn dispatch(&self, event: &BeatEvent, listener: &mut dyn BeatListener) {
        log::trace!(
            target: "metronome::scheduler",
            "TRIGGERED sub-beat {}.{} | ratio {:.2}",
            event.main_beat_index,
            event.sub_beat_index,
            event.ratio
        );

        if let Err(e) = listener.on_beat(event) {
            self.notifier.report(&MetronomeError::CallbackFailure {
                main_beat: event.main_beat_index,
                sub_beat: event.sub_beat_index,
                message: e.to_string(),
            });
        }
    }
}

impl Default for TimingScheduler {
    fn default() -> Self {
        Self::new(SubdivisionTable::shared())
    }
}
