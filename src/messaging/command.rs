// Commands - Control side → metronome thread

use crate::sequencer::SubdivisionType;
use crate::synth::envelope::StressConfig;

#[derive(Debug, Clone)]
pub enum Command {
    Start,
    Stop,
    SetBpm(f64),
    SetTimeSignature(f64),
    SetSubdivision(SubdivisionType),
    SetVolume(f64),
    SetMuted(bool),
    SetStress(StressConfig),
    SetTimbre(String),
    Quit,
}
