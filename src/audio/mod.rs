// Module audio - Sortie des clics : capacité AudioSink et backend CPAL

pub mod dsp_utils;
pub mod engine;
pub mod sink;

pub use engine::ClickEngine;
pub use sink::{AudioSink, FrequencyTier, NullSink, ToneParams};
