// Settings record - The persisted metronome state
//
// Saving is a plain serde serialization. Loading never deserializes straight
// into the struct: each field is read from the JSON value on its own,
// type-checked and clamped, and a bad field falls back to its default with a
// warning instead of spoiling the whole record.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::SettingsError;
use crate::sequencer::{SubdivisionType, Tempo, TimeSignature};
use crate::sound::DEFAULT_TIMBRE;

/// Highest logical volume
pub const VOLUME_MAX: f64 = 100.0;

fn serialize_subdivision<S: Serializer>(
    subdivision: &SubdivisionType,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(subdivision.name())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetronomeSettings {
    pub bpm: u32,
    pub time_signature: u32,
    #[serde(serialize_with = "serialize_subdivision")]
    pub subdivision: SubdivisionType,
    pub timbre: String,
    /// Logical volume in [0, 100]; 0 means silenced by the volume control
    pub volume: f64,
    pub is_muted: bool,
    pub stress_first_beat: bool,
    pub stress_first_sub_beat: bool,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        Self {
            bpm: Tempo::default().bpm(),
            time_signature: TimeSignature::default().beats_per_bar(),
            subdivision: SubdivisionType::Quarter,
            timbre: DEFAULT_TIMBRE.to_string(),
            volume: 65.0,
            is_muted: false,
            stress_first_beat: true,
            stress_first_sub_beat: true,
        }
    }
}

/// A field that was present but could not be adopted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsWarning {
    pub field: &'static str,
    pub reason: String,
}

impl SettingsWarning {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SettingsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

const KNOWN_FIELDS: [&str; 8] = [
    "bpm",
    "timeSignature",
    "subdivision",
    "timbre",
    "volume",
    "isMuted",
    "stressFirstBeat",
    "stressFirstSubBeat",
];

fn number_field(
    record: &Map<String, Value>,
    field: &'static str,
    warnings: &mut Vec<SettingsWarning>,
) -> Option<f64> {
    let value = record.get(field)?;
    match value.as_f64() {
        Some(n) if n.is_finite() => Some(n),
        _ => {
            warnings.push(SettingsWarning::new(field, format!("expected a number, got {value}")));
            None
        }
    }
}

fn bool_field(
    record: &Map<String, Value>,
    field: &'static str,
    warnings: &mut Vec<SettingsWarning>,
) -> Option<bool> {
    let value = record.get(field)?;
    match value.as_bool() {
        Some(b) => Some(b),
        None => {
            warnings.push(SettingsWarning::new(field, format!("expected a boolean, got {value}")));
            None
        }
    }
}

fn string_field<'a>(
    record: &'a Map<String, Value>,
    field: &'static str,
    warnings: &mut Vec<SettingsWarning>,
) -> Option<&'a str> {
    let value = record.get(field)?;
    match value.as_str() {
        Some(s) => Some(s),
        None => {
            warnings.push(SettingsWarning::new(field, format!("expected a string, got {value}")));
            None
        }
    }
}

impl MetronomeSettings {
    /// Decode a stored record field by field
    ///
    /// Missing fields keep their defaults silently, rejected ones keep their
    /// defaults and produce a warning. Only a non-object root is an error.
    pub fn from_json_value(value: &Value) -> Result<(Self, Vec<SettingsWarning>), SettingsError> {
        let record = value.as_object().ok_or_else(|| {
            SettingsError::InvalidRecord(format!("expected a JSON object, got {value}"))
        })?;

        let mut settings = Self::default();
        let mut warnings = Vec::new();

        if let Some(bpm) = number_field(record, "bpm", &mut warnings) {
            settings.bpm = Tempo::from_value(bpm).bpm();
        }

        if let Some(beats) = number_field(record, "timeSignature", &mut warnings) {
            match TimeSignature::from_value(beats) {
                Ok(sig) => settings.time_signature = sig.beats_per_bar(),
                Err(e) => warnings.push(SettingsWarning::new("timeSignature", e.to_string())),
            }
        }

        if let Some(name) = string_field(record, "subdivision", &mut warnings) {
            match name.parse::<SubdivisionType>() {
                Ok(subdivision) => settings.subdivision = subdivision,
                Err(e) => warnings.push(SettingsWarning::new("subdivision", e.to_string())),
            }
        }

        if let Some(timbre) = string_field(record, "timbre", &mut warnings) {
            if timbre.trim().is_empty() {
                warnings.push(SettingsWarning::new("timbre", "empty sound id"));
            } else {
                settings.timbre = timbre.to_string();
            }
        }

        if let Some(volume) = number_field(record, "volume", &mut warnings) {
            settings.volume = volume.clamp(0.0, VOLUME_MAX);
        }

        if let Some(muted) = bool_field(record, "isMuted", &mut warnings) {
            settings.is_muted = muted;
        }
        if let Some(stress) = bool_field(record, "stressFirstBeat", &mut warnings) {
            settings.stress_first_beat = stress;
        }
        if let Some(stress) = bool_field(record, "stressFirstSubBeat", &mut warnings) {
            settings.stress_first_sub_beat = stress;
        }

        for key in record.keys() {
            if !KNOWN_FIELDS.contains(&key.as_str()) {
                log::debug!(target: "metronome::settings", "ignoring unknown field {key}");
            }
        }

        Ok((settings, warnings))
    }

    pub fn to_json_value(&self) -> Result<Value, SettingsError> {
        Ok(serde_json::to_value(self)?)
    }
}
