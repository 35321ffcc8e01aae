// Settings store - Loads and saves the settings record as JSON

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::types::{MetronomeSettings, SettingsWarning};
use super::SettingsError;

const APP_DIR: &str = "mymusic-metronome";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/mymusic-metronome/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Store at the platform config location
    pub fn open_default() -> Result<Self, SettingsError> {
        Self::default_path().map(Self::new).ok_or_else(|| {
            SettingsError::InvalidRecord("no configuration directory on this platform".to_string())
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, or defaults when no file exists yet
    pub fn load(&self) -> Result<(MetronomeSettings, Vec<SettingsWarning>), SettingsError> {
        if !self.path.exists() {
            log::info!(
                target: "metronome::settings",
                "no settings at {}, using defaults",
                self.path.display()
            );
            return Ok((MetronomeSettings::default(), Vec::new()));
        }

        let content = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&content)?;
        let (settings, warnings) = MetronomeSettings::from_json_value(&value)?;

        for warning in &warnings {
            log::warn!(target: "metronome::settings", "rejected field {warning}");
        }
        log::debug!(target: "metronome::settings", "loaded {}", self.path.display());

        Ok((settings, warnings))
    }

    pub fn save(&self, settings: &MetronomeSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;

        log::debug!(target: "metronome::settings", "saved {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::SubdivisionType;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        let (settings, warnings) = store.load().unwrap();
        assert_eq!(settings, MetronomeSettings::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));

        let settings = MetronomeSettings {
            bpm: 144,
            time_signature: 6,
            subdivision: SubdivisionType::Syncopation,
            is_muted: true,
            ..Default::default()
        };
        store.save(&settings).unwrap();

        let (loaded, warnings) = store.load().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let result = SettingsStore::new(path).load();
        assert!(matches!(result, Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_default_path_shape() {
        if let Some(path) = SettingsStore::default_path() {
            assert!(path.ends_with("mymusic-metronome/settings.json"));
        }
    }
}
