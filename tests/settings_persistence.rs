// Settings persistence - Controller state survives a save/load cycle

use std::fs;

use mymusic_metronome::{
    ManualClock, MetronomeController, MetronomeSettings, NullSink, SettingsStore,
    SubdivisionType,
};
use tempfile::tempdir;

#[test]
fn test_controller_state_roundtrip() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));

    let mut controller = MetronomeController::new(ManualClock::new(), NullSink);
    controller.set_bpm(133.4);
    controller.set_time_signature(3.0).unwrap();
    controller.set_subdivision(SubdivisionType::Dotted31);
    controller.set_volume(42.0);
    controller.set_stress_first_sub_beat(false);
    controller.set_timbre("live-sine").unwrap();
    controller.mute();

    store.save(&controller.settings()).unwrap();

    let (loaded, warnings) = store.load().unwrap();
    assert!(warnings.is_empty());

    let mut restored = MetronomeController::new(ManualClock::new(), NullSink);
    restored.apply_settings(&loaded).unwrap();

    assert_eq!(restored.bpm(), 133);
    assert_eq!(restored.time_signature().beats_per_bar(), 3);
    assert_eq!(restored.subdivision(), SubdivisionType::Dotted31);
    assert_eq!(restored.volume(), 42.0);
    assert!(restored.is_muted());
    assert!(restored.stress().stress_first_beat);
    assert!(!restored.stress().stress_first_sub_beat);
    assert_eq!(restored.timbre().id, "live-sine");
    assert_eq!(restored.settings(), controller.settings());
}

#[test]
fn test_volume_zero_persists_as_silenced() {
    let mut controller = MetronomeController::new(ManualClock::new(), NullSink);
    controller.set_volume(0.0);
    let settings = controller.settings();
    assert_eq!(settings.volume, 0.0);

    let mut restored = MetronomeController::new(ManualClock::new(), NullSink);
    restored.apply_settings(&settings).unwrap();
    assert!(restored.is_volume_silenced());
    assert!(!restored.is_muted());
}

#[test]
fn test_hand_edited_file_is_validated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{
            "bpm": 1000,
            "timeSignature": 2.5,
            "subdivision": "sixteenth",
            "timbre": "live-triangle",
            "volume": "loud",
            "theme": "dark"
        }"#,
    )
    .unwrap();

    let (settings, warnings) = SettingsStore::new(&path).load().unwrap();
    let defaults = MetronomeSettings::default();

    assert_eq!(settings.bpm, 240);
    assert_eq!(settings.time_signature, defaults.time_signature);
    assert_eq!(settings.subdivision, SubdivisionType::Sixteenth);
    assert_eq!(settings.timbre, "live-triangle");
    assert_eq!(settings.volume, defaults.volume);

    let fields: Vec<&str> = warnings.iter().map(|w| w.field).collect();
    assert_eq!(fields, vec!["timeSignature", "volume"]);
}

#[test]
fn test_unknown_timbre_in_record_keeps_other_fields() {
    let settings = MetronomeSettings {
        bpm: 100,
        timbre: "perc-missing".to_string(),
        ..Default::default()
    };

    let mut controller = MetronomeController::new(ManualClock::new(), NullSink);
    assert!(controller.apply_settings(&settings).is_err());
    assert_eq!(controller.bpm(), 100);
    assert_eq!(controller.timbre().id, "live-square");
}
