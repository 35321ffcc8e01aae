// Sound catalog - Preset discovery on disk and timbre switching

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use mymusic_metronome::audio::sink::{AudioSink, ToneParams};
use mymusic_metronome::sound::{SoundError, Timbre, load_wav};
use mymusic_metronome::synth::envelope::VoiceRole;
use mymusic_metronome::{
    DirectoryCatalog, ManualClock, MetronomeController, MetronomeError, SoundCatalog,
    SoundDescriptor,
};
use tempfile::tempdir;

fn write_click(path: &Path, len: usize) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..len {
        let value = if i % 2 == 0 { 8000 } else { -8000 };
        writer.write_sample(value as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[derive(Default)]
struct SampleSink {
    prepared: Vec<String>,
    samples: Vec<(VoiceRole, f32)>,
    tones: usize,
}

impl AudioSink for SampleSink {
    fn play_tone(&mut self, _role: VoiceRole, _params: ToneParams) {
        self.tones += 1;
    }

    fn play_sample(&mut self, role: VoiceRole, gain: f32) {
        self.samples.push((role, gain));
    }

    fn prepare_sample(&mut self, sound: &SoundDescriptor) -> Result<(), SoundError> {
        if let Timbre::Sample { hi, lo } = &sound.timbre {
            load_wav(hi)?;
            load_wav(lo)?;
        }
        self.prepared.push(sound.id.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "samples"
    }
}

#[test]
fn test_scan_lists_builtin_then_presets() {
    let dir = tempdir().unwrap();
    write_click(&dir.path().join("Perc_Can_hi.wav"), 64);
    write_click(&dir.path().join("Perc_Can_lo.wav"), 64);
    write_click(&dir.path().join("Wood_Block_Dry_hi.wav"), 64);
    write_click(&dir.path().join("Wood_Block_Dry_lo.wav"), 64);
    // Half a pair is ignored
    write_click(&dir.path().join("Bell_Ding_hi.wav"), 64);

    let catalog = DirectoryCatalog::scan(dir.path()).unwrap();
    let ids: Vec<String> = catalog.sounds().into_iter().map(|s| s.id).collect();
    assert_eq!(
        ids,
        vec![
            "live-triangle",
            "live-square",
            "live-sine",
            "live-sawtooth",
            "perc-can",
            "wood-block-dry",
        ]
    );

    let wood = catalog.resolve("wood-block-dry").unwrap();
    assert_eq!(wood.name, "Block Dry");
    assert!(!wood.is_live());
}

#[test]
fn test_missing_directory_has_only_builtins() {
    let dir = tempdir().unwrap();
    let catalog = DirectoryCatalog::scan(&dir.path().join("nowhere")).unwrap();
    assert!(catalog.samples().is_empty());
    assert_eq!(catalog.sounds().len(), 4);
}

#[test]
fn test_sample_timbre_routes_roles() {
    let dir = tempdir().unwrap();
    write_click(&dir.path().join("Perc_Can_hi.wav"), 128);
    write_click(&dir.path().join("Perc_Can_lo.wav"), 128);
    let catalog = DirectoryCatalog::scan(dir.path()).unwrap();

    let clock = ManualClock::new();
    let mut controller = MetronomeController::new(clock.clone(), SampleSink::default())
        .with_catalog(Box::new(catalog));
    controller.set_timbre("perc-can").unwrap();
    assert_eq!(controller.sink().prepared, vec!["perc-can"]);

    controller.set_bpm(120.0);
    controller.set_time_signature(2.0).unwrap();
    controller.start();
    for _ in 0..500 {
        clock.advance(1.0);
        controller.poll();
    }

    let roles: Vec<VoiceRole> = controller.sink().samples.iter().map(|(r, _)| *r).collect();
    assert_eq!(roles, vec![VoiceRole::Accent, VoiceRole::SecondaryAccent]);
    assert_eq!(controller.sink().tones, 0);
    // Sample gains live in the 1..60 range
    assert!(controller.sink().samples.iter().all(|(_, g)| (1.0..=60.0).contains(g)));
}

#[test]
fn test_unknown_timbre_keeps_current_sound() {
    let mut controller = MetronomeController::new(ManualClock::new(), SampleSink::default());
    controller.set_timbre("live-sine").unwrap();

    let result = controller.set_timbre("perc-nothing");
    assert!(matches!(result, Err(MetronomeError::UnknownSound(_))));
    assert_eq!(controller.timbre().id, "live-sine");
}

#[test]
fn test_broken_preset_is_still_selected() {
    let dir = tempdir().unwrap();
    write_click(&dir.path().join("Perc_Bad_hi.wav"), 16);
    std::fs::write(dir.path().join("Perc_Bad_lo.wav"), b"not a wav").unwrap();
    let catalog = DirectoryCatalog::scan(dir.path()).unwrap();

    let mut controller = MetronomeController::new(ManualClock::new(), SampleSink::default())
        .with_catalog(Box::new(catalog));
    controller.set_timbre("perc-bad").unwrap();

    assert_eq!(controller.timbre().id, "perc-bad");
    assert!(controller.sink().prepared.is_empty());
}
