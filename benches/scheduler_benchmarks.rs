use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mymusic_metronome::sequencer::scheduler::expand;
use mymusic_metronome::synth::envelope::{EnvelopeMapper, StressConfig};
use mymusic_metronome::synth::oscillator::WaveformType;
use mymusic_metronome::synth::voice_manager::VoiceManager;
use mymusic_metronome::{
    ManualClock, MetronomeController, NullSink, SubdivisionTable, SubdivisionType,
};

/// Expansion of one main beat into sub-beat events, per pattern
fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    let table = SubdivisionTable::shared();

    for kind in [
        SubdivisionType::Quarter,
        SubdivisionType::Triplet,
        SubdivisionType::Sixteenth,
        SubdivisionType::TripletVariant,
    ] {
        let Some(pattern) = table.get(kind) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(kind), pattern, |b, pattern| {
            b.iter(|| {
                for event in expand(pattern, black_box(500.0), black_box(1)) {
                    black_box(event);
                }
            });
        });
    }
    group.finish();
}

/// Role, fade and gain for every sub-beat of a 4/4 bar of sixteenths
fn bench_envelope_map(c: &mut Criterion) {
    let table = SubdivisionTable::shared();
    let Some(pattern) = table.get(SubdivisionType::Sixteenth) else {
        return;
    };
    let events: Vec<_> = (0..4).flat_map(|beat| expand(pattern, 500.0, beat)).collect();
    let mapper = EnvelopeMapper::synth();
    let stress = StressConfig::default();

    c.bench_function("envelope_map_bar", |b| {
        b.iter(|| {
            for event in &events {
                black_box(mapper.map(event, &stress, black_box(65.0)));
            }
        });
    });
}

/// One second of virtual time through the controller, 1ms polls
fn bench_controller_poll(c: &mut Criterion) {
    c.bench_function("controller_one_second", |b| {
        b.iter(|| {
            let clock = ManualClock::new();
            let mut controller = MetronomeController::new(clock.clone(), NullSink);
            controller.set_bpm(240.0);
            controller.set_subdivision(SubdivisionType::Sixteenth);
            controller.start();
            for _ in 0..1000 {
                clock.advance(1.0);
                black_box(controller.poll());
            }
        });
    });
}

/// Click mixing with a full tone pool (critical for the audio callback)
fn bench_click_mixing(c: &mut Criterion) {
    let sample_rate = 48000.0;
    let buffer_size = 512;

    c.bench_function("voice_manager_8_clicks", |b| {
        let mut manager = VoiceManager::new(sample_rate);
        b.iter(|| {
            for _ in 0..8 {
                manager.play_tone(WaveformType::Square, 800.0, 1.0, 250.0);
            }
            for _ in 0..buffer_size {
                black_box(manager.next_sample());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_expand,
    bench_envelope_map,
    bench_controller_poll,
    bench_click_mixing
);
criterion_main!(benches);
