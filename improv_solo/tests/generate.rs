// End-to-end tests for solo generation.
//
// Builds small random expert bundles, round-trips them through JSON on disk
// the way a trained model would arrive, and drives the public API from
// progression text to MIDI. Checks the properties every run must have
// regardless of weights: one event per step, pitches inside the window,
// onsets tagged with the active chord root, determinism per seed.

use improv_prng::SoloRng;
use improv_solo::chord::Progression;
use improv_solo::encoding::{CHORD_INPUT_SIZE, INTERVAL_INPUT_SIZE, INTERVAL_VOCAB, PITCH_CLASS_VOCAB};
use improv_solo::error::SoloError;
use improv_solo::event::Event;
use improv_solo::generator::{ExpertModels, GenerationConfig, SoloGenerator, generate_solo};
use improv_solo::midi::write_midi;
use improv_solo::pitch::{HIGH_BOUND, LOW_BOUND};
use improv_solo::weights::{WeightBundle, random_bundle};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("improv_solo_{}_{name}", std::process::id()))
}

/// Random bundles saved to disk and loaded back.
fn models_from_disk(seed: u64) -> ExpertModels {
    let mut rng = SoloRng::new(seed);
    let interval = random_bundle("interval", INTERVAL_INPUT_SIZE, 24, INTERVAL_VOCAB, &mut rng);
    let chord = random_bundle("chord", CHORD_INPUT_SIZE, 24, PITCH_CLASS_VOCAB, &mut rng);

    let interval_path = temp_path(&format!("interval_{seed}.json"));
    let chord_path = temp_path(&format!("chord_{seed}.json"));
    interval.save(&interval_path).unwrap();
    chord.save(&chord_path).unwrap();
    let models = ExpertModels::load(&interval_path, &chord_path).unwrap();
    let _ = std::fs::remove_file(&interval_path);
    let _ = std::fs::remove_file(&chord_path);
    models
}

#[test]
fn two_bar_minor_ii_v_yields_sixteen_valid_events() {
    let models = models_from_disk(1);
    let progression = Progression::parse("Cm7:4 G7:4").unwrap();
    let (solo, stats) =
        generate_solo(&models, &progression, &GenerationConfig::default(), 42).unwrap();

    assert_eq!(solo.len(), 16);
    assert_eq!(stats.steps, 16);
    assert_eq!(
        (stats.onsets + stats.sustains + stats.rests) as usize,
        solo.len()
    );
    for e in &solo.events {
        if let Event::NoteOnset { pitch, chord_root } = e.event {
            assert!((LOW_BOUND..HIGH_BOUND).contains(&pitch), "pitch {pitch}");
            let expected_root = if e.timestep < 8 { 0 } else { 7 };
            assert_eq!(chord_root, expected_root, "timestep {}", e.timestep);
        }
    }
}

#[test]
fn same_seed_same_solo_different_seed_differs() {
    let models = models_from_disk(2);
    let progression = Progression::parse("Dm7:4 G7:4 Cmaj7:8").unwrap();
    let config = GenerationConfig::default();

    let (a, _) = generate_solo(&models, &progression, &config, 9).unwrap();
    let (b, _) = generate_solo(&models, &progression, &config, 9).unwrap();
    assert_eq!(a, b);

    let differs = (10..20).any(|seed| {
        let (c, _) = generate_solo(&models, &progression, &config, seed).unwrap();
        c != a
    });
    assert!(differs);
}

#[test]
fn stepping_matches_running() {
    let models = models_from_disk(3);
    let progression = Progression::parse("Bbmaj7:4 Eb7:4").unwrap();
    let config = GenerationConfig {
        steps_per_beat: 3,
        ..GenerationConfig::default()
    };

    let mut stepper = SoloGenerator::new(&models, progression.clone(), config.clone(), 5).unwrap();
    let mut stepped = Vec::new();
    while let Some(e) = stepper.step().unwrap() {
        stepped.push(e);
    }
    assert_eq!(stepped.len(), 24);

    let (solo, _) = generate_solo(&models, &progression, &config, 5).unwrap();
    assert_eq!(solo.events, stepped);
}

#[test]
fn unknown_quality_still_generates() {
    let models = models_from_disk(4);
    let progression = Progression::parse("Cwhatever:4").unwrap();
    let (solo, _) =
        generate_solo(&models, &progression, &GenerationConfig::default(), 1).unwrap();
    assert_eq!(solo.len(), 8);
}

#[test]
fn mismatched_bundles_are_rejected_at_load() {
    let mut rng = SoloRng::new(6);
    let interval = random_bundle("interval", INTERVAL_INPUT_SIZE, 8, INTERVAL_VOCAB, &mut rng);
    let chord = random_bundle("chord", CHORD_INPUT_SIZE, 8, PITCH_CLASS_VOCAB, &mut rng);

    // Swapped roles.
    assert!(matches!(
        ExpertModels::from_bundles(&chord, &interval),
        Err(SoloError::VocabularyMismatch { .. })
    ));

    // A bundle that lost a tensor on the way to disk.
    let mut broken: WeightBundle = interval.clone();
    broken.tensors.remove("lstm2.forget.bias");
    assert!(matches!(
        ExpertModels::from_bundles(&broken, &chord),
        Err(SoloError::MissingTensor { .. })
    ));
}

#[test]
fn solo_writes_to_midi() {
    let models = models_from_disk(7);
    let progression = Progression::parse("Am7:4 D7:4").unwrap();
    let (solo, _) =
        generate_solo(&models, &progression, &GenerationConfig::default(), 3).unwrap();

    let path = temp_path("solo.mid");
    write_midi(&solo, &progression, 180, &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"MThd");
    let _ = std::fs::remove_file(&path);
}
