// Improvised Solo Generator, CLI entry point.
//
// Generates a solo over a chord progression and writes it to MIDI.
// The pipeline: load (or randomize) expert weights, run the generator,
// print a text rendering, write MIDI.
//
// Usage:
//   cargo run -p improv_solo --bin generate -- [output.mid]
//     [--progression "Cm7:4 F7:4 Bbmaj7:8"] [--temperature T]
//     [--steps-per-beat N] [--seed N] [--tempo BPM]
//     [--interval-weights FILE] [--chord-weights FILE] [--config FILE]
//
// Without weight files the experts are seeded random networks: the output
// is valid but not musical. Set RUST_LOG=debug for setup details.

use improv_prng::SoloRng;
use improv_solo::chord::Progression;
use improv_solo::error::Result;
use improv_solo::generator::{ExpertModels, GenerationConfig, SoloGenerator};
use improv_solo::midi::write_midi;
use std::path::{Path, PathBuf};

/// Hidden width of the stand-in random experts.
const RANDOM_HIDDEN_SIZE: usize = 64;

const DEFAULT_PROGRESSION: &str = "Dm7:4 G7:4 Cmaj7:8 Cm7:4 F7:4 Bbmaj7:8";

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let output_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("solo.mid");
    let progression_text: String =
        parse_flag(&args, "--progression").unwrap_or_else(|| DEFAULT_PROGRESSION.to_string());
    let seed: u64 = parse_flag(&args, "--seed").unwrap_or_else(clock_seed);
    let tempo: u32 = parse_flag(&args, "--tempo").unwrap_or(160);
    let interval_weights: Option<PathBuf> = parse_flag(&args, "--interval-weights");
    let chord_weights: Option<PathBuf> = parse_flag(&args, "--chord-weights");

    let mut config = match parse_flag::<PathBuf>(&args, "--config") {
        Some(path) => GenerationConfig::load(&path)?,
        None => GenerationConfig::default(),
    };
    if let Some(t) = parse_flag(&args, "--temperature") {
        config.temperature = t;
    }
    if let Some(n) = parse_flag(&args, "--steps-per-beat") {
        config.steps_per_beat = n;
    }
    config.validate()?;

    let progression = Progression::parse(&progression_text)?;

    println!("=== Improvised Solo Generator ===");
    println!("Output: {output_path}");
    println!("Progression: {progression_text} ({} beats)", progression.total_beats());
    println!("Temperature: {}", config.temperature);
    println!("Steps per beat: {}", config.steps_per_beat);
    println!("Tempo: {tempo} BPM");
    println!("Seed: {seed}");
    println!();

    let mut rng = SoloRng::new(seed);

    println!("[1/3] Loading experts...");
    let models = match (interval_weights, chord_weights) {
        (Some(interval), Some(chord)) => {
            let models = ExpertModels::load(&interval, &chord)?;
            println!(
                "  Loaded interval ({}) and chord ({}) experts.",
                models.interval.hidden_size(),
                models.chord.hidden_size()
            );
            models
        }
        (None, None) => {
            println!("  No weight files given; using random experts (hidden {RANDOM_HIDDEN_SIZE}).");
            ExpertModels::random(RANDOM_HIDDEN_SIZE, &mut rng.fork(1))?
        }
        _ => {
            println!("  Need both --interval-weights and --chord-weights; using random experts.");
            ExpertModels::random(RANDOM_HIDDEN_SIZE, &mut rng.fork(1))?
        }
    };

    println!("[2/3] Generating...");
    let generator = SoloGenerator::with_rng(&models, progression.clone(), config, rng.fork(2))?;
    println!("  {} timesteps", generator.total_steps());
    let (solo, stats) = generator.run()?;
    println!(
        "  {} notes, {} sustains, {} rests",
        stats.onsets, stats.sustains, stats.rests
    );
    if stats.note_fallbacks + stats.final_fallbacks > 0 {
        println!(
            "  Fallbacks: {} note, {} final",
            stats.note_fallbacks, stats.final_fallbacks
        );
    }
    println!();
    println!("{}", solo.summary());
    println!();

    println!("[3/3] Writing MIDI...");
    write_midi(&solo, &progression, tempo, Path::new(output_path))?;
    println!("  Done: {output_path}");
    Ok(())
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
