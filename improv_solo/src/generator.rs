// The generation loop: one event per timestep across a whole progression.
//
// Per step:
//   1. build both experts' inputs from (timestep, active chord, cursor)
//   2. advance both experts and project their distributions
//   3. combine, rebias, apply temperature, sample
//   4. fold the sampled event into the cursor and append it to the solo
//
// `SoloGenerator` is an explicit, caller-owned object. `step()` does exactly
// one timestep, so a caller can interleave generation with other work or
// stop early; a step that fails leaves the generator as it was before the
// step. `run()` drives it to the end of the progression, which is the only
// terminal condition.
//
// Expert weights are shared (`Arc`); recurrent state, cursor and PRNG are
// per generator. Two solos over the same models need two generators.

use crate::chord::Progression;
use crate::combine::{Choice, RebiasParams, combine, sample};
use crate::cursor::GenerationCursor;
use crate::encoding::{StepContext, valid_steps_per_beat};
use crate::error::{Result, SoloError};
use crate::event::{Event, Solo, TimedEvent};
use crate::expert::{ChordVocabulary, Expert, IntervalVocabulary, Vocabulary};
use crate::pitch::{HIGH_BOUND, LOW_BOUND};
use crate::weights::{ExpertWeights, WeightBundle};
use improv_prng::SoloRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Tunable settings of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature for notes; must be positive.
    pub temperature: f64,
    /// Timesteps per quarter-note beat; must divide 12.
    pub steps_per_beat: u32,
    pub beats_per_measure: u32,
    pub rebias: RebiasParams,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            temperature: 1.0,
            steps_per_beat: 2,
            beats_per_measure: 4,
            rebias: RebiasParams::default(),
        }
    }
}

impl GenerationConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| SoloError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(SoloError::Config(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if !valid_steps_per_beat(self.steps_per_beat) {
            return Err(SoloError::Config(format!(
                "steps_per_beat must divide 12, got {}",
                self.steps_per_beat
            )));
        }
        if self.beats_per_measure == 0 {
            return Err(SoloError::Config("beats_per_measure must be positive".into()));
        }
        Ok(())
    }
}

fn validate_progression(progression: &Progression) -> Result<()> {
    if progression.is_empty() {
        return Err(SoloError::Config("progression is empty".into()));
    }
    let mut expected_start: u32 = 0;
    for (i, chord) in progression.chords.iter().enumerate() {
        if chord.root >= 12 {
            return Err(SoloError::Config(format!(
                "chord {i} has root {}, expected a pitch class 0..12",
                chord.root
            )));
        }
        if chord.quality_vector != chord.quality.pitch_classes() {
            return Err(SoloError::Config(format!(
                "chord {i}: pitch-class set does not match quality {:?}",
                chord.quality
            )));
        }
        if chord.duration_beats == 0 {
            return Err(SoloError::Config(format!("chord {i} has zero duration")));
        }
        if chord.start_beat != expected_start {
            return Err(SoloError::Config(format!(
                "chord {i} starts on beat {}, expected {expected_start}",
                chord.start_beat
            )));
        }
        expected_start = chord
            .start_beat
            .checked_add(chord.duration_beats)
            .ok_or_else(|| SoloError::Config(format!("chord {i} ends past the last beat")))?;
    }
    Ok(())
}

/// The two experts' weights, validated and shareable across runs.
#[derive(Debug, Clone)]
pub struct ExpertModels {
    pub interval: Arc<ExpertWeights>,
    pub chord: Arc<ExpertWeights>,
}

impl ExpertModels {
    pub fn from_bundles(interval: &WeightBundle, chord: &WeightBundle) -> Result<Self> {
        Ok(ExpertModels {
            interval: Arc::new(ExpertWeights::from_bundle(
                interval,
                IntervalVocabulary::INPUT_SIZE,
                IntervalVocabulary::OUTPUT_SIZE,
            )?),
            chord: Arc::new(ExpertWeights::from_bundle(
                chord,
                ChordVocabulary::INPUT_SIZE,
                ChordVocabulary::OUTPUT_SIZE,
            )?),
        })
    }

    /// Load both bundles from JSON files.
    pub fn load(interval: &Path, chord: &Path) -> Result<Self> {
        Self::from_bundles(&WeightBundle::load(interval)?, &WeightBundle::load(chord)?)
    }

    /// Untrained random models of the given hidden width.
    pub fn random(hidden: usize, rng: &mut SoloRng) -> Result<Self> {
        Ok(ExpertModels {
            interval: Arc::new(ExpertWeights::random(
                IntervalVocabulary::NAME,
                IntervalVocabulary::INPUT_SIZE,
                hidden,
                IntervalVocabulary::OUTPUT_SIZE,
                rng,
            )?),
            chord: Arc::new(ExpertWeights::random(
                ChordVocabulary::NAME,
                ChordVocabulary::INPUT_SIZE,
                hidden,
                ChordVocabulary::OUTPUT_SIZE,
                rng,
            )?),
        })
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub steps: u32,
    pub onsets: u32,
    pub sustains: u32,
    pub rests: u32,
    /// Steps where the experts agreed on no pitch at all.
    pub note_fallbacks: u32,
    /// Steps where the final distribution had no mass.
    pub final_fallbacks: u32,
}

pub struct SoloGenerator {
    config: GenerationConfig,
    progression: Progression,
    interval: Expert<IntervalVocabulary>,
    chord: Expert<ChordVocabulary>,
    cursor: GenerationCursor,
    rng: SoloRng,
    timestep: u32,
    chord_index: usize,
    total_steps: u32,
    solo: Solo,
    stats: GenerationStats,
    last_distribution: Vec<f64>,
}

impl SoloGenerator {
    /// Set up a run seeded from `seed`.
    pub fn new(
        models: &ExpertModels,
        progression: Progression,
        config: GenerationConfig,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(models, progression, config, SoloRng::new(seed))
    }

    /// Set up a run drawing from an existing generator (e.g. a fork).
    pub fn with_rng(
        models: &ExpertModels,
        progression: Progression,
        config: GenerationConfig,
        mut rng: SoloRng,
    ) -> Result<Self> {
        config.validate()?;
        validate_progression(&progression)?;

        let total_steps = progression
            .total_beats()
            .checked_mul(config.steps_per_beat)
            .ok_or_else(|| {
                SoloError::Config(format!(
                    "{} beats at {} steps per beat is too many steps",
                    progression.total_beats(),
                    config.steps_per_beat
                ))
            })?;
        let register = rng.range_u8(LOW_BOUND, HIGH_BOUND);
        log::debug!(
            "solo over {} chords, {total_steps} steps, starting register {register}",
            progression.chords.len()
        );

        Ok(SoloGenerator {
            interval: Expert::new(models.interval.clone())?,
            chord: Expert::new(models.chord.clone())?,
            cursor: GenerationCursor::new(register),
            rng,
            timestep: 0,
            chord_index: 0,
            total_steps,
            solo: Solo::new(config.steps_per_beat, config.beats_per_measure),
            stats: GenerationStats::default(),
            last_distribution: Vec::new(),
            config,
            progression,
        })
    }

    /// Begin a new, independent solo with the same models and progression.
    /// Expert state goes back to the trained initial vectors.
    pub fn restart(&mut self, seed: u64) {
        self.interval.reset();
        self.chord.reset();
        self.rng = SoloRng::new(seed);
        self.cursor = GenerationCursor::new(self.rng.range_u8(LOW_BOUND, HIGH_BOUND));
        self.timestep = 0;
        self.chord_index = 0;
        self.solo = Solo::new(self.config.steps_per_beat, self.config.beats_per_measure);
        self.stats = GenerationStats::default();
        self.last_distribution.clear();
    }

    pub fn is_finished(&self) -> bool {
        self.timestep >= self.total_steps
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn cursor(&self) -> &GenerationCursor {
        &self.cursor
    }

    pub fn solo(&self) -> &Solo {
        &self.solo
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    /// The distribution sampled on the most recent step.
    pub fn last_distribution(&self) -> &[f64] {
        &self.last_distribution
    }

    /// Generate one timestep. `Ok(None)` once the progression is done.
    pub fn step(&mut self) -> Result<Option<TimedEvent>> {
        if self.is_finished() {
            return Ok(None);
        }
        let checkpoint = (
            self.interval.state().clone(),
            self.chord.state().clone(),
            self.rng.clone(),
        );
        match self.advance() {
            Ok(event) => Ok(Some(event)),
            Err(err) => {
                let (interval_state, chord_state, rng) = checkpoint;
                self.interval.restore(interval_state);
                self.chord.restore(chord_state);
                self.rng = rng;
                Err(err)
            }
        }
    }

    /// Run to the end of the progression.
    pub fn run(mut self) -> Result<(Solo, GenerationStats)> {
        while self.step()?.is_some() {}
        if self.stats.note_fallbacks + self.stats.final_fallbacks > 0 {
            log::warn!(
                "solo finished with {} empty note products and {} empty final distributions",
                self.stats.note_fallbacks,
                self.stats.final_fallbacks
            );
        }
        Ok((self.solo, self.stats))
    }

    fn active_chord_index(&self) -> usize {
        let beat = self.timestep / self.config.steps_per_beat;
        let mut index = self.chord_index;
        while index + 1 < self.progression.chords.len()
            && beat >= self.progression.chords[index].end_beat()
        {
            index += 1;
        }
        index
    }

    fn advance(&mut self) -> Result<TimedEvent> {
        let chord_index = self.active_chord_index();
        let chord = &self.progression.chords[chord_index];
        let ctx = StepContext {
            timestep: self.timestep,
            steps_per_beat: self.config.steps_per_beat,
            chord,
            cursor: &self.cursor,
        };

        let p_interval = self.interval.predict(&ctx);
        let p_chord = self.chord.predict(&ctx);
        let combined = combine(
            &p_interval,
            &p_chord,
            self.config.temperature,
            &self.config.rebias,
        );
        if combined.note_fallback {
            log::warn!(
                "timestep {}: experts share no pitch, using uniform notes",
                self.timestep
            );
        }
        if combined.final_fallback {
            log::warn!(
                "timestep {}: combined distribution has no mass, using uniform notes",
                self.timestep
            );
        }

        let event = match sample(&combined.distribution, &mut self.rng, self.timestep)? {
            Choice::Rest => Event::Rest,
            Choice::Sustain => Event::Sustain,
            Choice::Pitch(pitch) => Event::NoteOnset {
                pitch,
                chord_root: chord.root,
            },
        };

        // Nothing below can fail; the step commits here.
        self.cursor.advance(&event);
        let timed = TimedEvent::new(
            self.timestep,
            self.config.steps_per_beat,
            self.config.beats_per_measure,
            event,
        );
        self.solo.push(timed);
        self.record(&event, combined.note_fallback, combined.final_fallback);
        self.last_distribution = combined.distribution;
        self.chord_index = chord_index;
        self.timestep += 1;
        Ok(timed)
    }

    fn record(&mut self, event: &Event, note_fallback: bool, final_fallback: bool) {
        self.stats.steps += 1;
        match event {
            Event::NoteOnset { .. } => self.stats.onsets += 1,
            Event::Sustain => self.stats.sustains += 1,
            Event::Rest => self.stats.rests += 1,
        }
        self.stats.note_fallbacks += u32::from(note_fallback);
        self.stats.final_fallbacks += u32::from(final_fallback);
    }
}

/// Generate a complete solo in one call.
pub fn generate_solo(
    models: &ExpertModels,
    progression: &Progression,
    config: &GenerationConfig,
    seed: u64,
) -> Result<(Solo, GenerationStats)> {
    SoloGenerator::new(models, progression.clone(), config.clone(), seed)?.run()
}
