// Input encoders for the two experts.
//
// Each expert sees a fixed-width vector built from the same ingredients:
//
//   beat       9   one bit per subdivision period that divides the current
//                  position (measured in 48ths of a whole note)
//   chord     12   the chord's pitch-class set rotated so bit 0 is the
//                  expert's reference pitch class
//   register   2   where the register sits in the pitch window
//   previous  27 / 14
//                  what happened last step, in the expert's own vocabulary
//
// The interval expert uses the register as its chord reference and codes
// the previous event as a leap of -12..=12 semitones. The chord expert uses
// the chord root as its reference and codes the previous event as a pitch
// class above the root. `projection.rs` undoes exactly these conventions.

use crate::chord::ChordContext;
use crate::cursor::GenerationCursor;
use crate::pitch::{LOW_BOUND, PITCH_RANGE, pitch_class};

/// Subdivision periods in 48ths of a whole note: whole, half, quarter,
/// eighth, sixteenth, then the triplet grid.
pub const BEAT_PERIODS: [u32; 9] = [48, 24, 12, 6, 3, 16, 8, 4, 2];

/// 48ths of a whole note in one quarter-note beat.
const TICKS_PER_BEAT: u32 = 12;

pub const BEAT_WIDTH: usize = BEAT_PERIODS.len();
pub const CHORD_WIDTH: usize = 12;
pub const REGISTER_WIDTH: usize = 2;

/// Largest leap the interval vocabulary can express.
pub const MAX_INTERVAL: i32 = 12;
/// rest + sustain + 25 leaps.
pub const INTERVAL_VOCAB: usize = 2 + (2 * MAX_INTERVAL as usize + 1);
/// rest + sustain + 12 pitch classes.
pub const PITCH_CLASS_VOCAB: usize = 2 + 12;

pub const INTERVAL_INPUT_SIZE: usize = BEAT_WIDTH + CHORD_WIDTH + REGISTER_WIDTH + INTERVAL_VOCAB;
pub const CHORD_INPUT_SIZE: usize = BEAT_WIDTH + CHORD_WIDTH + REGISTER_WIDTH + PITCH_CLASS_VOCAB;

const REST_CODE: usize = 0;
const SUSTAIN_CODE: usize = 1;

/// Everything an encoder or projector may look at for one timestep.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub timestep: u32,
    pub steps_per_beat: u32,
    pub chord: &'a ChordContext,
    pub cursor: &'a GenerationCursor,
}

/// True if `steps_per_beat` lands every step on the 48ths grid.
pub fn valid_steps_per_beat(steps_per_beat: u32) -> bool {
    steps_per_beat > 0 && TICKS_PER_BEAT % steps_per_beat == 0
}

/// Metric-position bits for `timestep`.
pub fn beat_features(timestep: u32, steps_per_beat: u32) -> [f32; BEAT_WIDTH] {
    let ticks = timestep * (TICKS_PER_BEAT / steps_per_beat);
    BEAT_PERIODS.map(|period| if ticks % period == 0 { 1.0 } else { 0.0 })
}

/// Rotate a root-relative pitch-class set so that index 0 is
/// `reference_pc`: `out[k]` is set iff pitch class `reference_pc + k` is in
/// the chord.
pub fn rotate_chord(quality: &[bool; 12], root: u8, reference_pc: u8) -> [f32; 12] {
    let shift = pitch_class(reference_pc as i32 - root as i32) as usize;
    std::array::from_fn(|k| if quality[(k + shift) % 12] { 1.0 } else { 0.0 })
}

/// Two hat functions over the pitch window: `[1 - t, t]` with `t` the
/// register's relative height (0 at LOW_BOUND, 1 at the top pitch).
pub fn register_features(register: u8) -> [f32; REGISTER_WIDTH] {
    let t = (register as f32 - LOW_BOUND as f32) / (PITCH_RANGE - 1) as f32;
    let t = t.clamp(0.0, 1.0);
    [1.0 - t, t]
}

/// Index into the interval vocabulary for the previous event. Leaps wider
/// than an octave can only follow a uniform fallback and are clamped.
pub fn interval_code(cursor: &GenerationCursor) -> usize {
    if cursor.is_rest {
        REST_CODE
    } else if cursor.is_continue {
        SUSTAIN_CODE
    } else {
        let leap = cursor.last_interval().clamp(-MAX_INTERVAL, MAX_INTERVAL);
        2 + (leap + MAX_INTERVAL) as usize
    }
}

/// Index into the pitch-class vocabulary for the previous event.
pub fn pitch_class_code(cursor: &GenerationCursor, root: u8) -> usize {
    if cursor.is_rest {
        REST_CODE
    } else if cursor.is_continue {
        SUSTAIN_CODE
    } else {
        2 + pitch_class(cursor.register as i32 - root as i32) as usize
    }
}

fn shared_features(ctx: &StepContext<'_>, reference_pc: u8, width: usize) -> Vec<f32> {
    let mut input = Vec::with_capacity(width);
    input.extend_from_slice(&beat_features(ctx.timestep, ctx.steps_per_beat));
    input.extend_from_slice(&rotate_chord(
        &ctx.chord.quality_vector,
        ctx.chord.root,
        reference_pc,
    ));
    input.extend_from_slice(&register_features(ctx.cursor.register));
    input
}

fn push_one_hot(input: &mut Vec<f32>, width: usize, hot: usize) {
    let start = input.len();
    input.resize(start + width, 0.0);
    input[start + hot] = 1.0;
}

/// Interval expert input.
pub fn encode_interval(ctx: &StepContext<'_>) -> Vec<f32> {
    let reference = pitch_class(ctx.cursor.register as i32);
    let mut input = shared_features(ctx, reference, INTERVAL_INPUT_SIZE);
    push_one_hot(&mut input, INTERVAL_VOCAB, interval_code(ctx.cursor));
    input
}

/// Chord-relative expert input.
pub fn encode_chord(ctx: &StepContext<'_>) -> Vec<f32> {
    let mut input = shared_features(ctx, ctx.chord.root, CHORD_INPUT_SIZE);
    push_one_hot(
        &mut input,
        PITCH_CLASS_VOCAB,
        pitch_class_code(ctx.cursor, ctx.chord.root),
    );
    input
}
