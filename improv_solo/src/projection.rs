// Projection of each expert's local distribution into absolute pitch space.
//
// Output is a `NUM_SLOTS` vector (see pitch.rs): rest, sustain, then one
// slot per pitch in the window. Nothing here renormalizes; the combiner
// works on the raw projected masses.
//
// Interval expert: bin `2 + (offset + 12)` lands on `register + offset`.
// Offsets that leave the window are dropped.
//
// Chord expert: bin `2 + j` is pitch class `root + j`. Every absolute pitch
// receives the mass of its pitch class, so the twelve values tile the window
// once per octave. This is the inverse of `encoding::pitch_class_code`.

use crate::encoding::{INTERVAL_VOCAB, MAX_INTERVAL, PITCH_CLASS_VOCAB};
use crate::pitch::{
    FIRST_PITCH_SLOT, LOW_BOUND, NUM_SLOTS, REST_SLOT, SUSTAIN_SLOT, in_range, pitch_class,
};

/// Project interval-vocabulary probabilities around `register`.
pub fn project_interval(probs: &[f64], register: u8) -> Vec<f64> {
    debug_assert_eq!(probs.len(), INTERVAL_VOCAB);
    let mut out = vec![0.0; NUM_SLOTS];
    out[REST_SLOT] = probs[REST_SLOT];
    out[SUSTAIN_SLOT] = probs[SUSTAIN_SLOT];

    for (bin, &p) in probs[FIRST_PITCH_SLOT..].iter().enumerate() {
        let offset = bin as i32 - MAX_INTERVAL;
        let pitch = register as i32 + offset;
        if in_range(pitch) {
            out[FIRST_PITCH_SLOT + (pitch - LOW_BOUND as i32) as usize] += p;
        }
    }
    out
}

/// Project root-relative pitch-class probabilities, tiled across the window.
pub fn project_chord(probs: &[f64], root: u8) -> Vec<f64> {
    debug_assert_eq!(probs.len(), PITCH_CLASS_VOCAB);
    let mut out = vec![0.0; NUM_SLOTS];
    out[REST_SLOT] = probs[REST_SLOT];
    out[SUSTAIN_SLOT] = probs[SUSTAIN_SLOT];

    // Phase of LOW_BOUND relative to the root; slot 0 of the window.
    let phase = pitch_class(LOW_BOUND as i32 - root as i32) as usize;
    for (i, slot) in out[FIRST_PITCH_SLOT..].iter_mut().enumerate() {
        *slot = probs[FIRST_PITCH_SLOT + (phase + i) % 12];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::GenerationCursor;
    use crate::encoding::{interval_code, pitch_class_code};
    use crate::pitch::{HIGH_BOUND, slot_for_pitch};

    fn one_hot(width: usize, hot: usize) -> Vec<f64> {
        let mut v = vec![0.0; width];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn control_slots_copy_through() {
        let mut probs = vec![0.0; INTERVAL_VOCAB];
        probs[0] = 0.2;
        probs[1] = 0.3;
        let out = project_interval(&probs, 60);
        assert_eq!((out[REST_SLOT], out[SUSTAIN_SLOT]), (0.2, 0.3));

        let mut probs = vec![0.0; PITCH_CLASS_VOCAB];
        probs[0] = 0.4;
        probs[1] = 0.1;
        let out = project_chord(&probs, 5);
        assert_eq!((out[REST_SLOT], out[SUSTAIN_SLOT]), (0.4, 0.1));
    }

    #[test]
    fn interval_bins_land_relative_to_register() {
        // +7 from G4 (67) is D5 (74).
        let out = project_interval(&one_hot(INTERVAL_VOCAB, 2 + 12 + 7), 67);
        let slot = slot_for_pitch(74).unwrap();
        assert_eq!(out[slot], 1.0);
        assert_eq!(out.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn interval_offsets_past_the_window_are_dropped() {
        // +5 from the top pitch and -5 from the bottom pitch.
        let top = HIGH_BOUND - 1;
        let out = project_interval(&one_hot(INTERVAL_VOCAB, 2 + 12 + 5), top);
        assert!(out.iter().all(|&p| p == 0.0));

        let out = project_interval(&one_hot(INTERVAL_VOCAB, 2 + 12 - 5), LOW_BOUND);
        assert!(out.iter().all(|&p| p == 0.0));

        // Uniform over leaps from the bottom: only 0..=+12 survive.
        let uniform = vec![1.0 / 25.0; INTERVAL_VOCAB];
        let out = project_interval(&uniform, LOW_BOUND);
        let kept: f64 = out[FIRST_PITCH_SLOT..].iter().sum();
        assert!((kept - 13.0 / 25.0).abs() < 1e-12);
        assert!(out[FIRST_PITCH_SLOT + 13..].iter().all(|&p| p == 0.0));
    }

    #[test]
    fn chord_one_hot_tiles_every_octave() {
        for root in 0..12u8 {
            for j in 0..12usize {
                let out = project_chord(&one_hot(PITCH_CLASS_VOCAB, 2 + j), root);
                let target_pc = (root as usize + j) % 12;
                for pitch in LOW_BOUND..HIGH_BOUND {
                    let mass = out[slot_for_pitch(pitch as i32).unwrap()];
                    if pitch as usize % 12 == target_pc {
                        assert_eq!(mass, 1.0, "root {root} bin {j} pitch {pitch}");
                    } else {
                        assert_eq!(mass, 0.0, "root {root} bin {j} pitch {pitch}");
                    }
                }
                assert_eq!(out[REST_SLOT] + out[SUSTAIN_SLOT], 0.0);
            }
        }
    }

    #[test]
    fn chord_encoding_and_projection_are_inverse() {
        // Encoding a played pitch as a pitch-class code and projecting that
        // code back must land on the same pitch class, for every root.
        for root in 0..12u8 {
            for pitch in LOW_BOUND..HIGH_BOUND {
                let cursor = GenerationCursor {
                    register: pitch,
                    prev_note: pitch,
                    is_rest: false,
                    is_continue: false,
                };
                let code = pitch_class_code(&cursor, root);
                let out = project_chord(&one_hot(PITCH_CLASS_VOCAB, code), root);
                assert_eq!(out[slot_for_pitch(pitch as i32).unwrap()], 1.0);
            }
        }
    }

    #[test]
    fn interval_encoding_and_projection_are_inverse() {
        // The leap coded for (prev -> register) projected around prev lands
        // on register.
        for prev in 60u8..=71 {
            for leap in -MAX_INTERVAL..=MAX_INTERVAL {
                let register = (prev as i32 + leap) as u8;
                let cursor = GenerationCursor {
                    register,
                    prev_note: prev,
                    is_rest: false,
                    is_continue: false,
                };
                let code = interval_code(&cursor);
                let out = project_interval(&one_hot(INTERVAL_VOCAB, code), prev);
                assert_eq!(out[slot_for_pitch(register as i32).unwrap()], 1.0);
            }
        }
    }
}
