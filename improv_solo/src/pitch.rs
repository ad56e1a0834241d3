// Pitch window and the shared absolute-pitch slot layout.
//
// Both experts' distributions are projected into one vector of
// `NUM_SLOTS` entries: slot 0 is rest, slot 1 is sustain, and slot
// `2 + (p - LOW_BOUND)` is MIDI pitch `p`. Every pitch the generator emits
// lies in [LOW_BOUND, HIGH_BOUND); the conversions here are the only place
// that map between slots and pitches, and they refuse anything outside.

use crate::error::{Result, SoloError};

/// Lowest generated MIDI pitch (C3).
pub const LOW_BOUND: u8 = 48;
/// One past the highest generated MIDI pitch (C6).
pub const HIGH_BOUND: u8 = 84;
/// Number of absolute pitches in the window.
pub const PITCH_RANGE: usize = (HIGH_BOUND - LOW_BOUND) as usize;

pub const REST_SLOT: usize = 0;
pub const SUSTAIN_SLOT: usize = 1;
/// First pitch slot; control slots come before it.
pub const FIRST_PITCH_SLOT: usize = 2;
/// Length of a projected distribution.
pub const NUM_SLOTS: usize = PITCH_RANGE + FIRST_PITCH_SLOT;

/// True if `pitch` lies in [LOW_BOUND, HIGH_BOUND).
pub fn in_range(pitch: i32) -> bool {
    (LOW_BOUND as i32..HIGH_BOUND as i32).contains(&pitch)
}

/// Slot index for an absolute pitch.
pub fn slot_for_pitch(pitch: i32) -> Result<usize> {
    if !in_range(pitch) {
        return Err(SoloError::PitchOutOfRange(pitch));
    }
    Ok(FIRST_PITCH_SLOT + (pitch - LOW_BOUND as i32) as usize)
}

/// Absolute pitch for a pitch slot (`slot >= FIRST_PITCH_SLOT`).
pub fn pitch_for_slot(slot: usize) -> Result<u8> {
    let pitch = LOW_BOUND as i32 + slot as i32 - FIRST_PITCH_SLOT as i32;
    if slot < FIRST_PITCH_SLOT || !in_range(pitch) {
        return Err(SoloError::PitchOutOfRange(pitch));
    }
    Ok(pitch as u8)
}

/// Non-negative pitch class of any (possibly negative) semitone value.
pub fn pitch_class(semitones: i32) -> u8 {
    semitones.rem_euclid(12) as u8
}

/// Name of a pitch class, spelled the way lead sheets usually spell it.
pub fn pitch_class_name(pc: u8) -> &'static str {
    match pc % 12 {
        0 => "C",
        1 => "Db",
        2 => "D",
        3 => "Eb",
        4 => "E",
        5 => "F",
        6 => "F#",
        7 => "G",
        8 => "Ab",
        9 => "A",
        10 => "Bb",
        _ => "B",
    }
}

/// Compact note name with octave, e.g. "Eb4" for 63.
pub fn pitch_name(pitch: u8) -> String {
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", pitch_class_name(pitch % 12), octave)
}
