// Product-of-experts combination, rebiasing, and sampling.
//
// Both projected vectors share the slot layout of pitch.rs. Notes are
// multiplied, renormalized among themselves, and sharpened by temperature.
// Rest and sustain are multiplied too, then damped: experts trained
// separately each put real mass on "nothing new happens", and the product of
// two such opinions would otherwise crowd out notes. The damping caps the
// articulation mass so notes keep at least `1 - articulation_cap` of the
// final distribution before the last renormalization.

use crate::error::{Result, SoloError};
use crate::pitch::{FIRST_PITCH_SLOT, NUM_SLOTS, REST_SLOT, SUSTAIN_SLOT, pitch_for_slot};
use crate::tensor::normalize;
use improv_prng::SoloRng;
use serde::{Deserialize, Serialize};

/// Constants of the rest/sustain damping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebiasParams {
    /// Multiplier on the combined rest mass.
    pub rest_scale: f64,
    /// Multiplier on the combined sustain mass.
    pub sustain_scale: f64,
    /// Weight of sustain when measuring articulation mass.
    pub sustain_articulation_weight: f64,
    /// Largest share of the distribution articulation may take from notes.
    pub articulation_cap: f64,
}

impl Default for RebiasParams {
    fn default() -> Self {
        RebiasParams {
            rest_scale: 0.5,
            sustain_scale: 0.15,
            sustain_articulation_weight: 0.3,
            articulation_cap: 0.4,
        }
    }
}

/// The final distribution for one step, and whether any fallback fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub distribution: Vec<f64>,
    /// The note product was all zero; notes fell back to uniform.
    pub note_fallback: bool,
    /// The final vector summed to zero; replaced by uniform notes.
    pub final_fallback: bool,
}

/// What the sampler picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Rest,
    Sustain,
    Pitch(u8),
}

fn uniform_notes(out: &mut [f64]) {
    let share = 1.0 / (out.len() - FIRST_PITCH_SLOT) as f64;
    out[REST_SLOT] = 0.0;
    out[SUSTAIN_SLOT] = 0.0;
    for p in &mut out[FIRST_PITCH_SLOT..] {
        *p = share;
    }
}

/// Sharpen (T < 1) or flatten (T > 1) a normalized distribution in place.
/// Values are scaled by the maximum first so small temperatures cannot
/// underflow the whole vector.
pub fn apply_temperature(notes: &mut [f64], temperature: f64) {
    let max = notes.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return;
    }
    let exponent = 1.0 / temperature;
    for p in notes.iter_mut() {
        *p = (*p / max).powf(exponent);
    }
    normalize(notes);
}

/// Combine two projected vectors into the distribution to sample from.
pub fn combine(p0: &[f64], p1: &[f64], temperature: f64, params: &RebiasParams) -> Combined {
    debug_assert_eq!(p0.len(), NUM_SLOTS);
    debug_assert_eq!(p1.len(), NUM_SLOTS);

    let rest = p0[REST_SLOT] * p1[REST_SLOT];
    let sustain = p0[SUSTAIN_SLOT] * p1[SUSTAIN_SLOT];

    let mut notes: Vec<f64> = p0[FIRST_PITCH_SLOT..]
        .iter()
        .zip(&p1[FIRST_PITCH_SLOT..])
        .map(|(a, b)| a * b)
        .collect();
    let note_fallback = !normalize(&mut notes);
    if note_fallback {
        let share = 1.0 / notes.len() as f64;
        notes.iter_mut().for_each(|p| *p = share);
    }
    apply_temperature(&mut notes, temperature);

    let articulation = rest + params.sustain_articulation_weight * sustain;
    let note_weight = 1.0 - articulation.min(params.articulation_cap);

    let mut distribution = Vec::with_capacity(NUM_SLOTS);
    distribution.push(params.rest_scale * rest);
    distribution.push(params.sustain_scale * sustain);
    distribution.extend(notes.iter().map(|p| p * note_weight));

    let final_fallback = !normalize(&mut distribution);
    if final_fallback {
        uniform_notes(&mut distribution);
    }

    Combined {
        distribution,
        note_fallback,
        final_fallback,
    }
}

/// Inverse-CDF draw from a final distribution.
pub fn sample(distribution: &[f64], rng: &mut SoloRng, timestep: u32) -> Result<Choice> {
    let slot = rng
        .weighted_index(distribution)
        .ok_or(SoloError::EmptyDistribution(timestep))?;
    Ok(match slot {
        REST_SLOT => Choice::Rest,
        SUSTAIN_SLOT => Choice::Sustain,
        _ => Choice::Pitch(pitch_for_slot(slot)?),
    })
}
